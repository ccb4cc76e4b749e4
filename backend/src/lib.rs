pub mod config;
pub mod error;
pub mod features;
pub mod inference;
pub mod models;
pub mod risk;
pub mod routes;

pub use error::{PredictError, ScoringError};
pub use features::{encode, FeatureVector, FEATURE_NAMES};
pub use inference::{Assessment, Predictor, Scorer};
pub use models::{ApplicantInput, HomeOwnership, LoanPurpose};
pub use risk::{classify, Probability, RiskTier};
