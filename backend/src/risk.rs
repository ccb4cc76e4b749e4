//! Risk tiers derived from the default probability.

use serde::Serialize;

use crate::error::ScoringError;

pub const HIGH_RISK_THRESHOLD: f64 = 0.70;
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.40;

/// Default probability checked to be finite and within [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Probability(f64);

impl Probability {
    pub fn new(value: f64) -> Result<Self, ScoringError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Probability(value))
        } else {
            Err(ScoringError::MalformedOutput(format!(
                "probabilité {} hors de [0, 1]",
                value
            )))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn message(&self) -> &'static str {
        match self {
            RiskTier::High => "High Risk: Likely Default",
            RiskTier::Medium => "Medium Risk: Manual Review Needed",
            RiskTier::Low => "Low Risk: Acceptable",
        }
    }
}

/// Lower bounds are inclusive: 0.70 is High, 0.40 is Medium.
pub fn classify(probability: Probability) -> RiskTier {
    match probability.value() {
        p if p >= HIGH_RISK_THRESHOLD => RiskTier::High,
        p if p >= MEDIUM_RISK_THRESHOLD => RiskTier::Medium,
        _ => RiskTier::Low,
    }
}
