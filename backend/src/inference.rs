//! Scoring model loading and the predict chain built on top of it.
//!
//! The model is loaded once at startup and shared read-only through
//! [`Predictor`]; handlers receive it by injection rather than through a
//! process-wide cache.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tract_onnx::prelude::*;

use crate::error::{PredictError, ScoringError};
use crate::features::{encode, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::models::{ApplicantInput, ModelInfo};
use crate::risk::{classify, Probability, RiskTier};

const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

/// Two-class output of the model; class 1 is "default".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    pub no_default: Probability,
    pub default: Probability,
}

impl ClassProbabilities {
    pub fn from_slice(values: &[f64]) -> Result<Self, ScoringError> {
        let [p0, p1] = values else {
            return Err(ScoringError::MalformedOutput(format!(
                "2 probabilités de classe attendues, {} reçues",
                values.len()
            )));
        };
        let no_default = Probability::new(*p0)?;
        let default = Probability::new(*p1)?;
        if (p0 + p1 - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(ScoringError::MalformedOutput(format!(
                "somme des probabilités de classe: {}",
                p0 + p1
            )));
        }
        Ok(ClassProbabilities { no_default, default })
    }
}

/// The trained classifier, seen from the service.
pub trait Scorer: Send + Sync {
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, ScoringError>;

    fn describe(&self) -> ModelInfo;
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Classifier exported to ONNX (skl2onnx, `zipmap` disabled).
pub struct OnnxScorer {
    model: OnnxPlan,
    artifact: String,
    version: String,
}

impl OnnxScorer {
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, ScoringError> {
        let path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_COUNT)),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ScoringError::Load(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            model,
            artifact: path.display().to_string(),
            version: artifact_version(path),
        })
    }
}

impl Scorer for OnnxScorer {
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, ScoringError> {
        let row = features.to_f32_row();
        let input = Tensor::from_shape(&[1, FEATURE_COUNT], &row[..])
            .map_err(|e| ScoringError::Inference(e.to_string()))?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| ScoringError::Inference(e.to_string()))?;

        // The first output of a converted classifier is the label; the
        // probabilities are the float tensor shaped [1, 2].
        let probabilities = outputs
            .iter()
            .find(|t| t.datum_type() == f32::datum_type() && t.shape().last() == Some(&2))
            .ok_or_else(|| {
                ScoringError::MalformedOutput("aucune sortie de probabilités [1, 2]".to_string())
            })?;
        let values: Vec<f64> = probabilities
            .to_array_view::<f32>()
            .map_err(|e| ScoringError::MalformedOutput(e.to_string()))?
            .iter()
            .map(|&p| f64::from(p))
            .collect();

        ClassProbabilities::from_slice(&values)
    }

    fn describe(&self) -> ModelInfo {
        ModelInfo::new("onnx", &self.version, &self.artifact)
    }
}

#[derive(Debug, Deserialize)]
struct LinearArtifact {
    #[serde(default = "default_linear_version")]
    version: String,
    intercept: f64,
    coefficients: HashMap<String, f64>,
}

fn default_linear_version() -> String {
    "unversioned".to_string()
}

/// Logistic regression exported as JSON, coefficients keyed by feature name.
#[derive(Debug, Clone)]
pub struct LinearScorer {
    intercept: f64,
    weights: [f64; FEATURE_COUNT],
    artifact: String,
    version: String,
}

impl LinearScorer {
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, ScoringError> {
        let path = model_path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScoringError::Load(format!("{}: {}", path.display(), e)))?;
        let mut scorer = Self::from_json(&raw)?;
        scorer.artifact = path.display().to_string();
        Ok(scorer)
    }

    pub fn from_json(raw: &str) -> Result<Self, ScoringError> {
        let artifact: LinearArtifact =
            serde_json::from_str(raw).map_err(|e| ScoringError::Load(e.to_string()))?;

        let mut weights = [0.0; FEATURE_COUNT];
        for (name, weight) in &artifact.coefficients {
            let index = FEATURE_NAMES
                .iter()
                .position(|n| *n == name.as_str())
                .ok_or_else(|| ScoringError::Load(format!("variable inconnue '{}'", name)))?;
            if !weight.is_finite() {
                return Err(ScoringError::Load(format!("poids non fini pour '{}'", name)));
            }
            weights[index] = *weight;
        }
        if !artifact.intercept.is_finite() {
            return Err(ScoringError::Load("ordonnée à l'origine non finie".to_string()));
        }

        Ok(Self {
            intercept: artifact.intercept,
            weights,
            artifact: "inline".to_string(),
            version: artifact.version,
        })
    }
}

impl Scorer for LinearScorer {
    fn predict_proba(&self, features: &FeatureVector) -> Result<ClassProbabilities, ScoringError> {
        let logit = features
            .iter()
            .zip(self.weights.iter())
            .fold(self.intercept, |acc, ((_, x), w)| acc + w * x);
        let p = 1.0 / (1.0 + (-logit).exp());
        ClassProbabilities::from_slice(&[1.0 - p, p])
    }

    fn describe(&self) -> ModelInfo {
        ModelInfo::new("linear", &self.version, &self.artifact)
    }
}

fn artifact_version(path: &Path) -> String {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(|modified| chrono::DateTime::<chrono::Utc>::from(modified).to_rfc3339())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Picks the loader from the artifact extension.
pub fn load_scorer<P: AsRef<Path>>(model_path: P) -> Result<Arc<dyn Scorer>, ScoringError> {
    let path = model_path.as_ref();
    if !path.is_file() {
        return Err(ScoringError::ArtifactMissing(path.to_path_buf()));
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("onnx") => Ok(Arc::new(OnnxScorer::load(path)?)),
        Some("json") => Ok(Arc::new(LinearScorer::load(path)?)),
        _ => Err(ScoringError::UnsupportedArtifact(path.to_path_buf())),
    }
}

/// Outcome of scoring one applicant.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub features: FeatureVector,
    pub probability: Probability,
    pub tier: RiskTier,
}

#[derive(Clone)]
pub struct Predictor {
    scorer: Arc<dyn Scorer>,
    version: Arc<str>,
}

impl Predictor {
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        let version = scorer.describe().version.into();
        Self { scorer, version }
    }

    pub fn from_artifact<P: AsRef<Path>>(model_path: P) -> Result<Self, ScoringError> {
        load_scorer(model_path).map(Self::new)
    }

    pub fn assess(&self, input: &ApplicantInput) -> Result<Assessment, PredictError> {
        let features = encode(input);
        let probabilities = self.scorer.predict_proba(&features)?;
        let tier = classify(probabilities.default);

        Ok(Assessment {
            features,
            probability: probabilities.default,
            tier,
        })
    }

    /// Scores every applicant or fails as a whole.
    pub fn assess_batch(&self, inputs: &[ApplicantInput]) -> Result<Vec<Assessment>, PredictError> {
        if inputs.is_empty() {
            return Err(PredictError::EmptyBatch);
        }
        inputs.iter().map(|input| self.assess(input)).collect()
    }

    pub fn model_info(&self) -> ModelInfo {
        self.scorer.describe()
    }

    pub fn model_version(&self) -> &str {
        &self.version
    }
}
