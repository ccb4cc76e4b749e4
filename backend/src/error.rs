use std::path::PathBuf;
use thiserror::Error;

/// Failures at the boundary with the scoring model.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Artefact du modèle introuvable: {}", .0.display())]
    ArtifactMissing(PathBuf),
    #[error("Artefact du modèle non supporté (attendu .onnx ou .json): {}", .0.display())]
    UnsupportedArtifact(PathBuf),
    #[error("Échec du chargement du modèle: {0}")]
    Load(String),
    #[error("Échec de l'inférence: {0}")]
    Inference(String),
    #[error("Sortie du modèle invalide: {0}")]
    MalformedOutput(String),
}

/// Failures of a prediction request.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("Liste de demandeurs vide")]
    EmptyBatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoring_errors_pass_through_prediction_errors() {
        let err: PredictError = ScoringError::MalformedOutput("NaN".into()).into();
        assert_eq!(err.to_string(), "Sortie du modèle invalide: NaN");
    }

    #[test]
    fn missing_artifact_names_the_path() {
        let err = ScoringError::ArtifactMissing(PathBuf::from("models/x.onnx"));
        assert!(err.to_string().contains("models/x.onnx"));
    }
}
