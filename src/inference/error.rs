//! Inference errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Artifact file does not exist at the configured path
    #[error("model artifact not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("expected {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("estimator '{kind}' does not accept {input} input")]
    UnsupportedInput { kind: &'static str, input: &'static str },

    /// Estimator produced something that is not a probability
    #[error("estimator returned an invalid output: {0}")]
    InvalidOutput(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::InvalidArtifact(err.to_string())
    }
}
