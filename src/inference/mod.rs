//! Inference - model artifact loading and prediction
//!
//! The fitted model lives in a JSON artifact on disk. It is loaded once,
//! memoized, and shared read-only by every request.

pub mod error;
pub mod estimator;
pub mod loader;
pub mod predictor;
pub mod vectorizer;

/// Width of the client feature vectors the model was trained on
pub const FEATURE_COUNT: usize = 61;

// Re-export common types
pub use error::ModelError;
pub use estimator::{Classifier, EstimatorSpec, LogisticRegression, Pipeline};
pub use loader::{ArtifactLoader, ModelBundle, ModelInfo, DEFAULT_THRESHOLD};
pub use predictor::{apply_threshold, predict_features, predict_text, Prediction};
pub use vectorizer::{TextVectorizer, Vectorizer, VectorizerSpec};
