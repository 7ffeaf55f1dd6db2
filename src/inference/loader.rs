//! Artifact loader
//!
//! Reads the model artifact once and keeps it for the life of the process.
//!
//! Accepted artifact shapes:
//! - `{"pipeline": <estimator>, "threshold": 0.5}`
//! - `{"model": <estimator>, "vectorizer": <vectorizer>, "threshold": 0.5}`
//! - `{"model": <estimator>, "threshold": 0.5}`
//! - a bare `<estimator>`
//!
//! A missing threshold defaults to [`DEFAULT_THRESHOLD`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::ModelError;
use super::estimator::{Classifier, EstimatorSpec};
use super::vectorizer::{Vectorizer, VectorizerSpec};
use super::FEATURE_COUNT;

pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Mapping form of the artifact
#[derive(Debug, Deserialize)]
struct BundleFile {
    #[serde(default)]
    pipeline: Option<EstimatorSpec>,
    #[serde(default)]
    model: Option<EstimatorSpec>,
    #[serde(default)]
    vectorizer: Option<VectorizerSpec>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

/// Where a bundle came from
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSource {
    pub path: PathBuf,
    pub checksum: String,
    pub loaded_at: DateTime<Utc>,
}

/// Loaded, immutable model bundle
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub model: Arc<dyn Classifier>,
    pub vectorizer: Option<Arc<dyn Vectorizer>>,
    pub threshold: f64,
    pub feature_names: Option<Vec<String>>,
    pub source: Option<ArtifactSource>,
}

/// Public description of a bundle
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub kind: &'static str,
    pub n_features: Option<usize>,
    pub threshold: f64,
    pub has_vectorizer: bool,
    pub feature_names: Option<Vec<String>>,
    #[serde(flatten)]
    pub source: Option<ArtifactSource>,
}

impl ModelBundle {
    pub fn new(model: Arc<dyn Classifier>) -> Self {
        Self {
            model,
            vectorizer: None,
            threshold: DEFAULT_THRESHOLD,
            feature_names: None,
            source: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_vectorizer(mut self, vectorizer: Arc<dyn Vectorizer>) -> Self {
        self.vectorizer = Some(vectorizer);
        self
    }

    /// Parse an artifact document and check it is self-consistent
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;

        // A "type" tag marks a bare estimator, even a pipeline with its own "model"
        let is_mapping = value
            .as_object()
            .map(|obj| {
                !obj.contains_key("type")
                    && (obj.contains_key("model") || obj.contains_key("pipeline"))
            })
            .unwrap_or(false);

        let bundle = if is_mapping {
            let file: BundleFile = serde_json::from_value(value)?;

            // An explicit pipeline wins over a separate model/vectorizer pair
            let (model, vectorizer) = match (file.pipeline, file.model) {
                (Some(pipeline), _) => (pipeline.build()?, None),
                (None, Some(model)) => {
                    let vectorizer = file
                        .vectorizer
                        .map(|v| v.build().map(|v| Arc::new(v) as Arc<dyn Vectorizer>))
                        .transpose()?;
                    (model.build()?, vectorizer)
                }
                (None, None) => {
                    return Err(ModelError::InvalidArtifact(
                        "artifact has neither 'model' nor 'pipeline'".to_string(),
                    ))
                }
            };

            Self {
                model,
                vectorizer,
                threshold: file.threshold.unwrap_or(DEFAULT_THRESHOLD),
                feature_names: file.feature_names,
                source: None,
            }
        } else {
            let spec: EstimatorSpec = serde_json::from_value(value)?;
            Self::new(spec.build()?)
        };

        bundle.validate()?;
        Ok(bundle)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ModelError::InvalidArtifact(format!(
                "threshold {} is outside [0, 1]",
                self.threshold
            )));
        }

        if let (Some(vectorizer), Some(width)) = (&self.vectorizer, self.model.n_features()) {
            if vectorizer.vocabulary_size() != width {
                return Err(ModelError::InvalidArtifact(format!(
                    "vectorizer yields {} columns but the model expects {}",
                    vectorizer.vocabulary_size(),
                    width
                )));
            }
        }

        if let (Some(names), Some(width)) = (&self.feature_names, self.model.n_features()) {
            if self.vectorizer.is_none() && names.len() != width {
                return Err(ModelError::InvalidArtifact(format!(
                    "{} feature names for a model of width {}",
                    names.len(),
                    width
                )));
            }
        }

        Ok(())
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            kind: self.model.kind(),
            n_features: self.model.n_features(),
            threshold: self.threshold,
            has_vectorizer: self.vectorizer.is_some(),
            feature_names: self.feature_names.clone(),
            source: self.source.clone(),
        }
    }
}

/// Read and parse the artifact at `path`
pub fn load_bundle(path: &Path) -> Result<ModelBundle, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }

    tracing::info!("Loading model artifact from: {}", path.display());

    let bytes = std::fs::read(path)?;
    let checksum = hex::encode(Sha256::digest(&bytes));

    let mut bundle = ModelBundle::from_json(&bytes)?;
    bundle.source = Some(ArtifactSource {
        path: path.to_path_buf(),
        checksum,
        loaded_at: Utc::now(),
    });

    if let Some(width) = bundle.model.n_features() {
        if bundle.vectorizer.is_none() && width != FEATURE_COUNT {
            tracing::warn!(
                "Model expects {} features but requests are validated for {}",
                width,
                FEATURE_COUNT
            );
        }
    }

    tracing::info!(
        kind = bundle.model.kind(),
        threshold = bundle.threshold,
        "Model artifact loaded"
    );

    Ok(bundle)
}

/// Memoizing loader shared through application state
#[derive(Debug)]
pub struct ArtifactLoader {
    path: PathBuf,
    cell: OnceCell<Arc<ModelBundle>>,
}

impl ArtifactLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    /// Loader that already holds a bundle and never touches the filesystem
    pub fn preloaded(bundle: ModelBundle) -> Self {
        let path = bundle
            .source
            .as_ref()
            .map(|s| s.path.clone())
            .unwrap_or_default();

        Self {
            path,
            cell: OnceCell::with_value(Arc::new(bundle)),
        }
    }

    /// Bundle, loading it on first use. Failures are not cached.
    pub fn get(&self) -> Result<Arc<ModelBundle>, ModelError> {
        self.cell
            .get_or_try_init(|| load_bundle(&self.path).map(Arc::new))
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn logistic_json(width: usize) -> serde_json::Value {
        serde_json::json!({
            "type": "logistic_regression",
            "coefficients": vec![0.01; width],
            "intercept": -0.2,
        })
    }

    fn write_artifact(value: &serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(value.to_string().as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_bare_estimator_gets_default_threshold() {
        let bundle = ModelBundle::from_json(logistic_json(61).to_string().as_bytes()).unwrap();

        assert_eq!(bundle.threshold, DEFAULT_THRESHOLD);
        assert_eq!(bundle.model.n_features(), Some(61));
        assert!(bundle.vectorizer.is_none());
    }

    #[test]
    fn test_mapping_with_threshold() {
        let doc = serde_json::json!({ "model": logistic_json(61), "threshold": 0.35 });
        let bundle = ModelBundle::from_json(doc.to_string().as_bytes()).unwrap();

        assert_eq!(bundle.threshold, 0.35);
    }

    #[test]
    fn test_mapping_with_separate_vectorizer() {
        let doc = serde_json::json!({
            "model": logistic_json(2),
            "vectorizer": { "type": "count", "vocabulary": { "late": 0, "paid": 1 } },
        });
        let bundle = ModelBundle::from_json(doc.to_string().as_bytes()).unwrap();

        assert!(bundle.vectorizer.is_some());
        assert_eq!(bundle.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_pipeline_key_takes_precedence() {
        let doc = serde_json::json!({
            "pipeline": {
                "type": "pipeline",
                "vectorizer": { "type": "count", "vocabulary": { "late": 0 } },
                "model": logistic_json(1),
            },
            "model": logistic_json(61),
            "threshold": 0.6,
        });
        let bundle = ModelBundle::from_json(doc.to_string().as_bytes()).unwrap();

        assert_eq!(bundle.model.kind(), "pipeline");
        assert_eq!(bundle.threshold, 0.6);
    }

    #[test]
    fn test_bare_pipeline_is_an_estimator() {
        let doc = serde_json::json!({
            "type": "pipeline",
            "vectorizer": { "type": "count", "vocabulary": { "late": 0, "paid": 1 } },
            "model": logistic_json(2),
        });
        let bundle = ModelBundle::from_json(doc.to_string().as_bytes()).unwrap();

        let info = bundle.info();
        assert_eq!(info.kind, "pipeline");
        assert!(!info.has_vectorizer);
        assert_eq!(info.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_threshold_out_of_range() {
        let doc = serde_json::json!({ "model": logistic_json(61), "threshold": 1.5 });
        let result = ModelBundle::from_json(doc.to_string().as_bytes());

        assert!(matches!(result, Err(ModelError::InvalidArtifact(_))));
    }

    #[test]
    fn test_vectorizer_width_mismatch() {
        let doc = serde_json::json!({
            "model": logistic_json(61),
            "vectorizer": { "type": "count", "vocabulary": { "late": 0 } },
        });
        let result = ModelBundle::from_json(doc.to_string().as_bytes());

        assert!(matches!(result, Err(ModelError::InvalidArtifact(_))));
    }

    #[test]
    fn test_garbage_artifact() {
        let result = ModelBundle::from_json(b"not json at all");
        assert!(matches!(result, Err(ModelError::InvalidArtifact(_))));
    }

    #[test]
    fn test_missing_file() {
        let loader = ArtifactLoader::new("/definitely/not/here/model.json");
        let result = loader.get();

        assert!(matches!(result, Err(ModelError::NotFound(_))));
        assert!(!loader.is_loaded());
    }

    #[test]
    fn test_loader_memoizes_and_records_checksum() {
        let file = write_artifact(&logistic_json(61));
        let loader = ArtifactLoader::new(file.path());

        let first = loader.get().unwrap();
        let second = loader.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let source = first.source.as_ref().unwrap();
        assert_eq!(source.checksum.len(), 64);
        assert_eq!(source.path, file.path());
    }

    #[test]
    fn test_failed_load_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let loader = ArtifactLoader::new(&path);

        assert!(loader.get().is_err());

        std::fs::write(&path, logistic_json(61).to_string()).unwrap();
        assert!(loader.get().is_ok());
        assert!(loader.is_loaded());
    }
}
