//! Estimators
//!
//! The fitted classifiers a bundle can carry. Every estimator scores a batch
//! and returns one `[p(neg), p(pos)]` row per sample.

use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::vectorizer::{Vectorizer, VectorizerSpec};

/// Probability-scoring classifier
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Score numeric rows, shape `(n_samples, n_features)` -> `(n_samples, 2)`
    fn predict_proba(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<f64>, ModelError>;

    /// Score raw text. Only estimators that embed their own vectorizer accept it.
    fn predict_proba_text(&self, _texts: &[&str]) -> Result<Array2<f64>, ModelError> {
        Err(ModelError::UnsupportedInput { kind: self.kind(), input: "text" })
    }

    /// Input width the estimator was fitted on, if it takes numeric rows
    fn n_features(&self) -> Option<usize>;

    fn kind(&self) -> &'static str;
}

/// Estimator as described in the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatorSpec {
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    Pipeline {
        vectorizer: VectorizerSpec,
        model: Box<EstimatorSpec>,
    },
}

impl EstimatorSpec {
    pub fn build(self) -> Result<Arc<dyn Classifier>, ModelError> {
        match self {
            EstimatorSpec::LogisticRegression { coefficients, intercept } => {
                Ok(Arc::new(LogisticRegression::new(coefficients, intercept)?))
            }
            EstimatorSpec::Pipeline { vectorizer, model } => {
                let vectorizer: Arc<dyn Vectorizer> = Arc::new(vectorizer.build()?);
                let model = model.build()?;
                Ok(Arc::new(Pipeline::new(vectorizer, model)?))
            }
        }
    }
}

// ============================================================================
// LOGISTIC REGRESSION
// ============================================================================

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, ModelError> {
        if coefficients.is_empty() {
            return Err(ModelError::InvalidArtifact(
                "logistic regression has no coefficients".to_string(),
            ));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::InvalidArtifact(
                "logistic regression parameters must be finite".to_string(),
            ));
        }

        Ok(Self {
            coefficients: Array1::from(coefficients),
            intercept,
        })
    }

    /// `w·x + b` for one row
    fn logit(&self, row: ArrayView1<'_, f64>) -> f64 {
        let z = row.dot(&self.coefficients);
        if z.is_finite() {
            return z + self.intercept;
        }

        // Partial sums overflowed; score the row scaled into [-1, 1] instead.
        // The result may still saturate to +/-inf, which sigmoid maps to 1 or 0.
        let scale = row.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let scaled = row.mapv(|v| v / scale).dot(&self.coefficients);
        scale * scaled + self.intercept
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticRegression {
    fn predict_proba(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<f64>, ModelError> {
        let width = self.coefficients.len();
        if rows.ncols() != width {
            return Err(ModelError::FeatureMismatch { expected: width, actual: rows.ncols() });
        }

        let positive: Array1<f64> = rows
            .axis_iter(Axis(0))
            .map(|row| sigmoid(self.logit(row)))
            .collect();

        let mut proba = Array2::<f64>::zeros((rows.nrows(), 2));
        for (mut out, p) in proba.axis_iter_mut(Axis(0)).zip(positive.iter()) {
            out[0] = 1.0 - p;
            out[1] = *p;
        }
        Ok(proba)
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn kind(&self) -> &'static str {
        "logistic_regression"
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Vectorizer followed by a numeric estimator
#[derive(Debug)]
pub struct Pipeline {
    vectorizer: Arc<dyn Vectorizer>,
    model: Arc<dyn Classifier>,
}

impl Pipeline {
    pub fn new(vectorizer: Arc<dyn Vectorizer>, model: Arc<dyn Classifier>) -> Result<Self, ModelError> {
        if let Some(width) = model.n_features() {
            if width != vectorizer.vocabulary_size() {
                return Err(ModelError::InvalidArtifact(format!(
                    "pipeline vectorizer yields {} columns but its model expects {}",
                    vectorizer.vocabulary_size(),
                    width
                )));
            }
        }
        Ok(Self { vectorizer, model })
    }
}

impl Classifier for Pipeline {
    fn predict_proba(&self, _rows: ArrayView2<'_, f64>) -> Result<Array2<f64>, ModelError> {
        Err(ModelError::UnsupportedInput { kind: self.kind(), input: "numeric" })
    }

    fn predict_proba_text(&self, texts: &[&str]) -> Result<Array2<f64>, ModelError> {
        let rows = self.vectorizer.transform(texts);
        self.model.predict_proba(rows.view())
    }

    fn n_features(&self) -> Option<usize> {
        None
    }

    fn kind(&self) -> &'static str {
        "pipeline"
    }
}
