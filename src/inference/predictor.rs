//! Predictor - shapes input, scores it and applies the decision threshold

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::loader::ModelBundle;

/// Prediction output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: i32,
    pub proba: f64,
    pub threshold: f64,
}

/// Positive label at or above the threshold
pub fn apply_threshold(proba: f64, threshold: f64) -> i32 {
    if proba >= threshold {
        1
    } else {
        0
    }
}

/// Predict from a numeric feature vector
pub fn predict_features(bundle: &ModelBundle, features: &[f64]) -> Result<Prediction, ModelError> {
    if let Some(expected) = bundle.model.n_features() {
        if features.len() != expected {
            return Err(ModelError::FeatureMismatch { expected, actual: features.len() });
        }
    }

    // Single sample, shape (1, n_features)
    let row = ArrayView2::from_shape((1, features.len()), features)
        .map_err(|e| ModelError::InvalidOutput(e.to_string()))?;

    let proba = bundle.model.predict_proba(row)?;
    finish(bundle, &proba)
}

/// Predict from free text
pub fn predict_text(bundle: &ModelBundle, text: &str) -> Result<Prediction, ModelError> {
    let proba = match &bundle.vectorizer {
        Some(vectorizer) => {
            let rows = vectorizer.transform(&[text]);
            bundle.model.predict_proba(rows.view())?
        }
        None => bundle.model.predict_proba_text(&[text])?,
    };

    finish(bundle, &proba)
}

fn finish(bundle: &ModelBundle, proba: &Array2<f64>) -> Result<Prediction, ModelError> {
    let proba_pos = positive_proba(proba)?;

    Ok(Prediction {
        label: apply_threshold(proba_pos, bundle.threshold),
        proba: proba_pos,
        threshold: bundle.threshold,
    })
}

/// Column 1 of the first row
fn positive_proba(proba: &Array2<f64>) -> Result<f64, ModelError> {
    if proba.nrows() == 0 || proba.ncols() < 2 {
        return Err(ModelError::InvalidOutput(format!(
            "expected at least a (1, 2) probability matrix, got {:?}",
            proba.shape()
        )));
    }

    let p = proba[[0, 1]];
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(ModelError::InvalidOutput(format!("{} is not a probability", p)));
    }
    Ok(p)
}
