//! Text vectorizers
//!
//! Turn raw text into the fixed-width rows a fitted estimator expects.
//! Vocabulary and IDF weights come from the artifact; nothing is fitted here.

use std::collections::HashMap;
use std::fmt;

use ndarray::Array2;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::ModelError;

/// Tokens of two or more word characters
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?u)\b\w\w+\b").expect("token pattern is valid")
});

/// Feature transformer applied before the estimator
pub trait Vectorizer: Send + Sync + fmt::Debug {
    /// One row per text, `vocabulary_size()` columns
    fn transform(&self, texts: &[&str]) -> Array2<f64>;

    fn vocabulary_size(&self) -> usize;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Norm {
    #[default]
    L2,
    None,
}

/// Vectorizer as described in the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VectorizerSpec {
    Count {
        vocabulary: HashMap<String, usize>,
        #[serde(default = "default_lowercase")]
        lowercase: bool,
    },
    Tfidf {
        vocabulary: HashMap<String, usize>,
        idf: Vec<f64>,
        #[serde(default = "default_lowercase")]
        lowercase: bool,
        #[serde(default)]
        norm: Norm,
    },
}

fn default_lowercase() -> bool {
    true
}

impl VectorizerSpec {
    pub fn build(self) -> Result<TextVectorizer, ModelError> {
        let vectorizer = match self {
            VectorizerSpec::Count { vocabulary, lowercase } => TextVectorizer {
                vocabulary,
                idf: None,
                lowercase,
                norm: Norm::None,
            },
            VectorizerSpec::Tfidf { vocabulary, idf, lowercase, norm } => {
                if idf.len() != vocabulary.len() {
                    return Err(ModelError::InvalidArtifact(format!(
                        "tfidf vectorizer has {} idf weights for a vocabulary of {}",
                        idf.len(),
                        vocabulary.len()
                    )));
                }
                TextVectorizer {
                    vocabulary,
                    idf: Some(idf),
                    lowercase,
                    norm,
                }
            }
        };

        let width = vectorizer.vocabulary.len();
        if let Some((term, index)) = vectorizer.vocabulary.iter().find(|(_, index)| **index >= width) {
            return Err(ModelError::InvalidArtifact(format!(
                "vocabulary term '{}' maps to column {} outside 0..{}",
                term, index, width
            )));
        }

        Ok(vectorizer)
    }
}

/// Bag-of-words / TF-IDF vectorizer over a fixed vocabulary
#[derive(Debug, Clone)]
pub struct TextVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Option<Vec<f64>>,
    lowercase: bool,
    norm: Norm,
}

impl TextVectorizer {
    fn tokens<'a>(&self, text: &'a str) -> Vec<std::borrow::Cow<'a, str>> {
        TOKEN_PATTERN
            .find_iter(text)
            .map(|m| {
                if self.lowercase {
                    std::borrow::Cow::Owned(m.as_str().to_lowercase())
                } else {
                    std::borrow::Cow::Borrowed(m.as_str())
                }
            })
            .collect()
    }
}

impl Vectorizer for TextVectorizer {
    fn transform(&self, texts: &[&str]) -> Array2<f64> {
        let mut rows = Array2::<f64>::zeros((texts.len(), self.vocabulary.len()));

        for (i, text) in texts.iter().enumerate() {
            let mut row = rows.row_mut(i);

            for token in self.tokens(text) {
                if let Some(&col) = self.vocabulary.get(&*token) {
                    row[col] += 1.0;
                }
            }

            if let Some(idf) = &self.idf {
                for (value, weight) in row.iter_mut().zip(idf) {
                    *value *= weight;
                }
            }

            if self.norm == Norm::L2 {
                let length = row.iter().map(|v| v * v).sum::<f64>().sqrt();
                if length > 0.0 {
                    row.mapv_inplace(|v| v / length);
                }
            }
        }

        rows
    }

    fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}
