//! One-hot encoding of nominal fields
//!
//! Each nominal field carries an ordered vocabulary fixed at fit time. A label
//! becomes one indicator column per vocabulary entry, named `field_category`.
//! Labels outside the vocabulary encode as an all-zero row, the same
//! representation the aligner gives a field that was never produced at all.

use crate::config::read_json_artifact;
use crate::error::PipelineError;
use crate::types::TransformWarning;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Fitted vocabulary for one nominal field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldVocabulary {
    pub field: String,
    /// Known categories, in output column order
    pub categories: Vec<String>,
}

impl FieldVocabulary {
    pub fn new(field: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            field: field.into(),
            categories,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| CategoricalEncoder::column_name(&self.field, c))
            .collect()
    }
}

/// Indicator row for one encoded label
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    /// `(column name, 0.0 | 1.0)` in vocabulary order
    pub columns: Vec<(String, f64)>,
    /// Set when the label was not in the vocabulary
    pub warning: Option<TransformWarning>,
}

impl EncodedRow {
    pub fn values(&self) -> Vec<f64> {
        self.columns.iter().map(|(_, v)| *v).collect()
    }
}

/// Fitted one-hot encoder over every nominal field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitted_at: Option<DateTime<Utc>>,
    fields: Vec<FieldVocabulary>,
}

impl CategoricalEncoder {
    /// Build an encoder, rejecting duplicate fields or duplicate categories
    pub fn new(fields: Vec<FieldVocabulary>) -> Result<Self, PipelineError> {
        let encoder = Self {
            fitted_at: None,
            fields,
        };
        encoder.check()?;
        Ok(encoder)
    }

    /// Parse and check a serialized encoder
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let encoder: Self = serde_json::from_str(json)?;
        encoder.check()?;
        Ok(encoder)
    }

    /// Load a serialized encoder from disk
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let encoder: Self = read_json_artifact(path)?;
        encoder
            .check()
            .map_err(|e| PipelineError::artifact_load(path, e))?;
        Ok(encoder)
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        serde_json::to_string_pretty(self).map_err(PipelineError::Json)
    }

    pub fn with_fitted_at(mut self, fitted_at: DateTime<Utc>) -> Self {
        self.fitted_at = Some(fitted_at);
        self
    }

    fn check(&self) -> Result<(), PipelineError> {
        let mut seen_fields = HashSet::new();
        for vocab in &self.fields {
            if !seen_fields.insert(vocab.field.as_str()) {
                return Err(PipelineError::VocabularyMismatch(format!(
                    "encoder lists field {} twice",
                    vocab.field
                )));
            }
            let mut seen = HashSet::new();
            for category in &vocab.categories {
                if !seen.insert(category.as_str()) {
                    return Err(PipelineError::VocabularyMismatch(format!(
                        "category '{}' appears twice in vocabulary of {}",
                        category, vocab.field
                    )));
                }
            }
        }
        Ok(())
    }

    /// Output column name for one category of a field
    pub fn column_name(field: &str, category: &str) -> String {
        format!("{field}_{category}")
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|v| v.field.as_str())
    }

    pub fn vocabularies(&self) -> &[FieldVocabulary] {
        &self.fields
    }

    pub fn vocabulary(&self, field: &str) -> Option<&FieldVocabulary> {
        self.fields.iter().find(|v| v.field == field)
    }

    /// Column names a field encodes into, in vocabulary order
    pub fn column_names(&self, field: &str) -> Result<Vec<String>, PipelineError> {
        self.require(field).map(FieldVocabulary::column_names)
    }

    /// One-hot encode a label of a nominal field.
    ///
    /// The row always has one entry per vocabulary category. An unknown label
    /// yields all zeros and a [`TransformWarning::UnknownCategory`].
    pub fn encode(&self, field: &str, label: &str) -> Result<EncodedRow, PipelineError> {
        let vocab = self.require(field)?;
        let hit = vocab.categories.iter().position(|c| c == label);

        let columns = vocab
            .categories
            .iter()
            .enumerate()
            .map(|(i, category)| {
                let value = if Some(i) == hit { 1.0 } else { 0.0 };
                (Self::column_name(field, category), value)
            })
            .collect();

        let warning = if hit.is_none() {
            warn!(field, label, "unknown category, encoding as all-zero row");
            Some(TransformWarning::UnknownCategory {
                field: field.to_string(),
                label: label.to_string(),
            })
        } else {
            None
        };

        Ok(EncodedRow { columns, warning })
    }

    fn require(&self, field: &str) -> Result<&FieldVocabulary, PipelineError> {
        self.vocabulary(field).ok_or_else(|| PipelineError::UnknownField {
            field: field.to_string(),
        })
    }
}
