//! Core types for the Mood Risk pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw survey records, transformed columns, aligned feature vectors
//! and prediction results.

use crate::error::PipelineError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single raw input value: either a number or a text label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Label(String),
}

impl RawValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Label(_) => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            RawValue::Number(_) => None,
            RawValue::Label(s) => Some(s.as_str()),
        }
    }

    /// Short description used in validation errors
    pub fn describe(&self) -> String {
        match self {
            RawValue::Number(n) => format!("number {n}"),
            RawValue::Label(s) => format!("label '{s}'"),
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        RawValue::Number(f64::from(n))
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Label(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Label(s)
    }
}

/// One raw survey record keyed by field name.
///
/// Records may be incomplete or carry unknown categories; the pipeline decides
/// which of those conditions are fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, RawValue>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<RawValue> {
        self.fields.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Numeric value of a field, distinguishing absence from a type mismatch
    pub fn number(&self, field: &str) -> Result<f64, PipelineError> {
        match self.fields.get(field) {
            None => Err(PipelineError::MissingField {
                field: field.to_string(),
            }),
            Some(RawValue::Number(n)) => Ok(*n),
            Some(other) => Err(PipelineError::InvalidValue {
                field: field.to_string(),
                expected: "number",
                found: other.describe(),
            }),
        }
    }

    /// Text label of a field, distinguishing absence from a type mismatch
    pub fn label(&self, field: &str) -> Result<&str, PipelineError> {
        match self.fields.get(field) {
            None => Err(PipelineError::MissingField {
                field: field.to_string(),
            }),
            Some(RawValue::Label(s)) => Ok(s.as_str()),
            Some(other) => Err(PipelineError::InvalidValue {
                field: field.to_string(),
                expected: "text label",
                found: other.describe(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for RawRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A null value is an absent field
        let fields = BTreeMap::<String, Option<RawValue>>::deserialize(deserializer)?;
        Ok(fields
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| (field, v)))
            .collect())
    }
}

/// Columns produced by the transforms before alignment, keyed by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformedColumns {
    columns: BTreeMap<String, f64>,
}

impl TransformedColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column, rejecting a name some other transform already produced
    pub fn insert_unique(&mut self, name: String, value: f64) -> Result<(), PipelineError> {
        if self.columns.contains_key(&name) {
            return Err(PipelineError::ColumnCollision { column: name });
        }
        self.columns.insert(name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

impl FromIterator<(String, f64)> for TransformedColumns {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Numeric features in the exact column order a fitted model expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a value by column name against the column order it was aligned to
    pub fn value_of(&self, columns: &[String], name: &str) -> Option<f64> {
        columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i).copied())
    }
}

/// Human-readable outcome of the binary classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepressionLabel {
    #[serde(rename = "Not Likely Depressed")]
    NotLikelyDepressed,
    #[serde(rename = "Likely Depressed")]
    LikelyDepressed,
}

impl DepressionLabel {
    /// Map a model class index to a label; the model must be strictly binary
    pub fn from_class(class: usize) -> Result<Self, PipelineError> {
        match class {
            0 => Ok(DepressionLabel::NotLikelyDepressed),
            1 => Ok(DepressionLabel::LikelyDepressed),
            other => Err(PipelineError::UnsupportedClass(other)),
        }
    }

    pub fn class_index(&self) -> u8 {
        match self {
            DepressionLabel::NotLikelyDepressed => 0,
            DepressionLabel::LikelyDepressed => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepressionLabel::NotLikelyDepressed => "Not Likely Depressed",
            DepressionLabel::LikelyDepressed => "Likely Depressed",
        }
    }
}

impl fmt::Display for DepressionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body for a single prediction: `{ "prediction": 0|1, "label": "..." }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: u8,
    pub label: DepressionLabel,
}

impl From<DepressionLabel> for PredictionResult {
    fn from(label: DepressionLabel) -> Self {
        Self {
            prediction: label.class_index(),
            label,
        }
    }
}

/// Recoverable conditions encountered while transforming a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformWarning {
    /// Nominal label outside the fitted vocabulary; encoded as an all-zero row
    UnknownCategory { field: String, label: String },
}

impl fmt::Display for TransformWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformWarning::UnknownCategory { field, label } => {
                write!(f, "unknown category '{label}' for field {field}")
            }
        }
    }
}
