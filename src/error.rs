//! Error types for Mood Risk

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading artifacts, transforming records or predicting
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unknown label '{label}' for ordinal field {field}")]
    UnknownOrdinalLabel { field: String, label: String },

    #[error("Invalid value for field {field}: expected {expected}, got {found}")]
    InvalidValue {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("No fitted transform for field: {field}")]
    UnknownField { field: String },

    #[error("Column produced by more than one transform: {column}")]
    ColumnCollision { column: String },

    #[error("Model returned unsupported class index {0}")]
    UnsupportedClass(usize),

    #[error("Failed to load artifact {}: {reason}", path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    #[error("Artifact does not match schema: {0}")]
    VocabularyMismatch(String),

    #[error("Degenerate range for numeric field {field}: min and max are both {value}")]
    DegenerateRange { field: String, value: f64 },

    #[error("Cannot fit transforms on an empty corpus")]
    EmptyCorpus,

    #[error("Failed to parse record: {0}")]
    Parse(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether the error was caused by the caller's record rather than by the service.
    ///
    /// Input errors are safe to report back with full detail; anything else
    /// should surface as a generic internal failure.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingField { .. }
                | PipelineError::UnknownOrdinalLabel { .. }
                | PipelineError::InvalidValue { .. }
        )
    }

    /// The raw field an input error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            PipelineError::MissingField { field }
            | PipelineError::UnknownOrdinalLabel { field, .. }
            | PipelineError::InvalidValue { field, .. }
            | PipelineError::UnknownField { field }
            | PipelineError::DegenerateRange { field, .. } => Some(field),
            _ => None,
        }
    }

    pub(crate) fn artifact_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
