//! Feature alignment
//!
//! Reconciles the columns a record's transforms produced against the exact column
//! list a model was fitted on. Expected columns that were not produced are
//! zero-filled; produced columns the model never saw are dropped. Zero-filling
//! hides genuinely missing signal, which is accepted: it keeps older transforms
//! usable against models fitted on a slightly different vocabulary.

use crate::types::{FeatureVector, TransformedColumns};
use tracing::debug;

/// What alignment had to paper over for one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentReport {
    /// Expected columns not produced by any transform
    pub zero_filled: Vec<String>,
    /// Produced columns absent from the expected list
    pub dropped: Vec<String>,
}

impl AlignmentReport {
    pub fn is_exact(&self) -> bool {
        self.zero_filled.is_empty() && self.dropped.is_empty()
    }
}

/// Aligner from transformed columns to a model's column order
pub struct FeatureAligner;

impl FeatureAligner {
    /// Produce a vector with exactly one value per expected column, in order
    pub fn align(columns: &TransformedColumns, expected_columns: &[String]) -> FeatureVector {
        Self::align_with_report(columns, expected_columns).0
    }

    /// Same as [`FeatureAligner::align`], also reporting zero-filled and dropped columns
    pub fn align_with_report(
        columns: &TransformedColumns,
        expected_columns: &[String],
    ) -> (FeatureVector, AlignmentReport) {
        let mut report = AlignmentReport::default();

        let values = expected_columns
            .iter()
            .map(|name| match columns.get(name) {
                Some(value) => value,
                None => {
                    report.zero_filled.push(name.clone());
                    0.0
                }
            })
            .collect();

        report.dropped = columns
            .names()
            .filter(|name| !expected_columns.iter().any(|c| c == name))
            .map(str::to_string)
            .collect();

        if !report.is_exact() {
            debug!(
                zero_filled = report.zero_filled.len(),
                dropped = report.dropped.len(),
                "aligned record against model columns"
            );
        }

        (FeatureVector::new(values), report)
    }
}
