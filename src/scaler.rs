//! Min-max scaling of numeric fields
//!
//! Each numeric field is mapped through `(value - min) / (max - min)` using the
//! bounds observed in the training corpus. Output is deliberately not clamped:
//! a live value beyond the training range lands outside [0, 1] exactly as the
//! linear transform dictates.

use crate::config::read_json_artifact;
use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Observed bounds of one numeric field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub field: String,
    pub min: f64,
    pub max: f64,
}

impl FeatureRange {
    pub fn new(field: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            field: field.into(),
            min,
            max,
        }
    }

    pub fn scale(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    /// Literal formula, for conversion reports
    pub fn formula(&self) -> String {
        format!("(value - {}) / ({} - {})", self.min, self.max, self.min)
    }

    fn check(&self) -> Result<(), PipelineError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(PipelineError::VocabularyMismatch(format!(
                "range of {} is not finite",
                self.field
            )));
        }
        // max == min would divide by zero at serve time
        if self.max <= self.min {
            return Err(PipelineError::DegenerateRange {
                field: self.field.clone(),
                value: self.min,
            });
        }
        Ok(())
    }
}

/// Fitted min-max scaler over every numeric field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitted_at: Option<DateTime<Utc>>,
    ranges: Vec<FeatureRange>,
}

impl NumericScaler {
    /// Build a scaler, rejecting degenerate or duplicated ranges
    pub fn new(ranges: Vec<FeatureRange>) -> Result<Self, PipelineError> {
        let scaler = Self {
            fitted_at: None,
            ranges,
        };
        scaler.check()?;
        Ok(scaler)
    }

    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let scaler: Self = serde_json::from_str(json)?;
        scaler.check()?;
        Ok(scaler)
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let scaler: Self = read_json_artifact(path)?;
        scaler
            .check()
            .map_err(|e| PipelineError::artifact_load(path, e))?;
        Ok(scaler)
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        serde_json::to_string_pretty(self).map_err(PipelineError::Json)
    }

    pub fn with_fitted_at(mut self, fitted_at: DateTime<Utc>) -> Self {
        self.fitted_at = Some(fitted_at);
        self
    }

    fn check(&self) -> Result<(), PipelineError> {
        let mut seen = HashSet::new();
        for range in &self.ranges {
            if !seen.insert(range.field.as_str()) {
                return Err(PipelineError::VocabularyMismatch(format!(
                    "scaler lists field {} twice",
                    range.field
                )));
            }
            range.check()?;
        }
        Ok(())
    }

    pub fn ranges(&self) -> &[FeatureRange] {
        &self.ranges
    }

    pub fn range(&self, field: &str) -> Option<&FeatureRange> {
        self.ranges.iter().find(|r| r.field == field)
    }

    /// Scale a value of a numeric field with its fitted bounds
    pub fn scale(&self, field: &str, value: f64) -> Result<f64, PipelineError> {
        self.range(field)
            .map(|r| r.scale(value))
            .ok_or_else(|| PipelineError::UnknownField {
                field: field.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scaler() -> NumericScaler {
        NumericScaler::new(vec![
            FeatureRange::new("Age", 18.0, 59.0),
            FeatureRange::new("CGPA", 0.0, 10.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_scale_within_range() {
        let s = scaler();
        assert_eq!(s.scale("CGPA", 8.5).unwrap(), 0.85);
        assert!((s.scale("Age", 25.0).unwrap() - 7.0 / 41.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_values_are_not_clamped() {
        let s = scaler();
        assert_eq!(s.scale("CGPA", 12.0).unwrap(), 1.2);
        assert_eq!(s.scale("CGPA", -1.0).unwrap(), -0.1);
    }

    #[test]
    fn test_degenerate_range_rejected() {
        let result = NumericScaler::new(vec![FeatureRange::new("Work Pressure", 0.0, 0.0)]);
        assert!(matches!(
            result,
            Err(PipelineError::DegenerateRange { ref field, .. }) if field == "Work Pressure"
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(NumericScaler::new(vec![FeatureRange::new("Age", 30.0, 18.0)]).is_err());
    }

    #[test]
    fn test_degenerate_range_rejected_on_parse() {
        let json = r#"{"ranges":[{"field":"Age","min":3.0,"max":3.0}]}"#;
        assert!(NumericScaler::from_json(json).is_err());
    }

    #[test]
    fn test_unknown_field() {
        assert!(matches!(
            scaler().scale("Height", 1.8),
            Err(PipelineError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_formula() {
        assert_eq!(
            FeatureRange::new("Age", 18.0, 59.0).formula(),
            "(value - 18) / (59 - 18)"
        );
    }

    proptest! {
        #[test]
        fn prop_bounds_scale_exactly(min in -1.0e6f64..1.0e6, width in 1.0e-3f64..1.0e6) {
            let max = min + width;
            prop_assume!(max > min);
            let s = NumericScaler::new(vec![FeatureRange::new("x", min, max)]).unwrap();

            prop_assert_eq!(s.scale("x", min).unwrap(), 0.0);
            prop_assert_eq!(s.scale("x", max).unwrap(), 1.0);
        }
    }
}
