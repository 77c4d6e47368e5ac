//! student_survey.v1 field definitions
//!
//! Canonical raw field names exactly as the survey collects them, and the
//! semantic kind that decides which transform each field goes through.

use serde::{Deserialize, Serialize};

/// Current input schema version
pub const SCHEMA_VERSION: &str = "student_survey.v1";

pub const AGE: &str = "Age";
pub const ACADEMIC_PRESSURE: &str = "Academic Pressure";
pub const WORK_PRESSURE: &str = "Work Pressure";
pub const CGPA: &str = "CGPA";
pub const STUDY_SATISFACTION: &str = "Study Satisfaction";
pub const JOB_SATISFACTION: &str = "Job Satisfaction";
pub const SLEEP_DURATION: &str = "Sleep Duration";
pub const DIETARY_HABITS: &str = "Dietary Habits";
pub const WORK_STUDY_HOURS: &str = "Work/Study Hours";
pub const FINANCIAL_STRESS: &str = "Financial Stress";
pub const GENDER: &str = "Gender";
pub const SUICIDAL_THOUGHTS: &str = "Have you ever had suicidal thoughts ?";
pub const FAMILY_HISTORY: &str = "Family History of Mental Illness";
pub const DEGREE: &str = "Degree";

/// Training label column; present in the corpus, never in live requests
pub const DEPRESSION: &str = "Depression";

/// Semantic kind of a raw field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Continuous value, min-max scaled with fitted bounds
    Numeric,
    /// Ordered text label mapped through a constant table
    Ordinal,
    /// Unordered category, one-hot encoded over a fitted vocabulary
    Nominal,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Numeric => "numeric",
            FieldKind::Ordinal => "ordinal",
            FieldKind::Nominal => "nominal",
        }
    }
}

/// A raw input field and its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Numeric)
    }

    pub fn ordinal(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Ordinal)
    }

    pub fn nominal(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Nominal)
    }
}

/// Survey fields in training column order: scalar columns first, then the
/// one-hot encoded fields.
pub fn student_survey_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::numeric(AGE),
        FieldSpec::numeric(ACADEMIC_PRESSURE),
        FieldSpec::numeric(WORK_PRESSURE),
        FieldSpec::numeric(CGPA),
        FieldSpec::numeric(STUDY_SATISFACTION),
        FieldSpec::numeric(JOB_SATISFACTION),
        FieldSpec::ordinal(SLEEP_DURATION),
        FieldSpec::ordinal(DIETARY_HABITS),
        FieldSpec::numeric(WORK_STUDY_HOURS),
        FieldSpec::numeric(FINANCIAL_STRESS),
        FieldSpec::nominal(GENDER),
        FieldSpec::nominal(SUICIDAL_THOUGHTS),
        FieldSpec::nominal(FAMILY_HISTORY),
        FieldSpec::nominal(DEGREE),
    ]
}
