//! Ordinal label mapping
//!
//! Ordered survey answers (sleep buckets, diet quality) map onto fixed points in
//! [0, 1]. The tables are constants shared by training and serving, so they are
//! closed enums rather than fitted artifacts. Labels outside a table are rejected:
//! substituting a default would put the record somewhere on the learned scale the
//! respondent never chose.

use crate::error::PipelineError;
use crate::schema::{DIETARY_HABITS, SLEEP_DURATION};
use serde::{Deserialize, Serialize};

/// A closed, ordered set of labels with fixed numeric positions
pub trait OrdinalScale: Copy + Sized + 'static {
    /// Raw field this scale applies to
    const FIELD: &'static str;
    /// All levels, lowest first
    const LEVELS: &'static [Self];

    fn label(self) -> &'static str;

    fn value(self) -> f64;

    fn from_label(label: &str) -> Option<Self> {
        Self::LEVELS.iter().copied().find(|level| level.label() == label)
    }

    /// `(label, value)` pairs in level order
    fn table() -> Vec<(&'static str, f64)> {
        Self::LEVELS
            .iter()
            .map(|level| (level.label(), level.value()))
            .collect()
    }
}

/// Self-reported nightly sleep bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepDuration {
    #[serde(rename = "Less than 5 hours")]
    LessThanFive,
    #[serde(rename = "5-6 hours")]
    FiveToSix,
    #[serde(rename = "7-8 hours")]
    SevenToEight,
    #[serde(rename = "More than 8 hours")]
    MoreThanEight,
}

impl OrdinalScale for SleepDuration {
    const FIELD: &'static str = SLEEP_DURATION;
    const LEVELS: &'static [Self] = &[
        SleepDuration::LessThanFive,
        SleepDuration::FiveToSix,
        SleepDuration::SevenToEight,
        SleepDuration::MoreThanEight,
    ];

    fn label(self) -> &'static str {
        match self {
            SleepDuration::LessThanFive => "Less than 5 hours",
            SleepDuration::FiveToSix => "5-6 hours",
            SleepDuration::SevenToEight => "7-8 hours",
            SleepDuration::MoreThanEight => "More than 8 hours",
        }
    }

    // The training corpus used these literal values, not exact thirds.
    fn value(self) -> f64 {
        match self {
            SleepDuration::LessThanFive => 0.0,
            SleepDuration::FiveToSix => 0.33,
            SleepDuration::SevenToEight => 0.66,
            SleepDuration::MoreThanEight => 1.0,
        }
    }
}

/// Self-reported diet quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DietaryHabits {
    Unhealthy,
    Moderate,
    Healthy,
}

impl OrdinalScale for DietaryHabits {
    const FIELD: &'static str = DIETARY_HABITS;
    const LEVELS: &'static [Self] = &[
        DietaryHabits::Unhealthy,
        DietaryHabits::Moderate,
        DietaryHabits::Healthy,
    ];

    fn label(self) -> &'static str {
        match self {
            DietaryHabits::Unhealthy => "Unhealthy",
            DietaryHabits::Moderate => "Moderate",
            DietaryHabits::Healthy => "Healthy",
        }
    }

    fn value(self) -> f64 {
        match self {
            DietaryHabits::Unhealthy => 0.0,
            DietaryHabits::Moderate => 0.5,
            DietaryHabits::Healthy => 1.0,
        }
    }
}

/// Mapper over every ordinal field the service knows about
pub struct OrdinalMapper;

impl OrdinalMapper {
    /// Fields with a constant ordinal table
    pub const FIELDS: &'static [&'static str] = &[SleepDuration::FIELD, DietaryHabits::FIELD];

    /// Map a label of an ordinal field to its position in [0, 1]
    pub fn map(field: &str, label: &str) -> Result<f64, PipelineError> {
        match field {
            SLEEP_DURATION => lookup::<SleepDuration>(label),
            DIETARY_HABITS => lookup::<DietaryHabits>(label),
            _ => Err(PipelineError::UnknownField {
                field: field.to_string(),
            }),
        }
    }

    pub fn handles(field: &str) -> bool {
        Self::FIELDS.contains(&field)
    }

    /// The constant table for a field, lowest level first
    pub fn table(field: &str) -> Option<Vec<(&'static str, f64)>> {
        match field {
            SLEEP_DURATION => Some(SleepDuration::table()),
            DIETARY_HABITS => Some(DietaryHabits::table()),
            _ => None,
        }
    }
}

fn lookup<S: OrdinalScale>(label: &str) -> Result<f64, PipelineError> {
    S::from_label(label)
        .map(S::value)
        .ok_or_else(|| PipelineError::UnknownOrdinalLabel {
            field: S::FIELD.to_string(),
            label: label.to_string(),
        })
}
