//! Input schema and model column contract
//!
//! The schema lists the raw survey fields with their kinds, and the exact output
//! column order the active model was fitted on. Both are fixed once artifacts are
//! loaded.

mod adapter;
mod fields;

pub use adapter::*;
pub use fields::*;

use crate::error::PipelineError;
use crate::ordinal::OrdinalMapper;
use crate::types::{RawRecord, RawValue};
use std::collections::HashSet;

/// Raw fields plus the column order a fitted model expects
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    expected_columns: Vec<String>,
}

impl Schema {
    /// Build a schema, rejecting duplicate field or column names
    pub fn new(
        fields: Vec<FieldSpec>,
        expected_columns: Vec<String>,
    ) -> Result<Self, PipelineError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(PipelineError::VocabularyMismatch(format!(
                    "field {} declared twice",
                    field.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for column in &expected_columns {
            if !seen.insert(column.as_str()) {
                return Err(PipelineError::ColumnCollision {
                    column: column.clone(),
                });
            }
        }

        Ok(Self {
            fields,
            expected_columns,
        })
    }

    /// The student survey fields with no model columns attached yet
    pub fn student_survey() -> Self {
        Self {
            fields: student_survey_fields(),
            expected_columns: Vec::new(),
        }
    }

    /// Attach the column order of a fitted model
    pub fn with_expected_columns(
        self,
        expected_columns: Vec<String>,
    ) -> Result<Self, PipelineError> {
        Self::new(self.fields, expected_columns)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Names of the fields of one kind, in declaration order
    pub fn fields_of(&self, kind: FieldKind) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(move |f| f.kind == kind)
            .map(|f| f.name.as_str())
    }

    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.fields.iter().find(|f| f.name == field).map(|f| f.kind)
    }

    pub fn expected_columns(&self) -> &[String] {
        &self.expected_columns
    }

    /// Check that every declared field is present, in declaration order.
    ///
    /// Runs before any transform so a missing field never reaches the model.
    pub fn require_fields(&self, record: &RawRecord) -> Result<(), PipelineError> {
        match self.fields.iter().find(|f| !record.contains(&f.name)) {
            Some(missing) => Err(PipelineError::MissingField {
                field: missing.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Full input validation: presence, value types and ordinal vocabularies.
    ///
    /// Nominal labels are not checked here; unknown categories are recoverable.
    pub fn validate_record(&self, record: &RawRecord) -> Result<(), PipelineError> {
        self.require_fields(record)?;

        for field in &self.fields {
            match field.kind {
                FieldKind::Numeric => {
                    let value = record.number(&field.name)?;
                    if !value.is_finite() {
                        return Err(PipelineError::InvalidValue {
                            field: field.name.clone(),
                            expected: "finite number",
                            found: RawValue::Number(value).describe(),
                        });
                    }
                }
                FieldKind::Ordinal => {
                    let label = record.label(&field.name)?;
                    OrdinalMapper::map(&field.name, label)?;
                }
                FieldKind::Nominal => {
                    record.label(&field.name)?;
                }
            }
        }

        Ok(())
    }
}
