//! Conversion descriptions
//!
//! A readable account of how every raw field turns into model columns, built
//! from the loaded artifacts so it always describes what serving actually does.

use crate::encoder::CategoricalEncoder;
use crate::ordinal::OrdinalMapper;
use crate::scaler::NumericScaler;
use crate::schema::{FieldKind, Schema};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrdinalEntry {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneHotEntry {
    pub category: String,
    pub column: String,
}

/// How one raw field is converted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "transform", rename_all = "snake_case")]
pub enum FieldConversion {
    Ordinal {
        field: String,
        levels: Vec<OrdinalEntry>,
    },
    OneHot {
        field: String,
        columns: Vec<OneHotEntry>,
    },
    MinMax {
        field: String,
        original_min: f64,
        original_max: f64,
        formula: String,
    },
}

/// Conversion descriptions for every schema field, in schema order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub fields: Vec<FieldConversion>,
}

impl ConversionReport {
    /// Describe the transforms; fields without a fitted artifact are skipped
    pub fn build(schema: &Schema, encoder: &CategoricalEncoder, scaler: &NumericScaler) -> Self {
        let fields = schema
            .fields()
            .iter()
            .filter_map(|field| match field.kind {
                FieldKind::Ordinal => {
                    OrdinalMapper::table(&field.name).map(|table| FieldConversion::Ordinal {
                        field: field.name.clone(),
                        levels: table
                            .into_iter()
                            .map(|(label, value)| OrdinalEntry {
                                label: label.to_string(),
                                value,
                            })
                            .collect(),
                    })
                }
                FieldKind::Nominal => {
                    encoder
                        .vocabulary(&field.name)
                        .map(|vocab| FieldConversion::OneHot {
                            field: field.name.clone(),
                            columns: vocab
                                .categories
                                .iter()
                                .map(|category| OneHotEntry {
                                    category: category.clone(),
                                    column: CategoricalEncoder::column_name(&field.name, category),
                                })
                                .collect(),
                        })
                }
                FieldKind::Numeric => {
                    scaler
                        .range(&field.name)
                        .map(|range| FieldConversion::MinMax {
                            field: field.name.clone(),
                            original_min: range.min,
                            original_max: range.max,
                            formula: range.formula(),
                        })
                }
            })
            .collect();

        Self { fields }
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for conversion in &self.fields {
            match conversion {
                FieldConversion::Ordinal { field, levels } => {
                    writeln!(f, "{field} (ordinal)")?;
                    for level in levels {
                        writeln!(f, "  {} -> {}", level.label, level.value)?;
                    }
                }
                FieldConversion::OneHot { field, columns } => {
                    writeln!(f, "{field} (one-hot)")?;
                    for entry in columns {
                        writeln!(f, "  {} -> column {}", entry.category, entry.column)?;
                    }
                }
                FieldConversion::MinMax {
                    field,
                    original_min,
                    original_max,
                    formula,
                } => {
                    writeln!(f, "{field} (min-max)")?;
                    writeln!(f, "  original range [{original_min}, {original_max}] -> [0, 1]")?;
                    writeln!(f, "  {formula}")?;
                }
            }
        }
        Ok(())
    }
}
