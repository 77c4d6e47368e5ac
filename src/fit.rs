//! Offline fitting of transform artifacts
//!
//! Learns the one-hot vocabularies and min-max ranges from a training corpus and
//! turns the corpus into model-ready rows through the same [`FeatureTransform`]
//! serving uses. Model training itself happens elsewhere; it consumes the rows
//! and the column list produced here.

use crate::aligner::FeatureAligner;
use crate::encoder::{CategoricalEncoder, FieldVocabulary};
use crate::error::PipelineError;
use crate::pipeline::FeatureTransform;
use crate::scaler::{FeatureRange, NumericScaler};
use crate::schema::{FieldKind, Schema, DEPRESSION};
use crate::types::{FeatureVector, RawRecord, RawValue};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Artifacts learned from one training corpus
#[derive(Debug, Clone, PartialEq)]
pub struct FittedArtifacts {
    pub encoder: CategoricalEncoder,
    pub scaler: NumericScaler,
    /// Median of each numeric field, used to fill gaps in the corpus
    pub medians: BTreeMap<String, f64>,
    /// Nominal fields encoded for training but never sent at serve time
    pub training_only: Vec<String>,
}

/// One transformed training example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub features: FeatureVector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u8>,
}

impl FittedArtifacts {
    /// Canonical column order for a model trained on these transforms:
    /// schema field order, nominal fields expanded in vocabulary order, then
    /// the one-hot columns of training-only fields.
    pub fn output_columns(&self, schema: &Schema) -> Result<Vec<String>, PipelineError> {
        let mut columns = Vec::new();
        for field in schema.fields() {
            match field.kind {
                FieldKind::Numeric | FieldKind::Ordinal => columns.push(field.name.clone()),
                FieldKind::Nominal => columns.extend(self.encoder.column_names(&field.name)?),
            }
        }
        for field in &self.training_only {
            columns.extend(self.encoder.column_names(field)?);
        }
        Ok(columns)
    }

    pub fn transform<'a>(&'a self, schema: &'a Schema) -> FeatureTransform<'a> {
        FeatureTransform::new(schema, &self.encoder, &self.scaler)
    }

    /// Fill absent or non-finite numeric fields with the fitted median
    pub fn impute(&self, record: &RawRecord) -> RawRecord {
        let mut filled = record.clone();
        for (field, median) in &self.medians {
            let missing = match record.get(field) {
                None => true,
                Some(RawValue::Number(n)) => !n.is_finite(),
                Some(RawValue::Label(_)) => false,
            };
            if missing {
                filled.insert(field.clone(), *median);
            }
        }
        filled
    }

    /// Impute, transform and align every record of the corpus
    pub fn training_rows(
        &self,
        schema: &Schema,
        records: &[RawRecord],
    ) -> Result<Vec<TrainingRow>, PipelineError> {
        let columns = self.output_columns(schema)?;
        let transform = self.transform(schema);

        records
            .iter()
            .map(|record| {
                let filled = self.impute(record);
                let (mut produced, _) = transform.columns(&filled)?;
                for field in &self.training_only {
                    let row = self.encoder.encode(field, record.label(field)?)?;
                    for (column, value) in row.columns {
                        produced.insert_unique(column, value)?;
                    }
                }
                Ok(TrainingRow {
                    features: FeatureAligner::align(&produced, &columns),
                    target: target_of(record)?,
                })
            })
            .collect()
    }
}

fn target_of(record: &RawRecord) -> Result<Option<u8>, PipelineError> {
    match record.get(DEPRESSION) {
        None => Ok(None),
        Some(RawValue::Number(n)) if *n == 0.0 => Ok(Some(0)),
        Some(RawValue::Number(n)) if *n == 1.0 => Ok(Some(1)),
        Some(other) => Err(PipelineError::InvalidValue {
            field: DEPRESSION.to_string(),
            expected: "0 or 1",
            found: other.describe(),
        }),
    }
}

/// Fitter for the encoder and scaler artifacts
pub struct TrainingFitter;

impl TrainingFitter {
    /// Fit vocabularies and ranges for every nominal and numeric schema field.
    ///
    /// Vocabularies are the distinct labels seen, sorted. Ranges are the observed
    /// min and max; absent values are ignored for the range and later imputed
    /// with the median. Ordinal fields use their constant tables and are not fitted.
    pub fn fit(schema: &Schema, records: &[RawRecord]) -> Result<FittedArtifacts, PipelineError> {
        Self::fit_with_training_only(schema, records, &[])
    }

    /// Fit as [`TrainingFitter::fit`], also learning vocabularies for nominal
    /// fields the corpus carries but the serving schema does not declare.
    ///
    /// Their columns appear in training rows; at serve time the aligner
    /// zero-fills them.
    pub fn fit_with_training_only(
        schema: &Schema,
        records: &[RawRecord],
        training_only: &[String],
    ) -> Result<FittedArtifacts, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        for field in training_only {
            if schema.kind_of(field).is_some() {
                return Err(PipelineError::VocabularyMismatch(format!(
                    "training-only field {field} is declared by the schema"
                )));
            }
        }

        let nominal = schema
            .fields_of(FieldKind::Nominal)
            .chain(training_only.iter().map(String::as_str));

        let mut vocabularies = Vec::new();
        for field in nominal {
            let mut categories = BTreeSet::new();
            for record in records {
                categories.insert(record.label(field)?.to_string());
            }
            vocabularies.push(FieldVocabulary::new(field, categories.into_iter().collect()));
        }

        let mut ranges = Vec::new();
        let mut medians = BTreeMap::new();
        for field in schema.fields_of(FieldKind::Numeric) {
            let mut observed = Vec::with_capacity(records.len());
            for record in records {
                match record.get(field) {
                    Some(RawValue::Number(n)) if n.is_finite() => observed.push(*n),
                    Some(RawValue::Number(_)) | None => {}
                    Some(other) => {
                        return Err(PipelineError::InvalidValue {
                            field: field.to_string(),
                            expected: "number",
                            found: other.describe(),
                        })
                    }
                }
            }
            if observed.is_empty() {
                return Err(PipelineError::MissingField {
                    field: field.to_string(),
                });
            }

            observed.sort_by(f64::total_cmp);
            let min = observed[0];
            let max = observed[observed.len() - 1];
            if max == min {
                return Err(PipelineError::DegenerateRange {
                    field: field.to_string(),
                    value: min,
                });
            }

            ranges.push(FeatureRange::new(field, min, max));
            medians.insert(field.to_string(), median_of_sorted(&observed));
        }

        let fitted_at = Utc::now();
        let encoder = CategoricalEncoder::new(vocabularies)?.with_fitted_at(fitted_at);
        let scaler = NumericScaler::new(ranges)?.with_fitted_at(fitted_at);

        info!(
            records = records.len(),
            nominal_fields = encoder.vocabularies().len(),
            training_only_fields = training_only.len(),
            numeric_fields = scaler.ranges().len(),
            "fitted transform artifacts"
        );

        Ok(FittedArtifacts {
            encoder,
            scaler,
            medians,
            training_only: training_only.to_vec(),
        })
    }
}

fn median_of_sorted(values: &[f64]) -> f64 {
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
