//! Loaded artifact context
//!
//! Everything inference needs is loaded once into an [`ArtifactContext`] and is
//! read-only from then on. Construction is the only way into the loaded state,
//! so a context that exists has passed every cross-artifact check. It is
//! `Send + Sync` and can be shared by reference across any number of workers.

use crate::config::{ArtifactConfig, ArtifactPaths};
use crate::encoder::CategoricalEncoder;
use crate::error::PipelineError;
use crate::model::{Classifier, ModelArtifact};
use crate::ordinal::OrdinalMapper;
use crate::report::ConversionReport;
use crate::scaler::NumericScaler;
use crate::schema::{FieldKind, Schema};
use std::collections::HashSet;
use tracing::{info, warn};

/// Immutable set of fitted artifacts for one model
pub struct ArtifactContext {
    schema: Schema,
    encoder: CategoricalEncoder,
    scaler: NumericScaler,
    model: Box<dyn Classifier>,
}

impl std::fmt::Debug for ArtifactContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactContext")
            .field("schema", &self.schema)
            .field("encoder", &self.encoder)
            .field("scaler", &self.scaler)
            .field("model_columns", &self.model.expected_columns().len())
            .finish()
    }
}

impl ArtifactContext {
    /// Assemble a context, checking that the artifacts agree with the schema.
    ///
    /// The schema's expected columns are taken from the model.
    pub fn new(
        schema: Schema,
        encoder: CategoricalEncoder,
        scaler: NumericScaler,
        model: Box<dyn Classifier>,
    ) -> Result<Self, PipelineError> {
        let schema = schema.with_expected_columns(model.expected_columns().to_vec())?;

        for field in schema.fields_of(FieldKind::Ordinal) {
            if !OrdinalMapper::handles(field) {
                return Err(PipelineError::VocabularyMismatch(format!(
                    "no ordinal table for field {field}"
                )));
            }
        }
        for field in schema.fields_of(FieldKind::Nominal) {
            if encoder.vocabulary(field).is_none() {
                return Err(PipelineError::VocabularyMismatch(format!(
                    "encoder has no vocabulary for nominal field {field}"
                )));
            }
        }
        for field in schema.fields_of(FieldKind::Numeric) {
            if scaler.range(field).is_none() {
                return Err(PipelineError::VocabularyMismatch(format!(
                    "scaler has no range for numeric field {field}"
                )));
            }
        }

        for field in encoder.fields() {
            if schema.kind_of(field) != Some(FieldKind::Nominal) {
                warn!(field, "encoder vocabulary for undeclared field is ignored");
            }
        }
        for range in scaler.ranges() {
            if schema.kind_of(&range.field) != Some(FieldKind::Numeric) {
                warn!(field = %range.field, "scaler range for undeclared field is ignored");
            }
        }

        let context = Self {
            schema,
            encoder,
            scaler,
            model,
        };

        let produced = context.produced_columns()?;
        let produced_set: HashSet<&str> = produced.iter().map(String::as_str).collect();
        let unreachable = context
            .schema
            .expected_columns()
            .iter()
            .filter(|c| !produced_set.contains(c.as_str()))
            .count();

        info!(
            fields = context.schema.fields().len(),
            produced_columns = produced.len(),
            expected_columns = context.schema.expected_columns().len(),
            always_zero_columns = unreachable,
            "artifacts loaded"
        );

        Ok(context)
    }

    /// Load the three artifacts from resolved paths against the student survey schema
    pub fn load(paths: &ArtifactPaths) -> Result<Self, PipelineError> {
        let encoder = CategoricalEncoder::load(&paths.encoder)?;
        let scaler = NumericScaler::load(&paths.scaler)?;
        let model = ModelArtifact::load(&paths.model)?.into_classifier();
        Self::new(Schema::student_survey(), encoder, scaler, model)
    }

    pub fn from_config(config: &ArtifactConfig) -> Result<Self, PipelineError> {
        Self::load(&config.resolve()?)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.encoder
    }

    pub fn scaler(&self) -> &NumericScaler {
        &self.scaler
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn expected_columns(&self) -> &[String] {
        self.schema.expected_columns()
    }

    pub fn conversion_report(&self) -> ConversionReport {
        ConversionReport::build(&self.schema, &self.encoder, &self.scaler)
    }

    /// Every column the transforms can produce, in schema order.
    ///
    /// Fails if two transforms would produce the same column name.
    pub fn produced_columns(&self) -> Result<Vec<String>, PipelineError> {
        let mut columns = Vec::new();
        for field in self.schema.fields() {
            match field.kind {
                FieldKind::Numeric | FieldKind::Ordinal => columns.push(field.name.clone()),
                FieldKind::Nominal => columns.extend(self.encoder.column_names(&field.name)?),
            }
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(PipelineError::ColumnCollision {
                    column: column.clone(),
                });
            }
        }

        Ok(columns)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::encoder::FieldVocabulary;
    use crate::model::LogisticModel;
    use crate::scaler::FeatureRange;
    use crate::schema::*;
    use crate::types::RawRecord;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    pub fn encoder() -> CategoricalEncoder {
        CategoricalEncoder::new(vec![
            FieldVocabulary::new(GENDER, strings(&["Female", "Male"])),
            FieldVocabulary::new(SUICIDAL_THOUGHTS, strings(&["No", "Yes"])),
            FieldVocabulary::new(FAMILY_HISTORY, strings(&["No", "Yes"])),
            FieldVocabulary::new(DEGREE, strings(&["BA", "BSc", "Class 12", "MSc", "PhD"])),
        ])
        .unwrap()
    }

    pub fn scaler() -> NumericScaler {
        NumericScaler::new(vec![
            FeatureRange::new(AGE, 18.0, 59.0),
            FeatureRange::new(ACADEMIC_PRESSURE, 0.0, 5.0),
            FeatureRange::new(WORK_PRESSURE, 0.0, 5.0),
            FeatureRange::new(CGPA, 0.0, 10.0),
            FeatureRange::new(STUDY_SATISFACTION, 0.0, 5.0),
            FeatureRange::new(JOB_SATISFACTION, 0.0, 4.0),
            FeatureRange::new(WORK_STUDY_HOURS, 0.0, 12.0),
            FeatureRange::new(FINANCIAL_STRESS, 1.0, 5.0),
        ])
        .unwrap()
    }

    /// Model columns as a fitted model would list them, including a
    /// training-only `Profession` field the service never receives.
    pub fn model_columns() -> Vec<String> {
        strings(&[
            AGE,
            ACADEMIC_PRESSURE,
            WORK_PRESSURE,
            CGPA,
            STUDY_SATISFACTION,
            JOB_SATISFACTION,
            SLEEP_DURATION,
            DIETARY_HABITS,
            WORK_STUDY_HOURS,
            FINANCIAL_STRESS,
            "Gender_Female",
            "Gender_Male",
            "Profession_Student",
            "Have you ever had suicidal thoughts ?_No",
            "Have you ever had suicidal thoughts ?_Yes",
            "Family History of Mental Illness_No",
            "Family History of Mental Illness_Yes",
            "Degree_BA",
            "Degree_BSc",
            "Degree_Class 12",
            "Degree_MSc",
            "Degree_PhD",
        ])
    }

    pub fn model() -> LogisticModel {
        let columns = model_columns();
        let coefficients = columns
            .iter()
            .map(|c| match c.as_str() {
                ACADEMIC_PRESSURE => 3.0,
                FINANCIAL_STRESS => 2.0,
                "Have you ever had suicidal thoughts ?_Yes" => 2.5,
                STUDY_SATISFACTION => -1.5,
                SLEEP_DURATION => -0.5,
                DIETARY_HABITS => -1.0,
                _ => 0.0,
            })
            .collect();
        LogisticModel::new(columns, coefficients, -2.0).unwrap()
    }

    pub fn context() -> ArtifactContext {
        ArtifactContext::new(
            Schema::student_survey(),
            encoder(),
            scaler(),
            Box::new(model()),
        )
        .unwrap()
    }

    /// The reference record: 25-year-old BSc student, moderate pressure
    pub fn record() -> RawRecord {
        RawRecord::new()
            .with(AGE, 25)
            .with(ACADEMIC_PRESSURE, 3)
            .with(WORK_PRESSURE, 2)
            .with(CGPA, 8.5)
            .with(STUDY_SATISFACTION, 4)
            .with(JOB_SATISFACTION, 3)
            .with(WORK_STUDY_HOURS, 6)
            .with(FINANCIAL_STRESS, 2)
            .with(SLEEP_DURATION, "7-8 hours")
            .with(DIETARY_HABITS, "Healthy")
            .with(GENDER, "Male")
            .with(SUICIDAL_THOUGHTS, "No")
            .with(FAMILY_HISTORY, "No")
            .with(DEGREE, "BSc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::FieldVocabulary;
    use crate::schema::{FieldSpec, DEGREE, SLEEP_DURATION};
    use std::fs;

    #[test]
    fn test_context_takes_columns_from_model() {
        let context = fixtures::context();
        assert_eq!(context.expected_columns(), fixtures::model_columns().as_slice());
        assert_eq!(context.model().expected_columns().len(), 22);
    }

    #[test]
    fn test_produced_columns_in_schema_order() {
        let produced = fixtures::context().produced_columns().unwrap();

        assert_eq!(produced.len(), 10 + 2 + 2 + 2 + 5);
        assert_eq!(produced[6], SLEEP_DURATION);
        assert_eq!(produced.last().map(String::as_str), Some("Degree_PhD"));
    }

    #[test]
    fn test_missing_vocabulary_is_rejected() {
        let encoder = CategoricalEncoder::new(vec![FieldVocabulary::new(
            DEGREE,
            vec!["BSc".to_string()],
        )])
        .unwrap();

        let result = ArtifactContext::new(
            Schema::student_survey(),
            encoder,
            fixtures::scaler(),
            Box::new(fixtures::model()),
        );
        assert!(matches!(result, Err(PipelineError::VocabularyMismatch(_))));
    }

    #[test]
    fn test_missing_range_is_rejected() {
        let scaler = NumericScaler::new(vec![]).unwrap();
        let result = ArtifactContext::new(
            Schema::student_survey(),
            fixtures::encoder(),
            scaler,
            Box::new(fixtures::model()),
        );
        assert!(matches!(result, Err(PipelineError::VocabularyMismatch(_))));
    }

    #[test]
    fn test_ordinal_field_without_table_is_rejected() {
        let mut fields = Schema::student_survey().fields().to_vec();
        fields.push(FieldSpec::ordinal("Exercise Frequency"));
        let schema = Schema::new(fields, Vec::new()).unwrap();

        let result = ArtifactContext::new(
            schema,
            fixtures::encoder(),
            fixtures::scaler(),
            Box::new(fixtures::model()),
        );
        assert!(matches!(result, Err(PipelineError::VocabularyMismatch(_))));
    }

    #[test]
    fn test_column_collision_is_rejected() {
        // numeric field named like one of Degree's one-hot columns
        let mut fields = Schema::student_survey().fields().to_vec();
        fields.push(FieldSpec::numeric("Degree_BSc"));
        let schema = Schema::new(fields, Vec::new()).unwrap();

        let mut ranges = fixtures::scaler().ranges().to_vec();
        ranges.push(crate::scaler::FeatureRange::new("Degree_BSc", 0.0, 1.0));
        let scaler = NumericScaler::new(ranges).unwrap();

        let result = ArtifactContext::new(
            schema,
            fixtures::encoder(),
            scaler,
            Box::new(fixtures::model()),
        );
        assert!(matches!(
            result,
            Err(PipelineError::ColumnCollision { ref column }) if column == "Degree_BSc"
        ));
    }

    #[test]
    fn test_load_from_config_files() {
        let dir = std::env::temp_dir().join(format!("mood-risk-context-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        fs::write(dir.join("encoder.json"), fixtures::encoder().to_json().unwrap()).unwrap();
        fs::write(dir.join("scaler.json"), fixtures::scaler().to_json().unwrap()).unwrap();
        let model = ModelArtifact::Logistic(fixtures::model());
        fs::write(dir.join("model.json"), serde_json::to_string(&model).unwrap()).unwrap();

        let config = ArtifactConfig::new(
            dir.join("encoder.json"),
            dir.join("scaler.json"),
            dir.join("model.json"),
        );
        let context = ArtifactContext::from_config(&config).unwrap();
        assert_eq!(context.expected_columns().len(), 22);
    }

    #[test]
    fn test_missing_artifact_prevents_loading() {
        let config = ArtifactConfig::new(
            "/nonexistent/encoder.json".into(),
            "/nonexistent/scaler.json".into(),
            "/nonexistent/model.json".into(),
        );
        assert!(matches!(
            ArtifactContext::from_config(&config),
            Err(PipelineError::ArtifactLoad { .. })
        ));
    }
}
