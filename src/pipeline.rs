//! Pipeline orchestration
//!
//! This module provides the public inference API. It runs one raw record through
//! the full pipeline: field validation → ordinal mapping, one-hot encoding and
//! min-max scaling → column merge → alignment → model → label.
//!
//! The pipeline holds nothing but a borrowed [`ArtifactContext`], so every call
//! is independent and any number of calls may run concurrently.

use crate::aligner::{AlignmentReport, FeatureAligner};
use crate::context::ArtifactContext;
use crate::encoder::CategoricalEncoder;
use crate::error::PipelineError;
use crate::ordinal::OrdinalMapper;
use crate::scaler::NumericScaler;
use crate::schema::{FieldKind, Schema};
use crate::types::{
    DepressionLabel, FeatureVector, PredictionResult, RawRecord, RawValue, TransformWarning,
    TransformedColumns,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info_span};
use uuid::Uuid;

/// A record transformed into model-ready features
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedRecord {
    pub features: FeatureVector,
    pub warnings: Vec<TransformWarning>,
    pub alignment: AlignmentReport,
}

/// Prediction plus the recoverable conditions met on the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionOutcome {
    #[serde(flatten)]
    pub result: PredictionResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TransformWarning>,
}

/// Record-level transforms, shared by serving and the offline fitter
#[derive(Debug, Clone, Copy)]
pub struct FeatureTransform<'a> {
    schema: &'a Schema,
    encoder: &'a CategoricalEncoder,
    scaler: &'a NumericScaler,
}

impl<'a> FeatureTransform<'a> {
    pub fn new(
        schema: &'a Schema,
        encoder: &'a CategoricalEncoder,
        scaler: &'a NumericScaler,
    ) -> Self {
        Self {
            schema,
            encoder,
            scaler,
        }
    }

    /// Validate a record and produce its named columns
    pub fn columns(
        &self,
        raw: &RawRecord,
    ) -> Result<(TransformedColumns, Vec<TransformWarning>), PipelineError> {
        // Stage 1: Every declared field must be present before any transform runs
        self.schema.require_fields(raw)?;

        let mut columns = TransformedColumns::new();
        let mut warnings = Vec::new();

        // Stages 2-5: Column-disjoint transforms, merged with a collision check
        for field in self.schema.fields() {
            let name = field.name.as_str();
            match field.kind {
                FieldKind::Ordinal => {
                    let value = OrdinalMapper::map(name, raw.label(name)?)?;
                    columns.insert_unique(field.name.clone(), value)?;
                }
                FieldKind::Nominal => {
                    let row = self.encoder.encode(name, raw.label(name)?)?;
                    for (column, value) in row.columns {
                        columns.insert_unique(column, value)?;
                    }
                    warnings.extend(row.warning);
                }
                FieldKind::Numeric => {
                    let number = raw.number(name)?;
                    // Only finite values reach the scaler
                    if !number.is_finite() {
                        return Err(PipelineError::InvalidValue {
                            field: field.name.clone(),
                            expected: "finite number",
                            found: RawValue::Number(number).describe(),
                        });
                    }
                    let value = self.scaler.scale(name, number)?;
                    columns.insert_unique(field.name.clone(), value)?;
                }
            }
        }

        Ok((columns, warnings))
    }
}

impl<'a> From<&'a ArtifactContext> for FeatureTransform<'a> {
    fn from(context: &'a ArtifactContext) -> Self {
        Self::new(context.schema(), context.encoder(), context.scaler())
    }
}

/// Stateless inference over a loaded artifact context
#[derive(Debug, Clone, Copy)]
pub struct InferencePipeline<'a> {
    context: &'a ArtifactContext,
}

impl<'a> InferencePipeline<'a> {
    pub fn new(context: &'a ArtifactContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &'a ArtifactContext {
        self.context
    }

    /// Validate and transform a record into named columns, before alignment
    pub fn transform_columns(
        &self,
        raw: &RawRecord,
    ) -> Result<(TransformedColumns, Vec<TransformWarning>), PipelineError> {
        FeatureTransform::from(self.context).columns(raw)
    }

    /// Transform a record into the feature vector the model expects
    pub fn transform(&self, raw: &RawRecord) -> Result<TransformedRecord, PipelineError> {
        let (columns, warnings) = self.transform_columns(raw)?;

        // Stage 6: Align to the model's column order
        let (features, alignment) =
            FeatureAligner::align_with_report(&columns, self.context.expected_columns());

        Ok(TransformedRecord {
            features,
            warnings,
            alignment,
        })
    }

    /// Run the full pipeline on one record
    pub fn predict(&self, raw: &RawRecord) -> Result<PredictionOutcome, PipelineError> {
        let transformed = self.transform(raw)?;

        // Stage 7: Model
        let class = self.context.model().predict(&transformed.features)?;

        // Stage 8: Binary label
        let label = DepressionLabel::from_class(class)?;
        debug!(class, %label, "prediction complete");

        Ok(PredictionOutcome {
            result: PredictionResult::from(label),
            warnings: transformed.warnings,
        })
    }

    /// Predict many records on the rayon pool, one result per record in input order
    pub fn predict_batch(
        &self,
        records: &[RawRecord],
    ) -> Vec<Result<PredictionOutcome, PipelineError>> {
        records
            .par_iter()
            .enumerate()
            .map(|(index, raw)| {
                let request_id = Uuid::new_v4();
                let span = info_span!("record", index, %request_id);
                let _guard = span.enter();
                self.predict(raw)
            })
            .collect()
    }
}

/// Run one record through the pipeline and return only the response body
pub fn predict(
    context: &ArtifactContext,
    raw: &RawRecord,
) -> Result<PredictionResult, PipelineError> {
    InferencePipeline::new(context)
        .predict(raw)
        .map(|outcome| outcome.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures;
    use crate::model::Classifier;
    use crate::schema::*;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Log sink shared between a test and its subscriber
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Model returning a fixed class and counting its invocations
    struct FixedModel {
        columns: Vec<String>,
        class: usize,
        calls: Arc<AtomicUsize>,
    }

    impl FixedModel {
        fn new(class: usize) -> Self {
            Self {
                columns: fixtures::model_columns(),
                class,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Classifier for FixedModel {
        fn expected_columns(&self) -> &[String] {
            &self.columns
        }

        fn predict(&self, _features: &FeatureVector) -> Result<usize, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.class)
        }
    }

    fn context_with(model: FixedModel) -> ArtifactContext {
        ArtifactContext::new(
            Schema::student_survey(),
            fixtures::encoder(),
            fixtures::scaler(),
            Box::new(model),
        )
        .unwrap()
    }

    fn high_risk_record() -> RawRecord {
        fixtures::record()
            .with(ACADEMIC_PRESSURE, 5)
            .with(FINANCIAL_STRESS, 5)
            .with(STUDY_SATISFACTION, 1)
            .with(SUICIDAL_THOUGHTS, "Yes")
            .with(SLEEP_DURATION, "Less than 5 hours")
            .with(DIETARY_HABITS, "Unhealthy")
    }

    #[test]
    fn test_reference_record_features() {
        let context = fixtures::context();
        let columns = context.expected_columns();
        let transformed = InferencePipeline::new(&context)
            .transform(&fixtures::record())
            .unwrap();
        let features = &transformed.features;

        assert_eq!(features.len(), columns.len());
        assert_eq!(features.value_of(columns, SLEEP_DURATION), Some(0.66));
        assert_eq!(features.value_of(columns, DIETARY_HABITS), Some(1.0));
        assert_eq!(features.value_of(columns, CGPA), Some(0.85));
        assert_eq!(features.value_of(columns, "Gender_Male"), Some(1.0));
        assert_eq!(features.value_of(columns, "Gender_Female"), Some(0.0));
        assert_eq!(features.value_of(columns, "Degree_BSc"), Some(1.0));
        assert_eq!(features.value_of(columns, "Profession_Student"), Some(0.0));
        assert!(transformed.warnings.is_empty());
        assert_eq!(
            transformed.alignment.zero_filled,
            vec!["Profession_Student".to_string()]
        );
    }

    #[test]
    fn test_reference_record_prediction() {
        let context = fixtures::context();
        let result = predict(&context, &fixtures::record()).unwrap();

        assert_eq!(result.prediction, 0);
        assert_eq!(result.label, DepressionLabel::NotLikelyDepressed);
    }

    #[test]
    fn test_high_risk_record_prediction() {
        let context = fixtures::context();
        let result = predict(&context, &high_risk_record()).unwrap();

        assert_eq!(result.prediction, 1);
        assert_eq!(result.label, DepressionLabel::LikelyDepressed);
    }

    #[test]
    fn test_unknown_degree_zero_fills_and_still_predicts() {
        let context = fixtures::context();
        let columns = context.expected_columns();
        let record = fixtures::record().with(DEGREE, "Underwater Basket Weaving");
        let pipeline = InferencePipeline::new(&context);

        let transformed = pipeline.transform(&record).unwrap();
        for column in columns.iter().filter(|c| c.starts_with("Degree_")) {
            assert_eq!(transformed.features.value_of(columns, column), Some(0.0));
        }

        let outcome = pipeline.predict(&record).unwrap();
        assert_eq!(
            outcome.warnings,
            vec![TransformWarning::UnknownCategory {
                field: DEGREE.to_string(),
                label: "Underwater Basket Weaving".to_string(),
            }]
        );
    }

    #[test]
    fn test_missing_cgpa_never_reaches_model() {
        let model = FixedModel::new(1);
        let calls = Arc::clone(&model.calls);
        let context = context_with(model);
        let pipeline = InferencePipeline::new(&context);
        let mut record = fixtures::record();
        record.remove(CGPA);

        let err = pipeline.predict(&record).unwrap_err();
        assert!(matches!(err, PipelineError::MissingField { ref field } if field == CGPA));
        assert!(err.is_input_error());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        pipeline.predict(&fixtures::record()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_degree_is_logged() {
        let context = fixtures::context();
        let record = fixtures::record().with(DEGREE, "Underwater Basket Weaving");
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, || predict(&context, &record));

        assert!(result.is_ok());
        let text = logs.text();
        assert!(text.contains("WARN"));
        assert!(text.contains("unknown category"));
        assert!(text.contains("Underwater Basket Weaving"));
    }

    #[test]
    fn test_known_degree_logs_no_warning() {
        let context = fixtures::context();
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            predict(&context, &fixtures::record()).unwrap()
        });

        assert!(!logs.text().contains("WARN"));
    }

    #[test]
    fn test_non_finite_numeric_never_reaches_model() {
        let model = FixedModel::new(0);
        let calls = Arc::clone(&model.calls);
        let context = context_with(model);
        let pipeline = InferencePipeline::new(&context);

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = pipeline
                .predict(&fixtures::record().with(CGPA, value))
                .unwrap_err();
            assert!(matches!(
                err,
                PipelineError::InvalidValue { ref field, expected: "finite number", .. }
                    if field == CGPA
            ));
            assert!(err.is_input_error());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_null_field_fails_only_its_record() {
        let context = fixtures::context();
        let good = serde_json::to_string(&fixtures::record()).unwrap();
        let null_cgpa = serde_json::to_string(&fixtures::record())
            .unwrap()
            .replace(r#""CGPA":8.5"#, r#""CGPA":null"#);
        let records =
            RecordAdapter::parse_ndjson(&format!("{good}\n{null_cgpa}\n{good}\n")).unwrap();

        let results = InferencePipeline::new(&context).predict_batch(&records);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(PipelineError::MissingField { ref field }) if field == CGPA
        ));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_unknown_ordinal_label_rejected() {
        let context = fixtures::context();
        let record = fixtures::record().with(SLEEP_DURATION, "About 6 hours");

        let err = predict(&context, &record).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownOrdinalLabel { ref field, .. } if field == SLEEP_DURATION
        ));
    }

    #[test]
    fn test_non_binary_model_is_unsupported() {
        let context = context_with(FixedModel::new(2));
        let err = predict(&context, &fixtures::record()).unwrap_err();

        assert!(matches!(err, PipelineError::UnsupportedClass(2)));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_determinism() {
        let context = fixtures::context();
        let pipeline = InferencePipeline::new(&context);
        let record = fixtures::record().with(DEGREE, "Underwater Basket Weaving");

        let first = pipeline.transform(&record).unwrap();
        let second = pipeline.transform(&record).unwrap();
        assert_eq!(first, second);

        assert_eq!(
            pipeline.predict(&record).unwrap(),
            pipeline.predict(&record).unwrap()
        );
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let context = fixtures::context();
        let record = fixtures::record()
            .with("City", "Pune")
            .with("Profession", "Student");

        let with_extra = InferencePipeline::new(&context).transform(&record).unwrap();
        let plain = InferencePipeline::new(&context)
            .transform(&fixtures::record())
            .unwrap();
        assert_eq!(with_extra.features, plain.features);
    }

    #[test]
    fn test_batch_preserves_order_and_isolates_errors() {
        let context = fixtures::context();
        let mut missing = fixtures::record();
        missing.remove(AGE);
        let records = vec![fixtures::record(), missing, high_risk_record()];

        let results = InferencePipeline::new(&context).predict_batch(&records);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().result.prediction, 0);
        assert!(matches!(
            results[1],
            Err(PipelineError::MissingField { ref field }) if field == AGE
        ));
        assert_eq!(results[2].as_ref().unwrap().result.prediction, 1);
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let context = fixtures::context();
        let record = fixtures::record().with(DEGREE, "Underwater Basket Weaving");
        let outcome = InferencePipeline::new(&context).predict(&record).unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["prediction"], 0);
        assert_eq!(json["label"], "Not Likely Depressed");
        assert_eq!(json["warnings"][0]["kind"], "unknown_category");
    }
}
