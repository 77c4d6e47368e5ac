//! Reading raw survey records
//!
//! Records arrive either as a JSON array or as NDJSON (one record per line).

use crate::error::PipelineError;
use crate::schema::Schema;
use crate::types::RawRecord;

/// Adapter for parsing and pre-checking raw records
pub struct RecordAdapter;

impl RecordAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<RawRecord>, PipelineError> {
        let records: Vec<RawRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawRecord>, PipelineError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(PipelineError::Parse(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Validate every record against the schema, returning only the failures
    pub fn validate_records(schema: &Schema, records: &[RawRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                schema
                    .validate_record(record)
                    .err()
                    .map(|error| ValidationResult { index: idx, error })
            })
            .collect()
    }
}

/// A record that failed validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub error: PipelineError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CGPA;

    const RECORD: &str = r#"{"Age":25,"Academic Pressure":3,"Work Pressure":2,"CGPA":8.5,"Study Satisfaction":4,"Job Satisfaction":3,"Work/Study Hours":6,"Financial Stress":2,"Sleep Duration":"7-8 hours","Dietary Habits":"Healthy","Gender":"Male","Have you ever had suicidal thoughts ?":"No","Family History of Mental Illness":"No","Degree":"BSc"}"#;
    const MISSING_CGPA: &str = r#"{"Age":25,"Academic Pressure":3,"Work Pressure":2,"Study Satisfaction":4,"Job Satisfaction":3,"Work/Study Hours":6,"Financial Stress":2,"Sleep Duration":"7-8 hours","Dietary Habits":"Healthy","Gender":"Male","Have you ever had suicidal thoughts ?":"No","Family History of Mental Illness":"No","Degree":"BSc"}"#;

    #[test]
    fn test_parse_ndjson() {
        let ndjson = format!("{RECORD}\n\n{MISSING_CGPA}\n");
        let records = RecordAdapter::parse_ndjson(&ndjson).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), 14);
        assert_eq!(records[1].len(), 13);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = format!("{RECORD}\nnot json\n");
        let err = RecordAdapter::parse_ndjson(&ndjson).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_null_value_is_absent_field() {
        let null_cgpa = RECORD.replace(r#""CGPA":8.5"#, r#""CGPA":null"#);
        let ndjson = format!("{RECORD}\n{null_cgpa}\n");

        let records = RecordAdapter::parse_ndjson(&ndjson).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[1].contains(CGPA));

        let results = RecordAdapter::validate_records(&Schema::student_survey(), &records);
        assert_eq!(results.len(), 1);
        assert!(matches!(
            &results[0].error,
            PipelineError::MissingField { field } if field == CGPA
        ));
    }

    #[test]
    fn test_parse_array() {
        let json = format!("[{RECORD},{RECORD}]");
        assert_eq!(RecordAdapter::parse_array(&json).unwrap().len(), 2);
    }

    #[test]
    fn test_validate_records() {
        let records = RecordAdapter::parse_array(&format!("[{RECORD},{MISSING_CGPA}]")).unwrap();
        let results = RecordAdapter::validate_records(&Schema::student_survey(), &records);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].index, 1);
        assert_eq!(results[0].error.field(), Some(CGPA));
    }
}
