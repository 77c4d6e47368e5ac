//! moodrisk - Command-line interface for Mood Risk
//!
//! Commands:
//! - predict: Score raw survey records against fitted artifacts
//! - validate: Check raw records against the input schema
//! - fit: Fit encoder and scaler artifacts from a training corpus
//! - describe: Print how each raw field is converted into model columns
//! - doctor: Diagnose artifact health and configuration
//! - schema: Print the input schema

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mood_risk::encoder::CategoricalEncoder;
use mood_risk::model::ModelArtifact;
use mood_risk::ordinal::OrdinalMapper;
use mood_risk::scaler::NumericScaler;
use mood_risk::schema::FieldKind;
use mood_risk::{
    ArtifactConfig, ArtifactContext, InferencePipeline, PipelineError, PredictionResult,
    RawRecord, RecordAdapter, Schema, TrainingFitter, MOOD_RISK_VERSION, PRODUCER_NAME,
    SCHEMA_VERSION,
};

/// moodrisk - Depression-risk screening with train/serve-consistent features
#[derive(Parser)]
#[command(name = "moodrisk")]
#[command(version = MOOD_RISK_VERSION)]
#[command(about = "Score student survey records against a fitted model", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score records (one response per record)
    Predict {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        artifacts: ArtifactArgs,
    },

    /// Validate raw records against the input schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fit encoder and scaler artifacts from a training corpus
    Fit {
        /// Corpus file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Directory receiving encoder.json, scaler.json and columns.json
        #[arg(long)]
        out_dir: PathBuf,

        /// Also write the transformed corpus to training_rows.ndjson
        #[arg(long)]
        rows: bool,

        /// Nominal field to encode for training only (repeatable)
        #[arg(long = "training-only", value_name = "FIELD")]
        training_only: Vec<String>,
    },

    /// Describe how each raw field is converted into model columns
    Describe {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose artifact health and configuration
    Doctor {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the input schema
    Schema {
        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Args)]
struct ArtifactArgs {
    /// JSON file listing artifact paths
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fitted categorical encoder (overrides config)
    #[arg(long)]
    encoder: Option<PathBuf>,

    /// Fitted numeric scaler (overrides config)
    #[arg(long)]
    scaler: Option<PathBuf>,

    /// Fitted model (overrides config)
    #[arg(long)]
    model: Option<PathBuf>,
}

impl ArtifactArgs {
    fn to_config(&self) -> Result<ArtifactConfig, CliFailure> {
        let base = match &self.config {
            Some(path) => ArtifactConfig::from_file(path)?,
            None => ArtifactConfig::default(),
        };
        Ok(base.merge(ArtifactConfig {
            encoder: self.encoder.clone(),
            scaler: self.scaler.clone(),
            model: self.model.clone(),
        }))
    }
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one response per line)
    Ndjson,
    /// JSON array of responses
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_thread_names(true)
                    .json(),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Predict {
            input,
            output,
            input_format,
            output_format,
            artifacts,
        } => cmd_predict(&input, &output, input_format, output_format, &artifacts),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Fit {
            input,
            input_format,
            out_dir,
            rows,
            training_only,
        } => cmd_fit(&input, input_format, &out_dir, rows, &training_only),

        Commands::Describe { artifacts, json } => cmd_describe(&artifacts, json),

        Commands::Doctor { artifacts, json } => cmd_doctor(&artifacts, json),

        Commands::Schema { json_schema } => cmd_schema(json_schema),
    }
}

fn cmd_predict(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    artifacts: &ArtifactArgs,
) -> Result<(), CliFailure> {
    // Artifacts first: nothing is served unless every one of them loads
    let context = ArtifactContext::from_config(&artifacts.to_config()?)?;
    let records = read_records(input, input_format)?;

    let results = InferencePipeline::new(&context).predict_batch(&records);

    let mut failed = 0;
    let lines: Vec<ResponseLine> = results
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(outcome) => ResponseLine::Prediction(outcome.result),
            Err(e) => {
                failed += 1;
                ResponseLine::Failure {
                    error: RecordError::new(index, &e),
                }
            }
        })
        .collect();

    info!(records = lines.len(), failed, "prediction run complete");

    write_output(output, &format_output(&lines, &output_format)?)?;

    if failed > 0 {
        Err(CliFailure::RecordsFailed(failed))
    } else {
        Ok(())
    }
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), CliFailure> {
    let records = read_records(input, input_format)?;
    let results = RecordAdapter::validate_records(&Schema::student_survey(), &records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| RecordError::new(r.index, &r.error))
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Record {}: {}", err.index, err.message);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(CliFailure::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_fit(
    input: &Path,
    input_format: InputFormat,
    out_dir: &Path,
    rows: bool,
    training_only: &[String],
) -> Result<(), CliFailure> {
    let records = read_records(input, input_format)?;
    let schema = Schema::student_survey();
    let fitted = TrainingFitter::fit_with_training_only(&schema, &records, training_only)?;
    let columns = fitted.output_columns(&schema)?;

    fs::create_dir_all(out_dir)?;
    fs::write(out_dir.join("encoder.json"), fitted.encoder.to_json()?)?;
    fs::write(out_dir.join("scaler.json"), fitted.scaler.to_json()?)?;
    fs::write(
        out_dir.join("columns.json"),
        serde_json::to_string_pretty(&columns)?,
    )?;

    if rows {
        let training_rows = fitted.training_rows(&schema, &records)?;
        let mut lines = Vec::with_capacity(training_rows.len());
        for row in &training_rows {
            lines.push(serde_json::to_string(row)?);
        }
        fs::write(
            out_dir.join("training_rows.ndjson"),
            lines.join("\n") + "\n",
        )?;
    }

    info!(
        out_dir = %out_dir.display(),
        columns = columns.len(),
        "wrote fitted artifacts"
    );
    Ok(())
}

fn cmd_describe(artifacts: &ArtifactArgs, json: bool) -> Result<(), CliFailure> {
    let context = ArtifactContext::from_config(&artifacts.to_config()?)?;
    let report = context.conversion_report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

fn cmd_doctor(artifacts: &ArtifactArgs, json: bool) -> Result<(), CliFailure> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck::ok(
        "version",
        format!("{PRODUCER_NAME} version {MOOD_RISK_VERSION}"),
    ));
    checks.push(DoctorCheck::ok(
        "schema_version",
        format!("Input schema: {SCHEMA_VERSION}"),
    ));

    match artifacts
        .to_config()
        .and_then(|c| c.resolve().map_err(CliFailure::from))
    {
        Ok(paths) => {
            let encoder = CategoricalEncoder::load(&paths.encoder)
                .map(|e| format!("{} vocabularies", e.vocabularies().len()));
            let scaler = NumericScaler::load(&paths.scaler)
                .map(|s| format!("{} numeric ranges", s.ranges().len()));
            let model =
                ModelArtifact::load(&paths.model).map(|_| "model artifact parsed".to_string());

            checks.push(artifact_check("encoder", encoder));
            checks.push(artifact_check("scaler", scaler));
            checks.push(artifact_check("model", model));

            match ArtifactContext::load(&paths) {
                Ok(context) => {
                    let produced = context.produced_columns()?;
                    let always_zero = context
                        .expected_columns()
                        .iter()
                        .filter(|c| !produced.contains(c))
                        .count();
                    checks.push(DoctorCheck::ok(
                        "context",
                        format!(
                            "{} model columns, {} produced by transforms",
                            context.expected_columns().len(),
                            produced.len()
                        ),
                    ));
                    if always_zero > 0 {
                        checks.push(DoctorCheck {
                            name: "alignment".to_string(),
                            status: CheckStatus::Warning,
                            message: format!(
                                "{always_zero} model columns are never produced and always zero-filled"
                            ),
                        });
                    }
                }
                Err(e) => checks.push(DoctorCheck::error("context", e.to_string())),
            }
        }
        Err(e) => checks.push(DoctorCheck::error("artifacts", CliError::from(e).message)),
    }

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (interactive mode)"
    } else {
        "stdin is a pipe (ready for `--input -`)"
    };
    checks.push(DoctorCheck::ok("stdin", stdin_message.to_string()));

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: MOOD_RISK_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("moodrisk Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliFailure::DoctorFailed)
    } else {
        Ok(())
    }
}

fn artifact_check(name: &str, result: Result<String, PipelineError>) -> DoctorCheck {
    match result {
        Ok(message) => DoctorCheck::ok(name, message),
        Err(e) => DoctorCheck::error(name, e.to_string()),
    }
}

fn cmd_schema(json_schema: bool) -> Result<(), CliFailure> {
    let schema = Schema::student_survey();

    if json_schema {
        println!("{}", input_json_schema(&schema));
        return Ok(());
    }

    println!("Input Schema: {SCHEMA_VERSION}");
    println!();
    for field in schema.fields() {
        match field.kind {
            FieldKind::Numeric => println!("- {} (number)", field.name),
            FieldKind::Ordinal => {
                let labels: Vec<&str> = OrdinalMapper::table(&field.name)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(label, _)| label)
                    .collect();
                println!("- {} (one of: {})", field.name, labels.join(", "));
            }
            FieldKind::Nominal => {
                println!("- {} (category from the fitted vocabulary)", field.name)
            }
        }
    }
    println!();
    println!(
        "Output: {{ \"prediction\": 0|1, \"label\": \"Likely Depressed\"|\"Not Likely Depressed\" }}"
    );

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, CliFailure> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading records from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_records(input: &Path, format: InputFormat) -> Result<Vec<RawRecord>, CliFailure> {
    let data = read_input(input)?;
    let records = match format {
        InputFormat::Ndjson => RecordAdapter::parse_ndjson(&data)?,
        InputFormat::Json => RecordAdapter::parse_array(&data)?,
    };
    if records.is_empty() {
        return Err(CliFailure::NoRecords);
    }
    Ok(records)
}

fn write_output(output: &Path, data: &str) -> Result<(), CliFailure> {
    if output.to_string_lossy() == "-" {
        print!("{data}");
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_output<T: Serialize>(items: &[T], format: &OutputFormat) -> Result<String, CliFailure> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for item in items {
                lines.push(serde_json::to_string(item)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(items)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(items)?),
    }
}

fn input_json_schema(schema: &Schema) -> String {
    let properties: serde_json::Map<String, serde_json::Value> = schema
        .fields()
        .iter()
        .map(|field| {
            let property = match field.kind {
                FieldKind::Numeric => serde_json::json!({ "type": "number" }),
                FieldKind::Ordinal => {
                    let labels: Vec<&str> = OrdinalMapper::table(&field.name)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|(label, _)| label)
                        .collect();
                    serde_json::json!({ "type": "string", "enum": labels })
                }
                FieldKind::Nominal => serde_json::json!({ "type": "string" }),
            };
            (field.name.clone(), property)
        })
        .collect();

    let required: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": SCHEMA_VERSION,
        "description": "Raw student survey record",
        "type": "object",
        "required": required,
        "properties": properties
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
    NoRecords,
    RecordsFailed(usize),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<PipelineError> for CliFailure {
    fn from(e: PipelineError) -> Self {
        CliFailure::Pipeline(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Pipeline(e @ PipelineError::ArtifactLoad { .. }) => CliError {
                code: "ARTIFACT_LOAD_FAILED".to_string(),
                message: e.to_string(),
                hint: Some("Pass --config or --encoder/--scaler/--model".to_string()),
            },
            CliFailure::Pipeline(e) if e.is_input_error() => CliError {
                code: "INVALID_INPUT".to_string(),
                message: e.to_string(),
                hint: Some("Run 'moodrisk validate' for details".to_string()),
            },
            CliFailure::Pipeline(e) => CliError {
                code: "PIPELINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'moodrisk doctor' to check the artifacts".to_string()),
            },
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CliFailure::RecordsFailed(count) => CliError {
                code: "RECORDS_FAILED".to_string(),
                message: format!("{count} records could not be scored"),
                hint: Some("See the per-record errors in the output".to_string()),
            },
            CliFailure::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{count} records failed validation"),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            CliFailure::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
#[serde(untagged)]
enum ResponseLine {
    Prediction(PredictionResult),
    Failure { error: RecordError },
}

/// Per-record failure. Input errors name the field; internal errors stay generic.
#[derive(Serialize)]
struct RecordError {
    index: usize,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    message: String,
}

impl RecordError {
    fn new(index: usize, e: &PipelineError) -> Self {
        if e.is_input_error() {
            RecordError {
                index,
                code: "INVALID_INPUT",
                field: e.field().map(str::to_string),
                message: e.to_string(),
            }
        } else {
            error!(index, error = %e, "internal error while scoring record");
            RecordError {
                index,
                code: "INTERNAL_ERROR",
                field: None,
                message: "Internal error".to_string(),
            }
        }
    }
}

#[derive(Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<RecordError>,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

impl DoctorCheck {
    fn ok(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message,
        }
    }

    fn error(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message,
        }
    }
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
