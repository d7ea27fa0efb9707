//! Twin CLI - Command-line interface for Temporal Twin
//!
//! Commands:
//! - analyze: Correlate biometric samples against symptom series
//! - trend: Classify the trend of one neurotransmitter feature
//! - validate: Validate raw sample schema
//! - schema: Print schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use temporal_twin::analysis::trend::DEFAULT_TREND_WINDOW;
use temporal_twin::grid::Resolution;
use temporal_twin::neuro::parse_feature_key;
use temporal_twin::schema::{RawSample, SampleAdapter, SCHEMA_VERSION};
use temporal_twin::sequence::NeurotransmitterSequence;
use temporal_twin::service::{CorrelationService, StaticSymptomProvider};
use temporal_twin::{TwinError, ENGINE_NAME, TWIN_VERSION};
use uuid::Uuid;

/// Twin - Temporal biometric correlation engine for psychiatric digital twins
#[derive(Parser)]
#[command(name = "twin")]
#[command(version = TWIN_VERSION)]
#[command(about = "Analyze biometric time series against symptom severity", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Correlate biometric samples against symptom series
    Analyze {
        /// Biometric samples file (use - for stdin)
        #[arg(short, long)]
        biometric: PathBuf,

        /// Symptom series file (JSON array)
        #[arg(short, long)]
        symptoms: PathBuf,

        /// Patient UUID (random when omitted)
        #[arg(long)]
        patient_id: Option<String>,

        /// Lookback window in days
        #[arg(long, default_value = "30")]
        lookback_days: u32,

        /// Minimum absolute correlation to report
        #[arg(long, default_value = "0.3")]
        threshold: f64,

        /// Input format for the biometric file
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Classify the trend of one neurotransmitter feature
    Trend {
        /// Concentration samples file (use - for stdin); data_type carries the
        /// feature key, e.g. "serotonin_prefrontal_cortex"
        #[arg(short, long)]
        input: PathBuf,

        /// Feature key to analyze
        #[arg(short, long)]
        feature: String,

        /// Moving-average window
        #[arg(long, default_value = "3")]
        window: usize,

        /// Grid resolution
        #[arg(long, default_value = "daily")]
        resolution: CliResolution,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,
    },

    /// Validate raw sample schema
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

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one sample per line)
    Ndjson,
    /// JSON array of samples
    Json,
}

#[derive(Clone, ValueEnum)]
enum CliResolution {
    Hourly,
    Daily,
    Weekly,
}

impl From<CliResolution> for Resolution {
    fn from(r: CliResolution) -> Self {
        match r {
            CliResolution::Hourly => Resolution::Hourly,
            CliResolution::Daily => Resolution::Daily,
            CliResolution::Weekly => Resolution::Weekly,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Biometric input schema (twin.raw_sample.v1)
    Input,
    /// Symptom series schema
    Symptom,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

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

fn run(cli: Cli) -> Result<(), TwinCliError> {
    match cli.command {
        Commands::Analyze {
            biometric,
            symptoms,
            patient_id,
            lookback_days,
            threshold,
            input_format,
            pretty,
        } => cmd_analyze(
            &biometric,
            &symptoms,
            patient_id.as_deref(),
            lookback_days,
            threshold,
            input_format,
            pretty,
        ),

        Commands::Trend {
            input,
            feature,
            window,
            resolution,
            input_format,
        } => cmd_trend(&input, &feature, window, resolution.into(), input_format),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

/// Read a file, or stdin when the path is `-`
fn read_input(path: &Path) -> Result<String, TwinCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(TwinCliError::TtyStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn parse_samples(data: &str, format: InputFormat) -> Result<Vec<RawSample>, TwinCliError> {
    let samples = match format {
        InputFormat::Ndjson => SampleAdapter::parse_ndjson(data)?,
        InputFormat::Json => SampleAdapter::parse_array(data)?,
    };
    if samples.is_empty() {
        return Err(TwinCliError::NoSamples);
    }
    Ok(samples)
}

fn cmd_analyze(
    biometric: &Path,
    symptoms: &Path,
    patient_id: Option<&str>,
    lookback_days: u32,
    threshold: f64,
    input_format: InputFormat,
    pretty: bool,
) -> Result<(), TwinCliError> {
    let patient = match patient_id {
        Some(id) => Uuid::parse_str(id).map_err(|e| TwinCliError::BadPatientId(e.to_string()))?,
        None => Uuid::new_v4(),
    };

    let samples = parse_samples(&read_input(biometric)?, input_format)?;
    let grouped = SampleAdapter::group_by_type(samples)?;

    let symptom_data = read_input(symptoms)?;
    let series = SampleAdapter::parse_symptom_series(&symptom_data)?;

    let service = CorrelationService::new(StaticSymptomProvider::new(series));
    let report = service.analyze_correlations(patient, &grouped, lookback_days, threshold)?;

    if pretty {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}

fn cmd_trend(
    input: &Path,
    feature: &str,
    window: usize,
    resolution: Resolution,
    input_format: InputFormat,
) -> Result<(), TwinCliError> {
    if parse_feature_key(feature).is_none() {
        return Err(TwinCliError::UnknownFeature(feature.to_string()));
    }

    let samples = parse_samples(&read_input(input)?, input_format)?;

    let start = samples
        .iter()
        .map(|s| s.timestamp)
        .min()
        .ok_or(TwinCliError::NoSamples)?;
    let end = samples
        .iter()
        .map(|s| s.timestamp)
        .max()
        .ok_or(TwinCliError::NoSamples)?;

    let mut sequence = NeurotransmitterSequence::new(None, start, end, resolution)?;
    let mut skipped = 0usize;
    for sample in &samples {
        sample.validate()?;
        if !sequence.record_feature(sample.timestamp, &sample.data_type, sample.value) {
            skipped += 1;
        }
    }
    if skipped > 0 {
        eprintln!("skipped {skipped} sample(s) with unknown feature keys or out-of-range timestamps");
    }

    let window = if window == 0 { DEFAULT_TREND_WINDOW } else { window };
    let report = temporal_twin::analysis::trend::analyze_trend(sequence.grid(), feature, window);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), TwinCliError> {
    let data = read_input(input)?;
    let samples = match input_format {
        InputFormat::Ndjson => SampleAdapter::parse_ndjson(&data)?,
        InputFormat::Json => SampleAdapter::parse_array(&data)?,
    };

    let mut errors: Vec<String> = Vec::new();
    for (i, sample) in samples.iter().enumerate() {
        if let Err(e) = sample.validate() {
            errors.push(format!("sample {i}: {e}"));
        }
    }

    let report = ValidationReport {
        schema: SCHEMA_VERSION.to_string(),
        total_samples: samples.len(),
        valid_samples: samples.len() - errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Schema: {}", report.schema);
        println!("Samples: {} total, {} valid", report.total_samples, report.valid_samples);
        for error in &report.errors {
            println!("  {error}");
        }
    }

    if report.valid_samples < report.total_samples {
        return Err(TwinCliError::ValidationFailed(
            report.total_samples - report.valid_samples,
        ));
    }
    Ok(())
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), TwinCliError> {
    let example = match schema_type {
        SchemaType::Input => serde_json::json!({
            "schema": SCHEMA_VERSION,
            "producer": ENGINE_NAME,
            "example": {
                "timestamp": "2024-01-15T08:00:00Z",
                "value": 62.0,
                "data_type": "heart_rate",
                "source": "wearable",
                "confidence": 0.95,
                "metadata": {}
            }
        }),
        SchemaType::Symptom => serde_json::json!({
            "producer": ENGINE_NAME,
            "example": {
                "symptom_type": "anxiety",
                "observations": [
                    { "date": "2024-01-15T00:00:00Z", "severity": 0.6 }
                ]
            }
        }),
    };
    println!("{}", serde_json::to_string_pretty(&example)?);
    Ok(())
}

#[derive(serde::Serialize)]
struct ValidationReport {
    schema: String,
    total_samples: usize,
    valid_samples: usize,
    errors: Vec<String>,
}

// Error types

#[derive(Debug)]
enum TwinCliError {
    Io(io::Error),
    Engine(TwinError),
    Json(serde_json::Error),
    NoSamples,
    UnknownFeature(String),
    BadPatientId(String),
    ValidationFailed(usize),
    TtyStdin,
}

impl From<io::Error> for TwinCliError {
    fn from(e: io::Error) -> Self {
        TwinCliError::Io(e)
    }
}

impl From<TwinError> for TwinCliError {
    fn from(e: TwinError) -> Self {
        TwinCliError::Engine(e)
    }
}

impl From<serde_json::Error> for TwinCliError {
    fn from(e: serde_json::Error) -> Self {
        TwinCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TwinCliError> for CliError {
    fn from(e: TwinCliError) -> Self {
        match e {
            TwinCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TwinCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            TwinCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            TwinCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "Input contained no samples".to_string(),
                hint: Some("Provide at least one sample".to_string()),
            },
            TwinCliError::UnknownFeature(feature) => CliError {
                code: "UNKNOWN_FEATURE".to_string(),
                message: format!("Unknown feature key: {feature}"),
                hint: Some(
                    "Use \"{neurotransmitter}_{brain_region}\", e.g. serotonin_prefrontal_cortex"
                        .to_string(),
                ),
            },
            TwinCliError::BadPatientId(e) => CliError {
                code: "BAD_PATIENT_ID".to_string(),
                message: e,
                hint: Some("Provide a UUID".to_string()),
            },
            TwinCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{count} sample(s) failed validation"),
                hint: None,
            },
            TwinCliError::TtyStdin => CliError {
                code: "TTY_STDIN".to_string(),
                message: "stdin is a TTY".to_string(),
                hint: Some("Pipe NDJSON input when using -".to_string()),
            },
        }
    }
}
