//! met-intensity CLI - Command-line interface for MET intensity summaries
//!
//! Commands:
//! - summarize: Process every subject file in a directory (batch mode)
//! - inspect: Load a single subject file and report row cleaning
//! - schema: Describe the input and output column contracts

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use met_intensity::batch::{discover_subject_files, BatchConfig, BatchRunner};
use met_intensity::export::{ExportFormat, SummaryExporter};
use met_intensity::loader::LoadReport;
use met_intensity::pipeline::{subject_id_from_path, SubjectProcessor};
use met_intensity::types::SubjectSummary;
use met_intensity::{LastSamplePolicy, PRODUCER_NAME, VERSION};

/// met-intensity - Activity intensity durations from MET recordings
#[derive(Parser)]
#[command(name = "met-intensity")]
#[command(author = "Synheart AI Inc")]
#[command(version = VERSION)]
#[command(about = "Summarize time spent per activity intensity", long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize every subject file in a directory
    Summarize {
        /// Directory holding one file per subject
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "result.csv")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "csv")]
        format: OutputFormat,

        /// Subject file name prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Subject file extension
        #[arg(long)]
        extension: Option<String>,

        /// How the last sample of each subject is credited
        #[arg(long)]
        last_sample: Option<LastSampleArg>,

        /// Worker threads (1 = sequential)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Load batch configuration from a JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Load one subject file and report how its rows were cleaned
    Inspect {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// How the last sample is credited
        #[arg(long, default_value = "average-interval")]
        last_sample: LastSampleArg,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print column contracts
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Comma-separated rows, one per subject
    Csv,
    /// JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
    /// Newline-delimited JSON rows
    Ndjson,
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => ExportFormat::Csv,
            OutputFormat::Json => ExportFormat::Json,
            OutputFormat::JsonPretty => ExportFormat::JsonPretty,
            OutputFormat::Ndjson => ExportFormat::Ndjson,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LastSampleArg {
    /// Credit the mean sampling interval to the last sample
    AverageInterval,
    /// Give the last sample no credit
    Exclude,
}

impl From<LastSampleArg> for LastSamplePolicy {
    fn from(arg: LastSampleArg) -> Self {
        match arg {
            LastSampleArg::AverageInterval => LastSamplePolicy::AverageInterval,
            LastSampleArg::Exclude => LastSamplePolicy::Exclude,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Per-subject input file
    Input,
    /// Summary artifact
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliErrorBody::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(log_level: &str) {
    let filter =
        EnvFilter::try_new(log_level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Summarize {
            input_dir,
            output,
            format,
            prefix,
            extension,
            last_sample,
            jobs,
            config,
            no_progress,
        } => {
            let mut batch_config = match config {
                Some(path) => BatchConfig::from_json(&fs::read_to_string(path)?)?,
                None => BatchConfig::default(),
            };
            if let Some(dir) = input_dir {
                batch_config.input_dir = dir;
            }
            if let Some(prefix) = prefix {
                batch_config.file_prefix = prefix;
            }
            if let Some(extension) = extension {
                batch_config.file_extension = extension;
            }
            if let Some(policy) = last_sample {
                batch_config.last_sample = policy.into();
            }
            if let Some(jobs) = jobs {
                batch_config.jobs = jobs;
            }

            cmd_summarize(batch_config, &output, format.into(), !no_progress)
        }

        Commands::Inspect {
            input,
            last_sample,
            json,
        } => cmd_inspect(&input, last_sample.into(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_summarize(
    config: BatchConfig,
    output: &Path,
    format: ExportFormat,
    progress: bool,
) -> Result<(), CliError> {
    let runner = BatchRunner::new(config)?;
    let files = discover_subject_files(runner.config())?;

    if files.is_empty() {
        return Err(CliError::NoSubjects(runner.config().input_dir.clone()));
    }

    let bar = if progress && atty::is(atty::Stream::Stderr) {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message("Processing");
        bar
    } else {
        ProgressBar::hidden()
    };

    let outcome = runner.run_files(&files, |_| bar.inc(1))?;
    bar.finish_and_clear();

    for failure in &outcome.failures {
        eprintln!(
            "Skipped {} ({}): {}",
            failure.subject_id,
            failure.path.display(),
            failure.message
        );
    }
    for empty in outcome.empty_subjects() {
        eprintln!("{}: no valid rows after cleaning, reported as zero", empty.subject_id);
    }

    if outcome.summaries.is_empty() {
        return Err(CliError::NoValidData);
    }

    let exporter = SummaryExporter::new();
    let policy = runner.config().last_sample;

    if output.to_string_lossy() == "-" {
        let stdout = io::stdout();
        exporter.write(&outcome, policy, format, stdout.lock())?;
    } else {
        exporter.write_to_path(&outcome, policy, format, output)?;
        eprintln!(
            "Summarized {} subjects ({} skipped), results saved to {}",
            outcome.summaries.len(),
            outcome.failures.len(),
            output.display()
        );
    }

    Ok(())
}

fn cmd_inspect(input: &Path, policy: LastSamplePolicy, json: bool) -> Result<(), CliError> {
    let processor = SubjectProcessor::with_policy(policy);
    let loaded = processor.load_path(input)?;
    let summary = processor.summarize_loaded(&subject_id_from_path(input), &loaded);

    let report = InspectReport {
        path: input.display().to_string(),
        rows: loaded.report,
        summary,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut out = io::stdout().lock();
    let rows = &report.rows;
    let d = &report.summary.durations;
    writeln!(out, "Subject {} ({})", report.summary.subject_id, report.path)?;
    writeln!(out, "==================")?;
    writeln!(out, "Rows read:              {}", rows.rows_read)?;
    writeln!(out, "Rows kept:              {}", rows.rows_kept)?;
    writeln!(out, "Dropped (column count): {}", rows.dropped_column_count)?;
    writeln!(out, "Dropped (malformed):    {}", rows.dropped_malformed)?;
    writeln!(out, "Dropped (timestamp):    {}", rows.dropped_invalid_timestamp)?;
    writeln!(out, "Dropped (no MET):       {}", rows.dropped_missing_met)?;
    writeln!(out, "\nHours:")?;
    writeln!(out, "  total     {:>10.4}", d.total)?;
    writeln!(out, "  sleep     {:>10.4}", d.sleep)?;
    writeln!(out, "  static    {:>10.4}", d.static_)?;
    writeln!(out, "  low       {:>10.4}", d.low)?;
    writeln!(out, "  moderate  {:>10.4}", d.moderate)?;
    writeln!(out, "  high      {:>10.4}", d.high)?;

    Ok(())
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), CliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input: one delimited file per subject, named <prefix><digits>.<extension>");
            println!();
            println!("- Fields separated by ',' or ';' (may differ per row)");
            println!("- First line is the header; it must contain a 'time' column");
            println!("- time: milliseconds since an arbitrary epoch (numeric)");
            println!("- second column: MET reading, possibly unlabeled and embedded in text");
            println!("  (the first decimal numeral is used, e.g. \"3.2 METs\" -> 3.2)");
            println!();
            println!("Rows with extra fields, a non-numeric time or no MET numeral are dropped.");
        }
        SchemaType::Output => {
            println!("Output: one row per subject ({} {})", PRODUCER_NAME, VERSION);
            println!();
            println!("- subject_id");
            println!("- total_hours     span between first and last sample");
            println!("- sleep_hours     MET < 1.0");
            println!("- high_hours      MET >= 6.0");
            println!("- moderate_hours  3.0 <= MET < 6.0");
            println!("- low_hours       1.6 <= MET < 3.0");
            println!("- static_hours    1.0 <= MET < 1.6");
            println!();
            println!("Values are hours rounded to 4 decimals.");
        }
    }

    Ok(())
}

// Error types

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Compute(met_intensity::ComputeError),
    Json(serde_json::Error),
    NoSubjects(PathBuf),
    NoValidData,
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<met_intensity::ComputeError> for CliError {
    fn from(e: met_intensity::ComputeError) -> Self {
        CliError::Compute(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliErrorBody {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliError> for CliErrorBody {
    fn from(e: CliError) -> Self {
        match e {
            CliError::Io(e) => CliErrorBody {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliError::Compute(met_intensity::ComputeError::MissingColumn(column)) => CliErrorBody {
                code: "MISSING_COLUMN".to_string(),
                message: format!("Missing required column: {}", column),
                hint: Some("Run 'met-intensity schema input' for the expected layout".to_string()),
            },
            CliError::Compute(e) => CliErrorBody {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            CliError::Json(e) => CliErrorBody {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliError::NoSubjects(dir) => CliErrorBody {
                code: "NO_SUBJECTS".to_string(),
                message: format!("No subject files found in {}", dir.display()),
                hint: Some("Check --input-dir, --prefix and --extension".to_string()),
            },
            CliError::NoValidData => CliErrorBody {
                code: "NO_VALID_DATA".to_string(),
                message: "No subject could be summarized".to_string(),
                hint: Some("Review the skipped subjects above".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct InspectReport {
    path: String,
    rows: LoadReport,
    summary: SubjectSummary,
}
