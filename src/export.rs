//! Result export
//!
//! This module turns a batch outcome into the output artifact: one row per
//! subject with durations rounded to four decimals, written as CSV or wrapped
//! in a JSON report carrying producer metadata.

use crate::aggregator::LastSamplePolicy;
use crate::batch::{BatchOutcome, SubjectFailure};
use crate::error::ComputeError;
use crate::types::SubjectSummary;
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use uuid::Uuid;

/// Decimal places kept in exported durations
pub const EXPORT_DECIMALS: i32 = 4;

/// Output artifact format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Spreadsheet-friendly CSV, one row per subject
    #[default]
    Csv,
    /// Compact JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
    /// One JSON row per line
    Ndjson,
}

/// One exported row; field order is the column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub subject_id: String,
    pub total_hours: f64,
    pub sleep_hours: f64,
    pub high_hours: f64,
    pub moderate_hours: f64,
    pub low_hours: f64,
    pub static_hours: f64,
}

impl From<&SubjectSummary> for SummaryRow {
    fn from(summary: &SubjectSummary) -> Self {
        let d = &summary.durations;
        Self {
            subject_id: summary.subject_id.clone(),
            total_hours: round_to(d.total, EXPORT_DECIMALS),
            sleep_hours: round_to(d.sleep, EXPORT_DECIMALS),
            high_hours: round_to(d.high, EXPORT_DECIMALS),
            moderate_hours: round_to(d.moderate, EXPORT_DECIMALS),
            low_hours: round_to(d.low, EXPORT_DECIMALS),
            static_hours: round_to(d.static_, EXPORT_DECIMALS),
        }
    }
}

/// Producer metadata embedded in JSON reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub run_id: String,
}

/// Complete JSON report for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub last_sample_policy: LastSamplePolicy,
    pub subjects: Vec<SummaryRow>,
    pub failures: Vec<SubjectFailure>,
}

/// Exporter for batch outcomes
pub struct SummaryExporter {
    run_id: String,
}

impl Default for SummaryExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryExporter {
    /// Create an exporter with a fresh run ID
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an exporter with a specific run ID
    pub fn with_run_id(run_id: String) -> Self {
        Self { run_id }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Build the JSON report for an outcome
    pub fn build_report(&self, outcome: &BatchOutcome, policy: LastSamplePolicy) -> BatchReport {
        BatchReport {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                run_id: self.run_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            last_sample_policy: policy,
            subjects: outcome.summaries.iter().map(SummaryRow::from).collect(),
            failures: outcome.failures.clone(),
        }
    }

    /// Write an outcome in `format` to `writer`
    pub fn write<W: Write>(
        &self,
        outcome: &BatchOutcome,
        policy: LastSamplePolicy,
        format: ExportFormat,
        mut writer: W,
    ) -> Result<(), ComputeError> {
        match format {
            ExportFormat::Csv => {
                let mut csv_writer = csv::Writer::from_writer(writer);
                for summary in &outcome.summaries {
                    csv_writer.serialize(SummaryRow::from(summary))?;
                }
                csv_writer
                    .flush()
                    .map_err(|e| ComputeError::io("<output>", e))?;
            }
            ExportFormat::Json => {
                serde_json::to_writer(&mut writer, &self.build_report(outcome, policy))?;
                writer.flush().map_err(|e| ComputeError::io("<output>", e))?;
            }
            ExportFormat::JsonPretty => {
                serde_json::to_writer_pretty(&mut writer, &self.build_report(outcome, policy))?;
                writeln!(writer).map_err(|e| ComputeError::io("<output>", e))?;
                writer.flush().map_err(|e| ComputeError::io("<output>", e))?;
            }
            ExportFormat::Ndjson => {
                for summary in &outcome.summaries {
                    serde_json::to_writer(&mut writer, &SummaryRow::from(summary))?;
                    writeln!(writer).map_err(|e| ComputeError::io("<output>", e))?;
                }
                writer.flush().map_err(|e| ComputeError::io("<output>", e))?;
            }
        }
        Ok(())
    }

    /// Write an outcome to a file, creating or truncating it
    pub fn write_to_path(
        &self,
        outcome: &BatchOutcome,
        policy: LastSamplePolicy,
        format: ExportFormat,
        path: &Path,
    ) -> Result<(), ComputeError> {
        let file = File::create(path).map_err(|e| ComputeError::io(path, e))?;
        self.write(outcome, policy, format, BufWriter::new(file))
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
