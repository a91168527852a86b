//! MET Intensity - Activity intensity durations from timestamped MET recordings
//!
//! The crate turns one delimited MET recording per subject into the hours spent
//! in each activity intensity category through a deterministic pipeline:
//! record loading → row cleaning and sorting → duration aggregation → export.
//!
//! ## Modules
//!
//! - **Loader**: mixed-delimiter CSV parsing with per-row fallible cleaning
//! - **Aggregator**: gap apportioning with an explicit last-sample policy
//! - **Batch**: directory scan and per-subject processing that survives bad files
//! - **Export**: CSV and JSON artifacts with four-decimal durations

pub mod aggregator;
pub mod batch;
pub mod error;
pub mod export;
pub mod loader;
pub mod pipeline;
pub mod types;

pub use aggregator::{DurationAggregator, LastSamplePolicy};
pub use batch::{BatchConfig, BatchOutcome, BatchRunner, SubjectFailure};
pub use error::ComputeError;
pub use export::{ExportFormat, SummaryExporter};
pub use loader::{DelimitedLoader, RecordLoader};
pub use pipeline::{summarize_file, SubjectProcessor};
pub use types::{CategoryDurations, IntensityCategory, Sample, SubjectSummary};

/// Crate version embedded in JSON reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for JSON reports
pub const PRODUCER_NAME: &str = "met-intensity";
