//! Subject record loaders
//!
//! This module provides loaders that read one subject's raw measurement file
//! and turn it into an ordered sequence of cleaned samples.

mod delimited;
mod row;

pub use delimited::DelimitedLoader;
pub use row::{extract_met, parse_row, parse_timestamp, ColumnLayout, RowParseError};

use crate::error::ComputeError;
use crate::types::Sample;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Trait for subject record loaders
pub trait RecordLoader {
    /// Read a subject's records and return samples sorted by timestamp
    fn load(&self, reader: &mut dyn Read) -> Result<LoadedSamples, ComputeError>;

    /// Open `path` and load it; read failures carry `path`
    fn load_path(&self, path: &Path) -> Result<LoadedSamples, ComputeError> {
        let mut file = File::open(path).map_err(|e| ComputeError::io(path, e))?;
        self.load(&mut file).map_err(|e| match e {
            ComputeError::Io { source, .. } => ComputeError::io(path, source),
            other => other,
        })
    }
}

/// Samples recovered from one input, with bookkeeping about dropped rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadedSamples {
    /// Samples in ascending timestamp order
    pub samples: Vec<Sample>,
    pub report: LoadReport,
}

impl LoadedSamples {
    /// True when every data row was dropped during cleaning
    pub fn is_empty_after_cleaning(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Per-file row accounting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Data rows seen (header excluded)
    pub rows_read: usize,
    /// Rows that produced a sample
    pub rows_kept: usize,
    pub dropped_column_count: usize,
    pub dropped_malformed: usize,
    pub dropped_invalid_timestamp: usize,
    pub dropped_missing_met: usize,
}

impl LoadReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped_column_count
            + self.dropped_malformed
            + self.dropped_invalid_timestamp
            + self.dropped_missing_met
    }

    pub(crate) fn record_drop(&mut self, error: &RowParseError) {
        match error {
            RowParseError::ColumnCount { .. } => self.dropped_column_count += 1,
            RowParseError::Malformed { .. } => self.dropped_malformed += 1,
            RowParseError::InvalidTimestamp { .. } => self.dropped_invalid_timestamp += 1,
            RowParseError::MissingMet { .. } => self.dropped_missing_met += 1,
        }
    }
}
