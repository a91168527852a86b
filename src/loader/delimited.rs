//! Mixed-delimiter CSV loader
//!
//! Reads comma- or semicolon-separated subject files with a `time` column and
//! an (often unlabeled) MET column in second position.

use crate::error::ComputeError;
use crate::types::Sample;
use csv::ReaderBuilder;
use std::io::Read;
use tracing::debug;

use super::row::{parse_row, unify_delimiters, ColumnLayout, RowParseError};
use super::{LoadReport, LoadedSamples, RecordLoader};

/// Default name of the timestamp column
pub const DEFAULT_TIME_COLUMN: &str = "time";

/// Default position of the MET column
pub const DEFAULT_MET_INDEX: usize = 1;

/// Loader for delimited subject files
#[derive(Debug, Clone)]
pub struct DelimitedLoader {
    time_column: String,
    met_index: usize,
}

impl Default for DelimitedLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DelimitedLoader {
    pub fn new() -> Self {
        Self {
            time_column: DEFAULT_TIME_COLUMN.to_string(),
            met_index: DEFAULT_MET_INDEX,
        }
    }

    /// Use a different header name for the timestamp column
    pub fn with_time_column(mut self, name: impl Into<String>) -> Self {
        self.time_column = name.into();
        self
    }

    /// Read the MET value from a different field position
    pub fn with_met_index(mut self, index: usize) -> Self {
        self.met_index = index;
        self
    }

    /// Resolve column positions from the header fields
    fn resolve_layout<'a, I>(&self, headers: I) -> Result<ColumnLayout, ComputeError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let names: Vec<&str> = headers
            .into_iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();

        let time_index = names
            .iter()
            .position(|name| *name == self.time_column)
            .ok_or_else(|| ComputeError::MissingColumn(self.time_column.clone()))?;

        if names.len() <= self.met_index {
            return Err(ComputeError::MissingColumn("met".to_string()));
        }

        Ok(ColumnLayout {
            width: names.len(),
            time_index,
            met_index: self.met_index,
        })
    }
}

impl RecordLoader for DelimitedLoader {
    fn load(&self, reader: &mut dyn Read) -> Result<LoadedSamples, ComputeError> {
        let mut raw = Vec::new();
        reader
            .read_to_end(&mut raw)
            .map_err(|e| ComputeError::io("<input>", e))?;
        let text = unify_delimiters(&String::from_utf8_lossy(&raw));

        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let layout = self.resolve_layout(csv_reader.headers()?.iter())?;

        let mut report = LoadReport::default();
        let mut samples: Vec<Sample> = Vec::new();

        for (line, record) in csv_reader.records().enumerate() {
            report.rows_read += 1;

            let parsed = match record {
                Ok(record) => parse_row(record.iter(), &layout),
                Err(e) => Err(RowParseError::Malformed {
                    reason: e.to_string(),
                }),
            };

            match parsed {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    debug!(row = line + 1, error = %e, "dropping row");
                    report.record_drop(&e);
                }
            }
        }

        samples.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
        report.rows_kept = samples.len();

        Ok(LoadedSamples { samples, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn load_str(input: &str) -> Result<LoadedSamples, ComputeError> {
        DelimitedLoader::new().load(&mut input.as_bytes())
    }

    #[test]
    fn test_load_mixed_delimiters_and_sorts() {
        let input = "time,\n7200000;4.0\n0,0.5 MET\n3600000;\"2.0\"\n";
        let loaded = load_str(input).unwrap();

        assert_eq!(
            loaded.samples,
            vec![
                Sample::new(0.0, 0.5),
                Sample::new(3_600_000.0, 2.0),
                Sample::new(7_200_000.0, 4.0),
            ]
        );
        assert_eq!(loaded.report.rows_read, 3);
        assert_eq!(loaded.report.rows_kept, 3);
    }

    #[test]
    fn test_load_drops_dirty_rows() {
        let input = "time;\nabc;1.0\n100;no digits\n200;1.2;extra\n300;3.2 METs\n";
        let loaded = load_str(input).unwrap();

        assert_eq!(loaded.samples, vec![Sample::new(300.0, 3.2)]);
        assert_eq!(
            loaded.report,
            LoadReport {
                rows_read: 4,
                rows_kept: 1,
                dropped_column_count: 1,
                dropped_malformed: 0,
                dropped_invalid_timestamp: 1,
                dropped_missing_met: 1,
            }
        );
    }

    #[test]
    fn test_load_missing_time_column() {
        let err = load_str("timestamp,met\n1,2\n").unwrap_err();
        assert!(matches!(err, ComputeError::MissingColumn(ref c) if c == "time"));
    }

    #[test]
    fn test_load_single_column_header() {
        let err = load_str("time\n1\n").unwrap_err();
        assert!(matches!(err, ComputeError::MissingColumn(ref c) if c == "met"));
    }

    #[test]
    fn test_load_empty_after_cleaning() {
        let loaded = load_str("time,\nabc,xyz\n").unwrap();
        assert!(loaded.is_empty_after_cleaning());
        assert_eq!(loaded.report.rows_dropped(), 1);
    }

    #[test]
    fn test_load_header_with_bom_and_spaces() {
        let loaded = load_str("\u{feff} time , MET\n10,1.5\n").unwrap();
        assert_eq!(loaded.samples, vec![Sample::new(10.0, 1.5)]);
    }

    #[test]
    fn test_unmatched_quote_drops_nothing_after_it() {
        let input = "time,\n0,\"0.5\n3600000;2.0\n7200000;4.0\n";
        let loaded = load_str(input).unwrap();

        assert_eq!(
            loaded.samples,
            vec![
                Sample::new(0.0, 0.5),
                Sample::new(3_600_000.0, 2.0),
                Sample::new(7_200_000.0, 4.0),
            ]
        );
        assert_eq!(loaded.report.rows_read, 3);
        assert_eq!(loaded.report.rows_dropped(), 0);
    }

    #[test]
    fn test_custom_time_column_and_met_index() {
        let loader = DelimitedLoader::new()
            .with_time_column("ts")
            .with_met_index(2);
        let loaded = loader.load(&mut "ts;x;met\n5;junk;6.5\n".as_bytes()).unwrap();
        assert_eq!(loaded.samples, vec![Sample::new(5.0, 6.5)]);

        let err = loader.load(&mut "time,x,met\n5,1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ComputeError::MissingColumn(ref c) if c == "ts"));

        let err = loader.load(&mut "ts,met\n5,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ComputeError::MissingColumn(ref c) if c == "met"));
    }

    #[test]
    fn test_time_column_may_follow_met() {
        let loaded = load_str("id,label,time\nx,2.5,50\n").unwrap();
        assert_eq!(loaded.samples, vec![Sample::new(50.0, 2.5)]);
    }
}
