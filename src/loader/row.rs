//! Row-level parsing
//!
//! Every data row goes through [`parse_row`], which either yields a [`Sample`]
//! or a tagged [`RowParseError`]. Row errors are always recoverable: the
//! loader counts them and drops the row.

use crate::types::Sample;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Why a single row was dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowParseError {
    /// Row carries more fields than the header declares
    ColumnCount { expected: usize, found: usize },
    /// Row could not be tokenized at all
    Malformed { reason: String },
    /// Timestamp field absent, non-numeric or non-finite
    InvalidTimestamp { raw: String },
    /// MET field absent or without any decimal numeral
    MissingMet { raw: String },
}

impl fmt::Display for RowParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowParseError::ColumnCount { expected, found } => {
                write!(f, "expected at most {expected} fields, found {found}")
            }
            RowParseError::Malformed { reason } => write!(f, "malformed row: {reason}"),
            RowParseError::InvalidTimestamp { raw } => write!(f, "invalid timestamp {raw:?}"),
            RowParseError::MissingMet { raw } => write!(f, "no MET numeral in {raw:?}"),
        }
    }
}

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Number of header fields
    pub width: usize,
    /// Index of the timestamp column
    pub time_index: usize,
    /// Index of the MET column
    pub met_index: usize,
}

/// Parse one tokenized data row into a sample
pub fn parse_row<'a, I>(fields: I, layout: &ColumnLayout) -> Result<Sample, RowParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let fields: Vec<&str> = fields.into_iter().collect();

    if fields.len() > layout.width {
        return Err(RowParseError::ColumnCount {
            expected: layout.width,
            found: fields.len(),
        });
    }

    let raw_time = fields.get(layout.time_index).copied().unwrap_or_default();
    let timestamp_ms = parse_timestamp(raw_time).ok_or_else(|| RowParseError::InvalidTimestamp {
        raw: raw_time.to_string(),
    })?;

    let raw_met = fields.get(layout.met_index).copied().unwrap_or_default();
    let met = extract_met(raw_met).ok_or_else(|| RowParseError::MissingMet {
        raw: raw_met.to_string(),
    })?;

    Ok(Sample::new(timestamp_ms, met))
}

/// Coerce a timestamp field to a finite number of milliseconds
pub fn parse_timestamp(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Extract the first unsigned decimal numeral embedded in `raw`.
///
/// `"3.2 METs"` yields `3.2`, `"MET=7."` yields `7.0`; signs are ignored.
pub fn extract_met(raw: &str) -> Option<f64> {
    met_pattern()
        .find(raw)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn met_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+\.?[0-9]*").expect("regex is valid"))
}

/// Rewrite every semicolon outside double quotes as a comma so rows using
/// either delimiter can be read by a single comma-delimited reader.
///
/// Quote state never crosses a line break. A line with an unmatched quote has
/// its quotes removed, so a stray `"` only affects its own row.
pub fn unify_delimiters(text: &str) -> String {
    let mut unified = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        unify_line(line, &mut unified);
    }
    unified
}

fn unify_line(line: &str, out: &mut String) {
    if line.matches('"').count() % 2 == 1 {
        out.extend(line.chars().filter(|c| *c != '"').map(|c| match c {
            ';' => ',',
            _ => c,
        }));
        return;
    }

    let mut in_quotes = false;
    out.extend(line.chars().map(|c| match c {
        '"' => {
            in_quotes = !in_quotes;
            c
        }
        ';' if !in_quotes => ',',
        _ => c,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LAYOUT: ColumnLayout = ColumnLayout {
        width: 2,
        time_index: 0,
        met_index: 1,
    };

    #[test]
    fn test_extract_met_from_noisy_text() {
        assert_eq!(extract_met("3.2 METs"), Some(3.2));
        assert_eq!(extract_met("MET=7."), Some(7.0));
        assert_eq!(extract_met("  12 "), Some(12.0));
        assert_eq!(extract_met("-1.5"), Some(1.5));
        assert_eq!(extract_met("v2 4.5"), Some(2.0));
    }

    #[test]
    fn test_extract_met_without_digits() {
        assert_eq!(extract_met("MET"), None);
        assert_eq!(extract_met(""), None);
        assert_eq!(extract_met("nan"), None);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1700000000000"), Some(1_700_000_000_000.0));
        assert_eq!(parse_timestamp(" 42.5 "), Some(42.5));
        assert_eq!(parse_timestamp("1e3"), Some(1000.0));
        assert_eq!(parse_timestamp("abc"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("NaN"), None);
        assert_eq!(parse_timestamp("inf"), None);
    }

    #[test]
    fn test_parse_row_ok() {
        let sample = parse_row(["3600000", "3.2 METs"], &LAYOUT).unwrap();
        assert_eq!(sample, Sample::new(3_600_000.0, 3.2));
    }

    #[test]
    fn test_parse_row_rejects_bad_timestamp() {
        let err = parse_row(["abc", "1.2"], &LAYOUT).unwrap_err();
        assert_eq!(
            err,
            RowParseError::InvalidTimestamp {
                raw: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_parse_row_rejects_missing_met() {
        let err = parse_row(["100", "none"], &LAYOUT).unwrap_err();
        assert_eq!(
            err,
            RowParseError::MissingMet {
                raw: "none".to_string()
            }
        );

        let short = parse_row(["100"], &LAYOUT).unwrap_err();
        assert!(matches!(short, RowParseError::MissingMet { .. }));
    }

    #[test]
    fn test_parse_row_rejects_extra_fields() {
        let err = parse_row(["100", "1.0", "extra"], &LAYOUT).unwrap_err();
        assert_eq!(
            err,
            RowParseError::ColumnCount {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_unify_delimiters_respects_quotes() {
        assert_eq!(unify_delimiters("time;\"a;b\",c"), "time,\"a;b\",c");
        assert_eq!(unify_delimiters("1;2\n3,4"), "1,2\n3,4");
    }

    #[test]
    fn test_unify_delimiters_unmatched_quote_stays_on_its_line() {
        assert_eq!(
            unify_delimiters("time,\n0,\"0.5\n3600000;\"2;0\"\r\n7200000;4.0\n"),
            "time,\n0,0.5\n3600000,\"2;0\"\r\n7200000,4.0\n"
        );
        assert_eq!(unify_delimiters("1;\"a;b"), "1,a,b");
    }
}
