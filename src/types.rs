//! Core types for the MET intensity pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: cleaned samples, intensity categories, per-category durations and
//! the per-subject summary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds per hour, used to convert timestamp deltas to hours
pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// Upper bound (exclusive) of the sleep band
pub const SLEEP_MAX_MET: f64 = 1.0;
/// Upper bound (exclusive) of the static band
pub const STATIC_MAX_MET: f64 = 1.6;
/// Upper bound (exclusive) of the low-intensity band
pub const LOW_MAX_MET: f64 = 3.0;
/// Upper bound (exclusive) of the moderate-intensity band
pub const MODERATE_MAX_MET: f64 = 6.0;

/// A cleaned (timestamp, MET) reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since an arbitrary epoch
    pub timestamp_ms: f64,
    /// Metabolic equivalent reading
    pub met: f64,
}

impl Sample {
    pub fn new(timestamp_ms: f64, met: f64) -> Self {
        Self { timestamp_ms, met }
    }

    pub fn category(&self) -> IntensityCategory {
        IntensityCategory::classify(self.met)
    }
}

/// Activity intensity category derived from a MET value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityCategory {
    Sleep,
    Static,
    Low,
    Moderate,
    High,
}

impl IntensityCategory {
    /// All categories, ordered from lowest to highest intensity
    pub const ALL: [IntensityCategory; 5] = [
        IntensityCategory::Sleep,
        IntensityCategory::Static,
        IntensityCategory::Low,
        IntensityCategory::Moderate,
        IntensityCategory::High,
    ];

    /// Classify a MET value using fixed half-open bands.
    ///
    /// Every `f64` maps to exactly one category. NaN fails every comparison
    /// and therefore lands in `High`.
    pub fn classify(met: f64) -> Self {
        if met < SLEEP_MAX_MET {
            IntensityCategory::Sleep
        } else if met < STATIC_MAX_MET {
            IntensityCategory::Static
        } else if met < LOW_MAX_MET {
            IntensityCategory::Low
        } else if met < MODERATE_MAX_MET {
            IntensityCategory::Moderate
        } else {
            IntensityCategory::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntensityCategory::Sleep => "sleep",
            IntensityCategory::Static => "static",
            IntensityCategory::Low => "low",
            IntensityCategory::Moderate => "moderate",
            IntensityCategory::High => "high",
        }
    }
}

impl fmt::Display for IntensityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hours attributed to each intensity category, plus the recording span
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDurations {
    /// Span between first and last sample (hours)
    pub total: f64,
    pub sleep: f64,
    #[serde(rename = "static")]
    pub static_: f64,
    pub low: f64,
    pub moderate: f64,
    pub high: f64,
}

impl CategoryDurations {
    /// Add `hours` to the bucket for `category`
    pub fn credit(&mut self, category: IntensityCategory, hours: f64) {
        *self.bucket_mut(category) += hours;
    }

    pub fn get(&self, category: IntensityCategory) -> f64 {
        match category {
            IntensityCategory::Sleep => self.sleep,
            IntensityCategory::Static => self.static_,
            IntensityCategory::Low => self.low,
            IntensityCategory::Moderate => self.moderate,
            IntensityCategory::High => self.high,
        }
    }

    /// Sum over the five category buckets (excludes `total`)
    pub fn category_sum(&self) -> f64 {
        IntensityCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }

    fn bucket_mut(&mut self, category: IntensityCategory) -> &mut f64 {
        match category {
            IntensityCategory::Sleep => &mut self.sleep,
            IntensityCategory::Static => &mut self.static_,
            IntensityCategory::Low => &mut self.low,
            IntensityCategory::Moderate => &mut self.moderate,
            IntensityCategory::High => &mut self.high,
        }
    }
}

/// Aggregated result for one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    /// Subject identifier (file stem, e.g. "P001")
    pub subject_id: String,
    /// Number of samples that survived cleaning
    pub sample_count: usize,
    /// Per-category durations in hours
    pub durations: CategoryDurations,
}

impl SubjectSummary {
    /// True when no sample survived cleaning
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries_are_half_open() {
        assert_eq!(IntensityCategory::classify(0.999), IntensityCategory::Sleep);
        assert_eq!(IntensityCategory::classify(1.0), IntensityCategory::Static);
        assert_eq!(IntensityCategory::classify(1.599), IntensityCategory::Static);
        assert_eq!(IntensityCategory::classify(1.6), IntensityCategory::Low);
        assert_eq!(IntensityCategory::classify(2.999), IntensityCategory::Low);
        assert_eq!(IntensityCategory::classify(3.0), IntensityCategory::Moderate);
        assert_eq!(IntensityCategory::classify(5.999), IntensityCategory::Moderate);
        assert_eq!(IntensityCategory::classify(6.0), IntensityCategory::High);
    }

    #[test]
    fn test_classify_is_total() {
        assert_eq!(IntensityCategory::classify(-4.0), IntensityCategory::Sleep);
        assert_eq!(
            IntensityCategory::classify(f64::NEG_INFINITY),
            IntensityCategory::Sleep
        );
        assert_eq!(IntensityCategory::classify(f64::INFINITY), IntensityCategory::High);
        assert_eq!(IntensityCategory::classify(f64::NAN), IntensityCategory::High);
    }

    #[test]
    fn test_credit_and_category_sum() {
        let mut durations = CategoryDurations::default();
        durations.credit(IntensityCategory::Low, 1.5);
        durations.credit(IntensityCategory::Low, 0.5);
        durations.credit(IntensityCategory::High, 0.25);

        assert_eq!(durations.low, 2.0);
        assert_eq!(durations.get(IntensityCategory::High), 0.25);
        assert_eq!(durations.category_sum(), 2.25);
        assert_eq!(durations.total, 0.0);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&IntensityCategory::Moderate).unwrap();
        assert_eq!(json, "\"moderate\"");
    }
}
