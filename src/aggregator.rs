//! Duration aggregation
//!
//! This module apportions the wall-clock time between consecutive samples into
//! intensity buckets:
//! - each gap is credited to the category of the earlier sample
//! - the final sample is credited according to a [`LastSamplePolicy`]
//! - the total is the span between the first and last sample

use crate::types::{CategoryDurations, Sample, MS_PER_HOUR};
use serde::{Deserialize, Serialize};

/// How the final sample, which has no following gap, is credited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastSamplePolicy {
    /// Credit the mean gap `total / (n - 1)` to the last sample's category.
    ///
    /// The category sum then equals `total + total / (n - 1)`, slightly more
    /// than the recording span.
    #[default]
    AverageInterval,
    /// Give the last sample no credit; the category sum equals `total`.
    Exclude,
}

/// Aggregator turning sorted samples into category durations
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationAggregator {
    policy: LastSamplePolicy,
}

impl DurationAggregator {
    pub fn new(policy: LastSamplePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> LastSamplePolicy {
        self.policy
    }

    /// Aggregate samples that are already sorted by timestamp.
    ///
    /// Fewer than two samples yield all-zero durations.
    pub fn aggregate(&self, samples: &[Sample]) -> CategoryDurations {
        let mut durations = CategoryDurations::default();

        let (first, last) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) if samples.len() > 1 => (first, last),
            _ => return durations,
        };

        durations.total = (last.timestamp_ms - first.timestamp_ms) / MS_PER_HOUR;

        for pair in samples.windows(2) {
            let gap_hours = (pair[1].timestamp_ms - pair[0].timestamp_ms) / MS_PER_HOUR;
            durations.credit(pair[0].category(), gap_hours);
        }

        if self.policy == LastSamplePolicy::AverageInterval {
            let avg_interval = durations.total / (samples.len() - 1) as f64;
            durations.credit(last.category(), avg_interval);
        }

        durations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntensityCategory;
    use pretty_assertions::assert_eq;

    const HOUR: f64 = MS_PER_HOUR;

    fn three_hour_samples() -> Vec<Sample> {
        vec![
            Sample::new(0.0, 0.5),
            Sample::new(HOUR, 2.0),
            Sample::new(2.0 * HOUR, 4.0),
        ]
    }

    #[test]
    fn test_average_interval_credit() {
        let durations = DurationAggregator::default().aggregate(&three_hour_samples());

        assert_eq!(
            durations,
            CategoryDurations {
                total: 2.0,
                sleep: 1.0,
                static_: 0.0,
                low: 1.0,
                moderate: 1.0,
                high: 0.0,
            }
        );
        // Last-sample credit sits on top of the measured span
        assert_eq!(durations.category_sum(), 3.0);
    }

    #[test]
    fn test_exclude_last_sample() {
        let durations =
            DurationAggregator::new(LastSamplePolicy::Exclude).aggregate(&three_hour_samples());

        assert_eq!(durations.total, 2.0);
        assert_eq!(durations.moderate, 0.0);
        assert_eq!(durations.category_sum(), durations.total);
    }

    #[test]
    fn test_empty_and_single_sample() {
        let aggregator = DurationAggregator::default();

        assert_eq!(aggregator.aggregate(&[]), CategoryDurations::default());
        assert_eq!(
            aggregator.aggregate(&[Sample::new(1_000.0, 7.0)]),
            CategoryDurations::default()
        );
    }

    #[test]
    fn test_gap_goes_to_earlier_sample() {
        let samples = vec![Sample::new(0.0, 6.0), Sample::new(30.0 * 60_000.0, 1.2)];
        let durations = DurationAggregator::default().aggregate(&samples);

        assert_eq!(durations.total, 0.5);
        assert_eq!(durations.high, 0.5);
        // avg interval equals the single gap
        assert_eq!(durations.static_, 0.5);
    }

    #[test]
    fn test_uneven_gaps() {
        let samples = vec![
            Sample::new(0.0, 1.0),
            Sample::new(0.25 * HOUR, 1.0),
            Sample::new(1.0 * HOUR, 8.0),
            Sample::new(4.0 * HOUR, 2.5),
        ];
        let durations = DurationAggregator::default().aggregate(&samples);

        assert_eq!(durations.total, 4.0);
        assert_eq!(durations.get(IntensityCategory::Static), 1.0);
        assert_eq!(durations.get(IntensityCategory::High), 3.0);
        assert!((durations.low - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_is_pure() {
        let aggregator = DurationAggregator::default();
        let samples = three_hour_samples();

        assert_eq!(aggregator.aggregate(&samples), aggregator.aggregate(&samples));
    }

    #[test]
    fn test_duplicate_timestamps() {
        let samples = vec![
            Sample::new(0.0, 0.2),
            Sample::new(0.0, 3.0),
            Sample::new(HOUR, 3.0),
        ];
        let durations = DurationAggregator::default().aggregate(&samples);

        assert_eq!(durations.total, 1.0);
        assert_eq!(durations.sleep, 0.0);
        assert_eq!(durations.moderate, 1.5);
    }
}
