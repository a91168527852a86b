//! Pipeline orchestration
//!
//! This module provides the single-subject API: load a subject file, clean and
//! sort its rows, then aggregate the samples into a [`SubjectSummary`].

use crate::aggregator::{DurationAggregator, LastSamplePolicy};
use crate::error::ComputeError;
use crate::loader::{DelimitedLoader, LoadedSamples, RecordLoader};
use crate::types::{Sample, SubjectSummary};
use std::io::Read;
use std::path::Path;

/// Summarize one subject file with the default loader and policy.
///
/// The subject id is the file stem (`P001.csv` → `P001`).
///
/// # Example
/// ```ignore
/// let summary = summarize_file(Path::new("data/P001.csv"))?;
/// println!("{} slept {:.2}h", summary.subject_id, summary.durations.sleep);
/// ```
pub fn summarize_file(path: &Path) -> Result<SubjectSummary, ComputeError> {
    SubjectProcessor::new().summarize_path(&subject_id_from_path(path), path)
}

/// Derive a subject identifier from a file path
pub fn subject_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Processor pairing a record loader with a duration aggregator.
///
/// Holds no per-subject state, so one processor can be shared across files.
pub struct SubjectProcessor {
    loader: Box<dyn RecordLoader + Send + Sync>,
    aggregator: DurationAggregator,
}

impl Default for SubjectProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SubjectProcessor {
    /// Create a processor with the delimited loader and average-interval policy
    pub fn new() -> Self {
        Self::with_policy(LastSamplePolicy::default())
    }

    /// Create a processor with a specific last-sample policy
    pub fn with_policy(policy: LastSamplePolicy) -> Self {
        Self {
            loader: Box::new(DelimitedLoader::new()),
            aggregator: DurationAggregator::new(policy),
        }
    }

    /// Replace the record loader
    pub fn with_loader(mut self, loader: Box<dyn RecordLoader + Send + Sync>) -> Self {
        self.loader = loader;
        self
    }

    pub fn policy(&self) -> LastSamplePolicy {
        self.aggregator.policy()
    }

    /// Load a subject file without aggregating it
    pub fn load_path(&self, path: &Path) -> Result<LoadedSamples, ComputeError> {
        self.loader.load_path(path)
    }

    /// Load and summarize a subject file
    pub fn summarize_path(
        &self,
        subject_id: &str,
        path: &Path,
    ) -> Result<SubjectSummary, ComputeError> {
        let loaded = self.load_path(path)?;
        Ok(self.summarize_loaded(subject_id, &loaded))
    }

    /// Load and summarize records from any reader
    pub fn summarize_reader(
        &self,
        subject_id: &str,
        reader: &mut dyn Read,
    ) -> Result<SubjectSummary, ComputeError> {
        let loaded = self.loader.load(reader)?;
        Ok(self.summarize_loaded(subject_id, &loaded))
    }

    /// Summarize samples already produced by a loader (sorted)
    pub fn summarize_loaded(&self, subject_id: &str, loaded: &LoadedSamples) -> SubjectSummary {
        SubjectSummary {
            subject_id: subject_id.to_string(),
            sample_count: loaded.samples.len(),
            durations: self.aggregator.aggregate(&loaded.samples),
        }
    }

    /// Summarize samples in arbitrary order
    pub fn summarize_samples(&self, subject_id: &str, mut samples: Vec<Sample>) -> SubjectSummary {
        samples.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
        SubjectSummary {
            subject_id: subject_id.to_string(),
            sample_count: samples.len(),
            durations: self.aggregator.aggregate(&samples),
        }
    }
}
