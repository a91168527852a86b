//! Batch driver
//!
//! Scans an input directory for subject files, summarizes each one
//! independently and collects the results. A failure on one subject never
//! aborts the batch.

use crate::aggregator::LastSamplePolicy;
use crate::error::ComputeError;
use crate::pipeline::{subject_id_from_path, SubjectProcessor};
use crate::types::SubjectSummary;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Batch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory holding one file per subject
    pub input_dir: PathBuf,
    /// File name prefix identifying subject files
    pub file_prefix: String,
    /// File extension (without the dot)
    pub file_extension: String,
    /// Credit policy for each subject's final sample
    pub last_sample: LastSamplePolicy,
    /// Worker threads; 1 processes subjects sequentially
    pub jobs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            file_prefix: "P".to_string(),
            file_extension: "csv".to_string(),
            last_sample: LastSamplePolicy::default(),
            jobs: 1,
        }
    }
}

impl BatchConfig {
    /// Load a configuration from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: BatchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.jobs == 0 {
            return Err(ComputeError::InvalidConfig(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.file_extension.is_empty() {
            return Err(ComputeError::InvalidConfig(
                "file_extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `path` names a subject file under this configuration
    pub fn matches(&self, path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };
        let suffix = format!(".{}", self.file_extension);
        name.starts_with(&self.file_prefix) && name.ends_with(&suffix)
    }
}

/// Category of a per-subject failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingColumn,
    Io,
    Other,
}

/// A subject that could not be summarized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectFailure {
    pub subject_id: String,
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

impl SubjectFailure {
    fn new(subject_id: String, path: &Path, error: ComputeError) -> Self {
        let kind = match &error {
            ComputeError::MissingColumn(_) => FailureKind::MissingColumn,
            ComputeError::Io { .. } => FailureKind::Io,
            _ => FailureKind::Other,
        };
        Self {
            subject_id,
            path: path.to_path_buf(),
            kind,
            message: error.to_string(),
        }
    }
}

/// Result of processing one subject file
pub type SubjectResult = Result<SubjectSummary, SubjectFailure>;

/// Summaries and failures of a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Successful summaries, sorted by subject id
    pub summaries: Vec<SubjectSummary>,
    /// Subjects skipped because of a file-level failure
    pub failures: Vec<SubjectFailure>,
}

impl BatchOutcome {
    /// Subjects whose rows were all dropped during cleaning
    pub fn empty_subjects(&self) -> impl Iterator<Item = &SubjectSummary> {
        self.summaries.iter().filter(|s| s.is_empty())
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// List subject files in the top level of the configured input directory
pub fn discover_subject_files(config: &BatchConfig) -> Result<Vec<PathBuf>, ComputeError> {
    if !config.input_dir.is_dir() {
        return Err(ComputeError::io(
            &config.input_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "input directory not found"),
        ));
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&config.input_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(readable_entry)
        .filter(|entry| entry.file_type().is_file() && config.matches(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

fn readable_entry(entry: walkdir::Result<walkdir::DirEntry>) -> Option<walkdir::DirEntry> {
    match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(path = ?e.path(), error = %e, "skipping unreadable entry");
            None
        }
    }
}

/// Batch runner holding the configuration and a shared subject processor
pub struct BatchRunner {
    config: BatchConfig,
    processor: SubjectProcessor,
}

impl BatchRunner {
    pub fn new(config: BatchConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        let processor = SubjectProcessor::with_policy(config.last_sample);
        Ok(Self { config, processor })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Discover subject files and process them all
    pub fn run(&self) -> Result<BatchOutcome, ComputeError> {
        let files = discover_subject_files(&self.config)?;
        self.run_files(&files, |_| {})
    }

    /// Process the given files, calling `on_subject` after each one
    pub fn run_files<F>(
        &self,
        files: &[PathBuf],
        on_subject: F,
    ) -> Result<BatchOutcome, ComputeError>
    where
        F: Fn(&SubjectResult) + Sync,
    {
        let process = |path: &PathBuf| {
            let result = self.process_file(path);
            on_subject(&result);
            result
        };

        let results: Vec<SubjectResult> = if self.config.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.jobs)
                .build()
                .map_err(|e| ComputeError::InvalidConfig(e.to_string()))?;
            pool.install(|| files.par_iter().map(process).collect())
        } else {
            files.iter().map(process).collect()
        };

        let mut outcome = BatchOutcome::default();
        for result in results {
            match result {
                Ok(summary) => outcome.summaries.push(summary),
                Err(failure) => outcome.failures.push(failure),
            }
        }
        outcome
            .summaries
            .sort_by(|a, b| a.subject_id.cmp(&b.subject_id));
        outcome
            .failures
            .sort_by(|a, b| a.subject_id.cmp(&b.subject_id));

        info!(
            subjects = outcome.summaries.len(),
            failed = outcome.failures.len(),
            "batch complete"
        );
        Ok(outcome)
    }

    /// Summarize a single subject file
    pub fn process_file(&self, path: &Path) -> SubjectResult {
        let subject_id = subject_id_from_path(path);

        match self.processor.summarize_path(&subject_id, path) {
            Ok(summary) => {
                if summary.is_empty() {
                    warn!(subject = %subject_id, "no valid rows after cleaning");
                } else {
                    debug!(subject = %subject_id, samples = summary.sample_count, "summarized");
                }
                Ok(summary)
            }
            Err(error) => {
                warn!(subject = %subject_id, error = %error, "skipping subject");
                Err(SubjectFailure::new(subject_id, path, error))
            }
        }
    }
}
