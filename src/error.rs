//! Error types for the MET intensity pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during loading, aggregation or export
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ComputeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ComputeError::Io {
            path: path.into(),
            source,
        }
    }
}
