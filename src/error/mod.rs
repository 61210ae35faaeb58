//! Error handling for the triage pipeline.

pub mod util;

use std::io;
use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for the triage pipeline
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error building or reading Arrow record batches
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error reading or writing Parquet corpus files
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error serializing artifacts or requests
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error converting between records and record batches
    #[error("Record conversion error: {0}")]
    Conversion(#[from] serde_arrow::Error),

    /// The corpus does not follow the fixed column contract
    #[error("Schema error: {0}")]
    Schema(String),

    /// The primary synthetic corpus is missing or empty; training cannot proceed
    #[error("No training data at {}. Run `triage generate` first.", path.display())]
    NoTrainingData {
        /// Where the corpus was expected
        path: PathBuf,
    },

    /// A persisted artifact is missing, corrupt or incompatible
    #[error("Model loading failed for {}: {reason}", path.display())]
    ArtifactLoad {
        /// Artifact file that failed to load
        path: PathBuf,
        /// Why loading failed
        reason: String,
    },

    /// The classifier could not be fitted or queried
    #[error("Model error: {0}")]
    Model(String),

    /// A categorical value could not be encoded or decoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TriageError {
    /// Build an artifact load error from any displayable cause
    pub fn artifact_load(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for triage pipeline operations
pub type Result<T> = std::result::Result<T, TriageError>;
