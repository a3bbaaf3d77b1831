//! Pipeline errors and the fatal/recoverable split.

use super::error_code::{self, NeardupErrorCode};
use super::{ConfigError, IngestError, SignatureError, StorageError};

/// Errors that can occur during a build or query run.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Worker failed: {message}")]
    Worker { message: String },
}

impl PipelineError {
    /// Whether this error must abort the whole run.
    ///
    /// Per-document problems (malformed input, a conflicting re-write of one
    /// document) are isolated; configuration and integrity problems are not.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Ingest(_) => false,
            Self::Storage(StorageError::WriteConflict { .. }) => false,
            Self::Signature(_) | Self::Storage(_) | Self::Config(_) | Self::Worker { .. } => true,
        }
    }
}

impl NeardupErrorCode for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Ingest(e) => e.error_code(),
            Self::Signature(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
            Self::Worker { .. } => error_code::WORKER_FAILED,
        }
    }
}
