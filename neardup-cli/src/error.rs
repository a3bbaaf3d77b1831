//! CLI errors and their exit codes.

use neardup_core::errors::{
    ConfigError, IngestError, NeardupErrorCode, PipelineError, StorageError,
};

pub const EXIT_FATAL: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Cannot write {path}: {message}")]
    Output { path: String, message: String },
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Pipeline(PipelineError::Config(_)) => EXIT_CONFIG,
            _ => EXIT_FATAL,
        }
    }
}

impl NeardupErrorCode for CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Pipeline(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Ingest(e) => e.error_code(),
            Self::Output { .. } => "OUTPUT_ERROR",
        }
    }
}
