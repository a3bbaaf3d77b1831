//! Storage errors.

use super::error_code::{self, NeardupErrorCode};

/// Errors that can occur in a persistence adapter.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Persistence unavailable: {message}")]
    Unavailable { message: String },

    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("Signature for {doc_id} already stored with a different value")]
    WriteConflict { doc_id: String },

    #[error("Migration failed at version {version}: {message}")]
    MigrationFailed { version: u32, message: String },

    #[error("Snapshot failed for {path}: {message}")]
    SnapshotFailed { path: String, message: String },

    #[error("Corrupt record: {message}")]
    CorruptRecord { message: String },
}

impl NeardupErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => error_code::STORAGE_UNAVAILABLE,
            Self::WriteConflict { .. } => error_code::WRITE_CONFLICT,
            Self::MigrationFailed { .. } => error_code::MIGRATION_FAILED,
            Self::SnapshotFailed { .. } => error_code::SNAPSHOT_FAILED,
            Self::SqliteError { .. } | Self::CorruptRecord { .. } => error_code::STORAGE_ERROR,
        }
    }
}
