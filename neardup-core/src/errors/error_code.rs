//! NeardupErrorCode trait for stable, machine-readable error codes.

/// Trait giving every neardup error a stable code string.
/// The CLI prints `[CODE] message`; scripts match on the code.
pub trait NeardupErrorCode {
    /// Returns the error code string (e.g., "CONFIG_DRIFT").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted error string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const MALFORMED_DOCUMENT: &str = "MALFORMED_DOCUMENT";
pub const DUPLICATE_ID: &str = "DUPLICATE_ID";
pub const SOURCE_ERROR: &str = "SOURCE_ERROR";
pub const SIGNATURE_MISMATCH: &str = "SIGNATURE_MISMATCH";
pub const CONFIG_DRIFT: &str = "CONFIG_DRIFT";
pub const MISSING_MANIFEST: &str = "MISSING_MANIFEST";
pub const STORAGE_UNAVAILABLE: &str = "STORAGE_UNAVAILABLE";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const WRITE_CONFLICT: &str = "WRITE_CONFLICT";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const SNAPSHOT_FAILED: &str = "SNAPSHOT_FAILED";
pub const WORKER_FAILED: &str = "WORKER_FAILED";
