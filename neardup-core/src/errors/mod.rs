//! Error handling for neardup.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod error_code;
pub mod ingest_error;
pub mod pipeline_error;
pub mod signature_error;
pub mod storage_error;

pub use config_error::ConfigError;
pub use error_code::NeardupErrorCode;
pub use ingest_error::IngestError;
pub use pipeline_error::PipelineError;
pub use signature_error::SignatureError;
pub use storage_error::StorageError;
