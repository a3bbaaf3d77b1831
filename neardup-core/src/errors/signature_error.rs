//! Signature integrity errors. Always fatal: comparing signatures produced
//! under different configurations yields meaningless similarities.

use super::error_code::{self, NeardupErrorCode};

/// Errors that make cross-run signature comparison invalid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature for {doc_id} has length {actual}, configured num_perm is {expected}")]
    LengthMismatch {
        doc_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Index was built with {field} = {stored}, current configuration has {configured}")]
    ConfigDrift {
        field: String,
        stored: String,
        configured: String,
    },

    #[error("Index has no manifest; run a build first")]
    MissingManifest,
}

impl NeardupErrorCode for SignatureError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LengthMismatch { .. } => error_code::SIGNATURE_MISMATCH,
            Self::ConfigDrift { .. } => error_code::CONFIG_DRIFT,
            Self::MissingManifest => error_code::MISSING_MANIFEST,
        }
    }
}
