//! Ingestion errors. Always recoverable: the document is skipped and the
//! error lands in the run summary.

use super::error_code::{self, NeardupErrorCode};

/// Errors raised while turning loader records into documents.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IngestError {
    #[error("Malformed document {}: {reason}", .doc_id.as_deref().unwrap_or("<no id>"))]
    MalformedDocument {
        doc_id: Option<String>,
        reason: String,
    },

    #[error("Document id {doc_id} appears more than once in this run")]
    DuplicateId { doc_id: String },

    #[error("Cannot read {path}: {message}")]
    UnreadableSource { path: String, message: String },

    #[error("Invalid JSON in {path}: {message}")]
    InvalidJson { path: String, message: String },
}

impl IngestError {
    /// Shorthand for a malformed document with a known id.
    pub fn malformed(doc_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            doc_id: Some(doc_id.into()),
            reason: reason.into(),
        }
    }

    /// The offending document id, when one is known.
    pub fn doc_id(&self) -> Option<&str> {
        match self {
            Self::MalformedDocument { doc_id, .. } => doc_id.as_deref(),
            Self::DuplicateId { doc_id } => Some(doc_id),
            Self::UnreadableSource { .. } | Self::InvalidJson { .. } => None,
        }
    }
}

impl NeardupErrorCode for IngestError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedDocument { .. } => error_code::MALFORMED_DOCUMENT,
            Self::DuplicateId { .. } => error_code::DUPLICATE_ID,
            Self::UnreadableSource { .. } | Self::InvalidJson { .. } => error_code::SOURCE_ERROR,
        }
    }
}
