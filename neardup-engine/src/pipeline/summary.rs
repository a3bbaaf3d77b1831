//! Per-run summary: counts, timings, and every recoverable problem.

use neardup_core::errors::{NeardupErrorCode, PipelineError};
use neardup_core::types::{RunMode, Stage};
use serde::Serialize;

/// A document that did not make it through the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub doc_id: Option<String>,
    pub code: &'static str,
    pub reason: String,
}

impl SkippedDocument {
    pub fn from_error(doc_id: Option<String>, error: &PipelineError) -> Self {
        Self {
            doc_id,
            code: error.error_code(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub count: usize,
    pub duration_ms: u64,
}

/// The partial-result carrier of a run. Non-fatal errors land here instead
/// of aborting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    /// Records pulled from the loader, skipped ones included.
    pub documents_seen: usize,
    /// Documents that were signed and took part in clustering.
    pub documents_processed: usize,
    /// Signed documents with an empty shingle set.
    pub degenerate_documents: usize,
    pub skipped: Vec<SkippedDocument>,
    pub candidate_pairs: usize,
    pub verified_edges: usize,
    pub clusters: usize,
    pub duplicate_groups: usize,
    pub stages: Vec<StageTiming>,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            documents_seen: 0,
            documents_processed: 0,
            degenerate_documents: 0,
            skipped: Vec::new(),
            candidate_pairs: 0,
            verified_edges: 0,
            clusters: 0,
            duplicate_groups: 0,
            stages: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn record_stage(&mut self, stage: Stage, count: usize, duration_ms: u64) {
        self.stages.push(StageTiming {
            stage,
            count,
            duration_ms,
        });
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageTiming> {
        self.stages.iter().find(|t| t.stage == stage)
    }
}
