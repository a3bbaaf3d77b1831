//! Event payload types.

use crate::types::{RunMode, Stage};

/// Payload for `on_run_started`.
#[derive(Debug, Clone)]
pub struct RunStartedEvent {
    pub mode: RunMode,
    pub threshold: f64,
    pub num_perm: usize,
    pub bands: usize,
    pub rows: usize,
}

/// Payload for `on_document_skipped`.
#[derive(Debug, Clone)]
pub struct DocumentSkippedEvent {
    pub doc_id: Option<String>,
    pub reason: String,
}

/// Payload for `on_stage_complete`.
#[derive(Debug, Clone)]
pub struct StageCompleteEvent {
    pub stage: Stage,
    pub count: usize,
    pub duration_ms: u64,
}

/// Payload for `on_run_complete`.
#[derive(Debug, Clone)]
pub struct RunCompleteEvent {
    pub mode: RunMode,
    pub documents: usize,
    pub skipped: usize,
    pub verified_edges: usize,
    pub duplicate_groups: usize,
    pub duration_ms: u64,
}
