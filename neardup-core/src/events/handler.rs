//! NeardupEventHandler trait, all methods with no-op defaults.

use super::types::*;

/// Trait for observing a build or query run.
///
/// All methods have no-op default implementations, so handlers only need
/// to override the events they care about. `Send + Sync` so one dispatcher
/// can be shared by every thread of a run.
pub trait NeardupEventHandler: Send + Sync {
    fn on_run_started(&self, _event: &RunStartedEvent) {}
    fn on_document_skipped(&self, _event: &DocumentSkippedEvent) {}
    fn on_stage_complete(&self, _event: &StageCompleteEvent) {}
    fn on_run_complete(&self, _event: &RunCompleteEvent) {}
}
