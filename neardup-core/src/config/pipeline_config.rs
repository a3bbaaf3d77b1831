//! Worker pool configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Signature workers. 0 or unset means available parallelism.
    pub workers: Option<usize>,
    /// Bounded queue capacity between dispatcher, workers and collector. Default: 1024.
    pub queue_capacity: Option<usize>,
}

impl PipelineConfig {
    pub fn effective_workers(&self) -> usize {
        match self.workers {
            Some(n) if n > 0 => n,
            _ => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(1024)
    }
}
