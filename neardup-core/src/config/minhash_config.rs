//! MinHash signature configuration.

use serde::{Deserialize, Serialize};

/// Signature length and the seed the k hash functions are derived from.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MinHashConfig {
    /// Number of hash functions k. Default: 128.
    pub num_perm: Option<usize>,
    /// Seed for the per-function coefficients. Default: 1.
    pub seed: Option<u64>,
}

impl MinHashConfig {
    pub fn effective_num_perm(&self) -> usize {
        self.num_perm.unwrap_or(128)
    }

    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or(1)
    }
}
