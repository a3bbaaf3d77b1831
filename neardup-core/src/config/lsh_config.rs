//! LSH banding configuration.

use serde::{Deserialize, Serialize};

/// Similarity threshold and how (bands, rows) are chosen for it.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LshConfig {
    /// Jaccard threshold for a verified duplicate. Default: 0.75.
    pub threshold: Option<f64>,
    /// Explicit band count. Must be given together with `rows`.
    pub bands: Option<usize>,
    /// Explicit rows per band. Must be given together with `bands`.
    pub rows: Option<usize>,
    /// Weight of the false-positive area in the (b, r) search. Default: 0.5.
    pub false_positive_weight: Option<f64>,
    /// Weight of the false-negative area in the (b, r) search. Default: 0.5.
    pub false_negative_weight: Option<f64>,
}

impl LshConfig {
    pub fn effective_threshold(&self) -> f64 {
        self.threshold.unwrap_or(0.75)
    }

    pub fn effective_false_positive_weight(&self) -> f64 {
        self.false_positive_weight.unwrap_or(0.5)
    }

    pub fn effective_false_negative_weight(&self) -> f64 {
        self.false_negative_weight.unwrap_or(0.5)
    }

    /// Explicit (bands, rows) when both are set.
    pub fn explicit_bands_rows(&self) -> Option<(usize, usize)> {
        match (self.bands, self.rows) {
            (Some(b), Some(r)) => Some((b, r)),
            _ => None,
        }
    }
}
