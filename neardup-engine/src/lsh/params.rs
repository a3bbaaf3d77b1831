//! Threshold to (bands, rows) mapping.
//!
//! P(s) = 1 - (1 - s^r)^b is the probability that two documents with
//! similarity s share at least one bucket. `for_threshold` picks the
//! divisor pair of k whose S-curve best separates the two sides of the
//! threshold, weighting the false positive area below it against the false
//! negative area above it.

use neardup_core::config::LshConfig;
use neardup_core::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Simpson intervals for the FP/FN areas. Must be even.
const INTEGRATION_STEPS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LshParams {
    pub bands: usize,
    pub rows: usize,
}

impl LshParams {
    pub fn new(bands: usize, rows: usize) -> Result<Self, ConfigError> {
        if bands == 0 || rows == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "lsh.bands/lsh.rows".to_string(),
                message: format!("bands ({bands}) and rows ({rows}) must both be positive"),
            });
        }
        Ok(Self { bands, rows })
    }

    /// Explicit `[lsh] bands/rows` when set, otherwise the optimised pair.
    pub fn from_config(lsh: &LshConfig, num_perm: usize) -> Result<Self, ConfigError> {
        match lsh.explicit_bands_rows() {
            Some((bands, rows)) => {
                let params = Self::new(bands, rows)?;
                if params.num_perm() != num_perm {
                    return Err(ConfigError::ValidationFailed {
                        field: "lsh.bands".to_string(),
                        message: format!(
                            "bands * rows = {} but minhash.num_perm = {num_perm}",
                            params.num_perm()
                        ),
                    });
                }
                Ok(params)
            }
            None => Self::for_threshold(
                lsh.effective_threshold(),
                num_perm,
                lsh.effective_false_positive_weight(),
                lsh.effective_false_negative_weight(),
            ),
        }
    }

    /// Minimise `fp_weight * FP + fn_weight * FN` over every r dividing k.
    ///
    /// Ties keep the smaller r.
    pub fn for_threshold(
        threshold: f64,
        num_perm: usize,
        fp_weight: f64,
        fn_weight: f64,
    ) -> Result<Self, ConfigError> {
        if num_perm == 0 {
            return Err(ConfigError::ValidationFailed {
                field: "minhash.num_perm".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::ValidationFailed {
                field: "lsh.threshold".to_string(),
                message: format!("{threshold} is outside (0, 1]"),
            });
        }

        let mut best: Option<(f64, LshParams)> = None;
        for rows in (1..=num_perm).filter(|r| num_perm % r == 0) {
            let params = LshParams {
                bands: num_perm / rows,
                rows,
            };
            let cost = fp_weight * params.false_positive_area(threshold)
                + fn_weight * params.false_negative_area(threshold);
            match best {
                Some((best_cost, _)) if cost >= best_cost => {}
                _ => best = Some((cost, params)),
            }
        }

        // num_perm >= 1 so rows = 1 always produced a candidate
        let (_, params) = best.ok_or_else(|| ConfigError::ValidationFailed {
            field: "minhash.num_perm".to_string(),
            message: "no (bands, rows) pair divides num_perm".to_string(),
        })?;
        tracing::debug!(
            threshold,
            num_perm,
            bands = params.bands,
            rows = params.rows,
            inflection = params.inflection(),
            "selected lsh parameters"
        );
        Ok(params)
    }

    pub fn num_perm(&self) -> usize {
        self.bands * self.rows
    }

    /// s0 = (1/b)^(1/r), the similarity where the S-curve is steepest.
    pub fn inflection(&self) -> f64 {
        (1.0 / self.bands as f64).powf(1.0 / self.rows as f64)
    }

    /// P(s) = 1 - (1 - s^r)^b.
    pub fn candidate_probability(&self, similarity: f64) -> f64 {
        let s = similarity.clamp(0.0, 1.0);
        1.0 - (1.0 - s.powi(self.rows as i32)).powi(self.bands as i32)
    }

    /// ∫₀ᵗ P(s) ds
    pub fn false_positive_area(&self, threshold: f64) -> f64 {
        simpson(|s| self.candidate_probability(s), 0.0, threshold)
    }

    /// ∫ₜ¹ (1 - P(s)) ds
    pub fn false_negative_area(&self, threshold: f64) -> f64 {
        simpson(|s| 1.0 - self.candidate_probability(s), threshold, 1.0)
    }
}

/// Composite Simpson's rule on [lo, hi].
fn simpson(f: impl Fn(f64) -> f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return 0.0;
    }
    let n = INTEGRATION_STEPS;
    let h = (hi - lo) / n as f64;
    let mut sum = f(lo) + f(hi);
    for i in 1..n {
        let x = lo + i as f64 * h;
        sum += if i % 2 == 1 { 4.0 * f(x) } else { 2.0 * f(x) };
    }
    sum * h / 3.0
}
