//! Shingle extraction configuration.

use serde::{Deserialize, Serialize};

/// How text is normalized and cut into word shingles.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ShingleConfig {
    /// Words per shingle. Default: 3.
    pub width: Option<usize>,
    /// Seed for the 64-bit shingle hash. Default: 0.
    pub seed: Option<u64>,
    /// Case-fold before tokenizing. Default: true.
    pub lowercase: Option<bool>,
    /// Drop characters that are neither alphanumeric nor whitespace. Default: true.
    pub strip_punctuation: Option<bool>,
}

impl ShingleConfig {
    pub fn effective_width(&self) -> usize {
        self.width.unwrap_or(3)
    }

    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or(0)
    }

    pub fn effective_lowercase(&self) -> bool {
        self.lowercase.unwrap_or(true)
    }

    pub fn effective_strip_punctuation(&self) -> bool {
        self.strip_punctuation.unwrap_or(true)
    }
}
