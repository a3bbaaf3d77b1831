//! Candidate verification configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a candidate pair's similarity is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// Fraction of equal signature positions.
    #[default]
    Estimated,
    /// True Jaccard over shingle sets, where the run holds both sets.
    Exact,
}

impl FromStr for VerifyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "estimated" => Ok(Self::Estimated),
            "exact" => Ok(Self::Exact),
            other => Err(format!("unknown verify mode '{other}' (expected estimated|exact)")),
        }
    }
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Estimated => f.write_str("estimated"),
            Self::Exact => f.write_str("exact"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct VerifyConfig {
    /// Default: estimated.
    pub mode: Option<VerifyMode>,
}

impl VerifyConfig {
    pub fn effective_mode(&self) -> VerifyMode {
        self.mode.unwrap_or_default()
    }
}
