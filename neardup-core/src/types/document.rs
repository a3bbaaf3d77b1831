//! Documents and the run lifecycle vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A document as handed over by a loader: a stable id and its combined text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// The two process-level verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Compute signatures, persist them with their bucket memberships, report.
    Build,
    /// Compute signatures and compare against the persisted index; write nothing.
    Query,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => f.write_str("build"),
            Self::Query => f.write_str("query"),
        }
    }
}

/// Pipeline stages, in the only order they are ever entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingested,
    Shingled,
    Signed,
    Indexed,
    Candidate,
    Verified,
    Clustered,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingested => "ingested",
            Self::Shingled => "shingled",
            Self::Signed => "signed",
            Self::Indexed => "indexed",
            Self::Candidate => "candidate",
            Self::Verified => "verified",
            Self::Clustered => "clustered",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
