//! Storage configuration.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which persistence adapter backs the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{other}' (expected sqlite|memory)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Default: sqlite.
    pub backend: Option<StorageBackend>,
    /// SQLite database path. Default: "neardup.db".
    pub path: Option<PathBuf>,
    /// Portable snapshot written after a build and used as the query-mode
    /// fallback. Default: none.
    pub snapshot_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn effective_backend(&self) -> StorageBackend {
        self.backend.unwrap_or_default()
    }

    pub fn effective_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from("neardup.db"))
    }
}
