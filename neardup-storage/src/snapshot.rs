//! Portable JSON snapshot of a full index.
//!
//! Written by `snapshot()` on either adapter and merged back by
//! `load_snapshot()`. Entries are sorted so the same index always produces
//! the same file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use neardup_core::errors::StorageError;
use neardup_core::traits::PersistenceAdapter;
use neardup_core::types::{IndexManifest, Signature};
use serde::{Deserialize, Serialize};

/// One stored signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSignature {
    pub doc_id: String,
    pub signature: Signature,
}

/// One non-empty bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotBucket {
    pub band: u32,
    pub key: u64,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub format_version: u32,
    pub manifest: Option<IndexManifest>,
    pub signatures: Vec<SnapshotSignature>,
    pub buckets: Vec<SnapshotBucket>,
}

impl Default for IndexSnapshot {
    fn default() -> Self {
        Self {
            format_version: Self::FORMAT_VERSION,
            manifest: None,
            signatures: Vec::new(),
            buckets: Vec::new(),
        }
    }
}

impl IndexSnapshot {
    pub const FORMAT_VERSION: u32 = 1;

    /// Sort signatures by id and buckets by (band, key), members by id.
    pub fn normalize(&mut self) {
        self.signatures.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
        for bucket in &mut self.buckets {
            bucket.members.sort();
            bucket.members.dedup();
        }
        self.buckets.retain(|b| !b.members.is_empty());
        self.buckets.sort_by_key(|b| (b.band, b.key));
    }

    /// Write to `path` through a sibling temp file and a rename, so a crash
    /// never leaves a half-written snapshot behind.
    pub fn write_to(&self, path: &Path) -> Result<(), StorageError> {
        let fail = |message: String| StorageError::SnapshotFailed {
            path: path.display().to_string(),
            message,
        };

        let tmp = path.with_extension("tmp");
        let file = File::create(&tmp).map_err(|e| fail(format!("create: {e}")))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|e| fail(format!("encode: {e}")))?;
        writer.flush().map_err(|e| fail(format!("flush: {e}")))?;
        drop(writer);
        std::fs::rename(&tmp, path).map_err(|e| fail(format!("rename: {e}")))?;

        tracing::info!(
            path = %path.display(),
            signatures = self.signatures.len(),
            buckets = self.buckets.len(),
            "wrote index snapshot"
        );
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, StorageError> {
        let fail = |message: String| StorageError::SnapshotFailed {
            path: path.display().to_string(),
            message,
        };

        let file = File::open(path).map_err(|e| fail(format!("open: {e}")))?;
        let snapshot: IndexSnapshot = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| fail(format!("decode: {e}")))?;
        if snapshot.format_version != Self::FORMAT_VERSION {
            return Err(fail(format!(
                "unsupported snapshot format {} (expected {})",
                snapshot.format_version,
                Self::FORMAT_VERSION
            )));
        }
        Ok(snapshot)
    }

    /// Merge into `store` through the adapter contract: union for buckets,
    /// write-once for signatures. A store that already has a different
    /// manifest rejects the snapshot.
    pub fn merge_into(&self, store: &dyn PersistenceAdapter) -> Result<(), StorageError> {
        if let Some(ref manifest) = self.manifest {
            match store.get_manifest()? {
                Some(existing) if existing != *manifest => {
                    return Err(StorageError::SnapshotFailed {
                        path: "<snapshot>".to_string(),
                        message: "snapshot manifest differs from the store's manifest".to_string(),
                    });
                }
                Some(_) => {}
                None => store.put_manifest(manifest)?,
            }
        }
        for entry in &self.signatures {
            store.put_signature(&entry.doc_id, &entry.signature)?;
        }
        for bucket in &self.buckets {
            for member in &bucket.members {
                store.put_bucket_member(bucket.band, bucket.key, member)?;
            }
        }
        Ok(())
    }
}
