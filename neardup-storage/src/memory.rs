//! Sharded in-memory persistence adapter.
//!
//! Signatures and buckets each live in 64 independently locked shards so
//! worker threads indexing different documents rarely contend.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use neardup_core::errors::StorageError;
use neardup_core::traits::PersistenceAdapter;
use neardup_core::types::{FxHashMap, IndexManifest, Signature};
use xxhash_rust::xxh3::xxh3_64;

use crate::snapshot::{IndexSnapshot, SnapshotBucket, SnapshotSignature};

const SHARD_COUNT: usize = 64;
const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;

type SignatureShard = FxHashMap<String, Signature>;
type BucketShard = FxHashMap<(u32, u64), BTreeSet<String>>;

pub struct MemoryStore {
    signatures: Vec<RwLock<SignatureShard>>,
    buckets: Vec<RwLock<BucketShard>>,
    manifest: Mutex<Option<IndexManifest>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            signatures: (0..SHARD_COUNT).map(|_| RwLock::new(FxHashMap::default())).collect(),
            buckets: (0..SHARD_COUNT).map(|_| RwLock::new(FxHashMap::default())).collect(),
            manifest: Mutex::new(None),
        }
    }

    /// Build a store pre-populated from a snapshot file.
    pub fn from_snapshot(src: &Path) -> Result<Self, StorageError> {
        let store = Self::new();
        store.load_snapshot(src)?;
        Ok(store)
    }

    fn signature_shard(&self, doc_id: &str) -> &RwLock<SignatureShard> {
        &self.signatures[(xxh3_64(doc_id.as_bytes()) as usize) % SHARD_COUNT]
    }

    fn bucket_shard(&self, band_index: u32, bucket_key: u64) -> &RwLock<BucketShard> {
        let mixed = (band_index as u64).wrapping_mul(GOLDEN) ^ bucket_key;
        &self.buckets[(mixed as usize) % SHARD_COUNT]
    }

    /// Collect the whole store into a normalized snapshot.
    pub fn to_snapshot(&self) -> Result<IndexSnapshot, StorageError> {
        let mut snapshot = IndexSnapshot {
            manifest: self.get_manifest()?,
            ..IndexSnapshot::default()
        };
        for shard in &self.signatures {
            let guard = shard.read().map_err(|_| poisoned())?;
            snapshot.signatures.extend(guard.iter().map(|(doc_id, signature)| {
                SnapshotSignature {
                    doc_id: doc_id.clone(),
                    signature: signature.clone(),
                }
            }));
        }
        for shard in &self.buckets {
            let guard = shard.read().map_err(|_| poisoned())?;
            snapshot.buckets.extend(guard.iter().map(|(&(band, key), members)| {
                SnapshotBucket {
                    band,
                    key,
                    members: members.iter().cloned().collect(),
                }
            }));
        }
        snapshot.normalize();
        Ok(snapshot)
    }
}

fn poisoned() -> StorageError {
    StorageError::Unavailable {
        message: "memory store lock poisoned".to_string(),
    }
}

impl PersistenceAdapter for MemoryStore {
    fn put_signature(&self, doc_id: &str, signature: &Signature) -> Result<(), StorageError> {
        let mut shard = self.signature_shard(doc_id).write().map_err(|_| poisoned())?;
        match shard.get(doc_id) {
            Some(existing) if existing != signature => Err(StorageError::WriteConflict {
                doc_id: doc_id.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                shard.insert(doc_id.to_string(), signature.clone());
                Ok(())
            }
        }
    }

    fn get_signature(&self, doc_id: &str) -> Result<Option<Signature>, StorageError> {
        let shard = self.signature_shard(doc_id).read().map_err(|_| poisoned())?;
        Ok(shard.get(doc_id).cloned())
    }

    fn put_bucket_member(
        &self,
        band_index: u32,
        bucket_key: u64,
        doc_id: &str,
    ) -> Result<(), StorageError> {
        let mut shard = self
            .bucket_shard(band_index, bucket_key)
            .write()
            .map_err(|_| poisoned())?;
        shard
            .entry((band_index, bucket_key))
            .or_default()
            .insert(doc_id.to_string());
        Ok(())
    }

    fn get_bucket_members(
        &self,
        band_index: u32,
        bucket_key: u64,
    ) -> Result<Vec<String>, StorageError> {
        let shard = self
            .bucket_shard(band_index, bucket_key)
            .read()
            .map_err(|_| poisoned())?;
        Ok(shard
            .get(&(band_index, bucket_key))
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn put_manifest(&self, manifest: &IndexManifest) -> Result<(), StorageError> {
        *self.manifest.lock().map_err(|_| poisoned())? = Some(manifest.clone());
        Ok(())
    }

    fn get_manifest(&self) -> Result<Option<IndexManifest>, StorageError> {
        Ok(self.manifest.lock().map_err(|_| poisoned())?.clone())
    }

    fn signature_count(&self) -> Result<usize, StorageError> {
        let mut total = 0;
        for shard in &self.signatures {
            total += shard.read().map_err(|_| poisoned())?.len();
        }
        Ok(total)
    }

    fn clear(&self) -> Result<(), StorageError> {
        for shard in &self.signatures {
            shard.write().map_err(|_| poisoned())?.clear();
        }
        for shard in &self.buckets {
            shard.write().map_err(|_| poisoned())?.clear();
        }
        *self.manifest.lock().map_err(|_| poisoned())? = None;
        Ok(())
    }

    fn snapshot(&self, dest: &Path) -> Result<(), StorageError> {
        self.to_snapshot()?.write_to(dest)
    }

    fn load_snapshot(&self, src: &Path) -> Result<(), StorageError> {
        IndexSnapshot::read_from(src)?.merge_into(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_selection_is_stable() {
        let store = MemoryStore::new();
        let a = store.signature_shard("doc-1") as *const _;
        let b = store.signature_shard("doc-1") as *const _;
        assert_eq!(a, b);
        let c = store.bucket_shard(3, 42) as *const _;
        let d = store.bucket_shard(3, 42) as *const _;
        assert_eq!(c, d);
    }

    #[test]
    fn same_key_in_different_bands_is_different_bucket() {
        let store = MemoryStore::new();
        store.put_bucket_member(0, 7, "a").unwrap();
        store.put_bucket_member(1, 7, "b").unwrap();
        assert_eq!(store.get_bucket_members(0, 7).unwrap(), vec!["a"]);
        assert_eq!(store.get_bucket_members(1, 7).unwrap(), vec!["b"]);
    }
}
