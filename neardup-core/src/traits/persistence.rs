//! Persistence adapter: durable signatures and bucket membership.
//!
//! Any key-value store can back an index. Implementations must be safe to
//! share across worker threads, keep signatures write-once, and treat bucket
//! membership as a set so that concurrent builds merge by union.

use std::path::Path;

use crate::errors::StorageError;
use crate::types::{IndexManifest, Signature};

pub trait PersistenceAdapter: Send + Sync {
    /// Store a signature. Re-writing an identical value is a no-op; a
    /// different value for an existing id is `StorageError::WriteConflict`.
    fn put_signature(&self, doc_id: &str, signature: &Signature) -> Result<(), StorageError>;

    fn get_signature(&self, doc_id: &str) -> Result<Option<Signature>, StorageError>;

    /// Idempotent add of `doc_id` to the bucket `(band_index, bucket_key)`.
    fn put_bucket_member(
        &self,
        band_index: u32,
        bucket_key: u64,
        doc_id: &str,
    ) -> Result<(), StorageError>;

    /// Members of one bucket, sorted, without duplicates.
    fn get_bucket_members(
        &self,
        band_index: u32,
        bucket_key: u64,
    ) -> Result<Vec<String>, StorageError>;

    fn put_manifest(&self, manifest: &IndexManifest) -> Result<(), StorageError>;

    fn get_manifest(&self) -> Result<Option<IndexManifest>, StorageError>;

    /// Number of stored signatures.
    fn signature_count(&self) -> Result<usize, StorageError>;

    /// Remove every signature, bucket and the manifest.
    fn clear(&self) -> Result<(), StorageError>;

    /// Write the full index to `dest` in the portable snapshot format.
    fn snapshot(&self, dest: &Path) -> Result<(), StorageError>;

    /// Merge the snapshot at `src` into this store: union for buckets,
    /// write-once for signatures.
    fn load_snapshot(&self, src: &Path) -> Result<(), StorageError>;

    /// Persist one document: its signature, then one membership per band.
    /// `bucket_keys[i]` is the key for band `i`. Adapters with transactions
    /// override this to write atomically.
    fn index_document(
        &self,
        doc_id: &str,
        signature: &Signature,
        bucket_keys: &[u64],
    ) -> Result<(), StorageError> {
        self.put_signature(doc_id, signature)?;
        for (band, key) in bucket_keys.iter().enumerate() {
            self.put_bucket_member(band as u32, *key, doc_id)?;
        }
        Ok(())
    }
}
