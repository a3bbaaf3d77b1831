//! SQLite persistence adapter.

use std::path::Path;

use neardup_core::errors::StorageError;
use neardup_core::traits::PersistenceAdapter;
use neardup_core::types::{IndexManifest, Signature};

use crate::connection::writer::with_immediate_transaction;
use crate::connection::ConnectionManager;
use crate::queries::{self, buckets, manifest, signatures};
use crate::snapshot::{IndexSnapshot, SnapshotBucket, SnapshotSignature};

/// A durable index in a single SQLite file (WAL mode).
///
/// Writes go through one serialized connection; lookups use a small read
/// pool. Each `index_document` call is one IMMEDIATE transaction, so a
/// crash never leaves a signature without its bucket rows.
pub struct SqliteStore {
    db: ConnectionManager,
}

impl SqliteStore {
    /// Open or create the index at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = ConnectionManager::open(path)?;
        tracing::debug!(path = %path.display(), "opened sqlite index");
        Ok(Self { db })
    }

    /// Open an index that must already exist, read-only. Query mode uses
    /// this so a missing file is reported as unavailable instead of created
    /// empty, and so the file is never migrated or written.
    pub fn open_existing(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            return Err(StorageError::Unavailable {
                message: format!("{} does not exist", path.display()),
            });
        }
        let db = ConnectionManager::open_read_only(path)?;
        tracing::debug!(path = %path.display(), "opened sqlite index read-only");
        Ok(Self { db })
    }

    pub fn is_read_only(&self) -> bool {
        self.db.is_read_only()
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            db: ConnectionManager::open_in_memory()?,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db.path()
    }

    /// Truncate the WAL into the main file.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.db.checkpoint()
    }

    fn to_snapshot(&self) -> Result<IndexSnapshot, StorageError> {
        let (manifest, sigs, rows) = self.db.with_reader(|conn| {
            Ok((
                manifest::get(conn)?,
                signatures::all(conn)?,
                buckets::all(conn)?,
            ))
        })?;

        let mut snapshot = IndexSnapshot {
            manifest,
            signatures: sigs
                .into_iter()
                .map(|(doc_id, signature)| SnapshotSignature { doc_id, signature })
                .collect(),
            ..IndexSnapshot::default()
        };

        // rows arrive ordered by (band, key, doc_id); group adjacent runs.
        for (band, key, doc_id) in rows {
            match snapshot.buckets.last_mut() {
                Some(last) if last.band == band && last.key == key => last.members.push(doc_id),
                _ => snapshot.buckets.push(SnapshotBucket {
                    band,
                    key,
                    members: vec![doc_id],
                }),
            }
        }
        snapshot.normalize();
        Ok(snapshot)
    }
}

impl PersistenceAdapter for SqliteStore {
    fn put_signature(&self, doc_id: &str, signature: &Signature) -> Result<(), StorageError> {
        self.db
            .with_writer(|conn| signatures::insert_once(conn, doc_id, signature))
    }

    fn get_signature(&self, doc_id: &str) -> Result<Option<Signature>, StorageError> {
        self.db.with_reader(|conn| signatures::get(conn, doc_id))
    }

    fn put_bucket_member(
        &self,
        band_index: u32,
        bucket_key: u64,
        doc_id: &str,
    ) -> Result<(), StorageError> {
        self.db
            .with_writer(|conn| buckets::insert_member(conn, band_index, bucket_key, doc_id))
    }

    fn get_bucket_members(
        &self,
        band_index: u32,
        bucket_key: u64,
    ) -> Result<Vec<String>, StorageError> {
        self.db
            .with_reader(|conn| buckets::members(conn, band_index, bucket_key))
    }

    fn put_manifest(&self, manifest: &IndexManifest) -> Result<(), StorageError> {
        self.db.with_writer(|conn| manifest::put(conn, manifest))
    }

    fn get_manifest(&self) -> Result<Option<IndexManifest>, StorageError> {
        self.db.with_reader(manifest::get)
    }

    fn signature_count(&self) -> Result<usize, StorageError> {
        self.db.with_reader(signatures::count)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.db
            .with_writer(|conn| with_immediate_transaction(conn, |tx| queries::clear_all(tx)))
    }

    fn snapshot(&self, dest: &Path) -> Result<(), StorageError> {
        self.to_snapshot()?.write_to(dest)
    }

    fn load_snapshot(&self, src: &Path) -> Result<(), StorageError> {
        IndexSnapshot::read_from(src)?.merge_into(self)
    }

    fn index_document(
        &self,
        doc_id: &str,
        signature: &Signature,
        bucket_keys: &[u64],
    ) -> Result<(), StorageError> {
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| {
                signatures::insert_once(tx, doc_id, signature)?;
                for (band, key) in bucket_keys.iter().enumerate() {
                    buckets::insert_member(tx, band as u32, *key, doc_id)?;
                }
                Ok(())
            })
        })
    }
}
