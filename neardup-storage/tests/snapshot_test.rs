//! Snapshot export/import across adapters.

use neardup_core::errors::StorageError;
use neardup_core::traits::PersistenceAdapter;
use neardup_core::types::{IndexManifest, Signature};
use neardup_storage::{IndexSnapshot, MemoryStore, SqliteStore};

fn manifest(seed: u64) -> IndexManifest {
    IndexManifest {
        shingle_width: 3,
        shingle_seed: 0,
        lowercase: true,
        strip_punctuation: true,
        num_perm: 4,
        minhash_seed: seed,
        bands: 2,
        rows: 2,
    }
}

fn populate(store: &dyn PersistenceAdapter) {
    store.put_manifest(&manifest(1)).unwrap();
    store
        .index_document("b", &Signature::new(vec![1, 2, 3, 4]), &[7, 8])
        .unwrap();
    store
        .index_document("a", &Signature::new(vec![1, 2, 5, 6]), &[7, 9])
        .unwrap();
}

#[test]
fn sqlite_snapshot_restores_into_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    let sqlite = SqliteStore::open_in_memory().unwrap();
    populate(&sqlite);
    sqlite.snapshot(&path).unwrap();

    let memory = MemoryStore::from_snapshot(&path).unwrap();
    assert_eq!(memory.get_manifest().unwrap(), Some(manifest(1)));
    assert_eq!(memory.signature_count().unwrap(), 2);
    assert_eq!(memory.get_bucket_members(0, 7).unwrap(), vec!["a", "b"]);
    assert_eq!(memory.get_bucket_members(1, 9).unwrap(), vec!["a"]);
}

#[test]
fn both_adapters_write_identical_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let from_sqlite = dir.path().join("sqlite.json");
    let from_memory = dir.path().join("memory.json");

    let sqlite = SqliteStore::open_in_memory().unwrap();
    populate(&sqlite);
    sqlite.snapshot(&from_sqlite).unwrap();

    let memory = MemoryStore::new();
    populate(&memory);
    memory.snapshot(&from_memory).unwrap();

    assert_eq!(
        IndexSnapshot::read_from(&from_sqlite).unwrap(),
        IndexSnapshot::read_from(&from_memory).unwrap()
    );
}

#[test]
fn loading_merges_with_existing_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    let source = MemoryStore::new();
    populate(&source);
    source.snapshot(&path).unwrap();

    let target = SqliteStore::open_in_memory().unwrap();
    target.put_manifest(&manifest(1)).unwrap();
    target
        .index_document("c", &Signature::new(vec![1, 2, 0, 0]), &[7, 10])
        .unwrap();
    target.load_snapshot(&path).unwrap();

    assert_eq!(target.signature_count().unwrap(), 3);
    assert_eq!(target.get_bucket_members(0, 7).unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn snapshot_with_other_manifest_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    let source = MemoryStore::new();
    populate(&source);
    source.snapshot(&path).unwrap();

    let target = MemoryStore::new();
    target.put_manifest(&manifest(99)).unwrap();
    let err = target.load_snapshot(&path).unwrap_err();
    assert!(matches!(err, StorageError::SnapshotFailed { .. }));
}

#[test]
fn unreadable_snapshot_is_snapshot_failed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = MemoryStore::from_snapshot(&path).err().unwrap();
    assert!(matches!(err, StorageError::SnapshotFailed { .. }));
}
