//! Contract tests run against both persistence adapters.

use neardup_core::errors::StorageError;
use neardup_core::traits::PersistenceAdapter;
use neardup_core::types::{IndexManifest, Signature};
use neardup_storage::{MemoryStore, SqliteStore};

fn manifest() -> IndexManifest {
    IndexManifest {
        shingle_width: 3,
        shingle_seed: 0,
        lowercase: true,
        strip_punctuation: true,
        num_perm: 4,
        minhash_seed: 1,
        bands: 2,
        rows: 2,
    }
}

fn sig(values: &[u64]) -> Signature {
    Signature::new(values.to_vec())
}

fn stores() -> Vec<(&'static str, Box<dyn PersistenceAdapter>)> {
    vec![
        ("memory", Box::new(MemoryStore::new())),
        ("sqlite", Box::new(SqliteStore::open_in_memory().unwrap())),
    ]
}

#[test]
fn signature_is_write_once() {
    for (name, store) in stores() {
        let a = sig(&[1, 2, 3, 4]);
        store.put_signature("a", &a).unwrap();
        // identical rewrite is a no-op
        store.put_signature("a", &a).unwrap();
        assert_eq!(store.get_signature("a").unwrap(), Some(a.clone()), "{name}");

        let err = store.put_signature("a", &sig(&[9, 9, 9, 9])).unwrap_err();
        assert!(matches!(err, StorageError::WriteConflict { ref doc_id } if doc_id == "a"), "{name}");
        assert_eq!(store.get_signature("a").unwrap(), Some(a), "{name}");
        assert_eq!(store.signature_count().unwrap(), 1, "{name}");
    }
}

#[test]
fn missing_signature_is_none() {
    for (name, store) in stores() {
        assert_eq!(store.get_signature("nope").unwrap(), None, "{name}");
    }
}

#[test]
fn bucket_membership_is_a_sorted_set() {
    for (name, store) in stores() {
        store.put_bucket_member(0, u64::MAX, "c").unwrap();
        store.put_bucket_member(0, u64::MAX, "a").unwrap();
        store.put_bucket_member(0, u64::MAX, "c").unwrap();
        store.put_bucket_member(0, u64::MAX, "b").unwrap();
        assert_eq!(
            store.get_bucket_members(0, u64::MAX).unwrap(),
            vec!["a", "b", "c"],
            "{name}"
        );
        assert!(store.get_bucket_members(1, u64::MAX).unwrap().is_empty(), "{name}");
    }
}

#[test]
fn index_document_writes_signature_and_every_band() {
    for (name, store) in stores() {
        let s = sig(&[1, 2, 3, 4]);
        store.index_document("doc", &s, &[10, 20]).unwrap();
        assert_eq!(store.get_signature("doc").unwrap(), Some(s), "{name}");
        assert_eq!(store.get_bucket_members(0, 10).unwrap(), vec!["doc"], "{name}");
        assert_eq!(store.get_bucket_members(1, 20).unwrap(), vec!["doc"], "{name}");
    }
}

#[test]
fn conflicting_index_document_leaves_buckets_untouched_in_sqlite() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.index_document("doc", &sig(&[1, 2, 3, 4]), &[10, 20]).unwrap();
    let err = store
        .index_document("doc", &sig(&[5, 6, 7, 8]), &[30, 40])
        .unwrap_err();
    assert!(matches!(err, StorageError::WriteConflict { .. }));
    assert!(store.get_bucket_members(0, 30).unwrap().is_empty());
}

#[test]
fn manifest_round_trips_and_clear_empties_everything() {
    for (name, store) in stores() {
        assert_eq!(store.get_manifest().unwrap(), None, "{name}");
        store.put_manifest(&manifest()).unwrap();
        assert_eq!(store.get_manifest().unwrap(), Some(manifest()), "{name}");

        store.index_document("doc", &sig(&[1, 2, 3, 4]), &[10, 20]).unwrap();
        store.clear().unwrap();
        assert_eq!(store.get_manifest().unwrap(), None, "{name}");
        assert_eq!(store.signature_count().unwrap(), 0, "{name}");
        assert!(store.get_bucket_members(0, 10).unwrap().is_empty(), "{name}");
    }
}

#[test]
fn concurrent_writers_merge_by_union() {
    let store = std::sync::Arc::new(MemoryStore::new());
    std::thread::scope(|scope| {
        for t in 0..8 {
            let store = store.clone();
            scope.spawn(move || {
                for i in 0..50 {
                    let id = format!("t{t}-d{i}");
                    store.index_document(&id, &sig(&[t, i, 0, 0]), &[1, 2]).unwrap();
                }
            });
        }
    });
    assert_eq!(store.signature_count().unwrap(), 400);
    assert_eq!(store.get_bucket_members(0, 1).unwrap().len(), 400);
}

#[test]
fn sqlite_file_index_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.db");
    {
        let store = SqliteStore::open(&path).unwrap();
        store.put_manifest(&manifest()).unwrap();
        store.index_document("doc", &sig(&[1, 2, 3, 4]), &[10, 20]).unwrap();
        store.checkpoint().unwrap();
    }
    let store = SqliteStore::open_existing(&path).unwrap();
    assert_eq!(store.get_manifest().unwrap(), Some(manifest()));
    assert_eq!(store.get_bucket_members(1, 20).unwrap(), vec!["doc"]);
}

#[test]
fn open_existing_on_missing_file_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = SqliteStore::open_existing(&dir.path().join("absent.db"))
        .err()
        .unwrap();
    assert!(matches!(err, StorageError::Unavailable { .. }));
}

#[test]
fn open_existing_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.db");
    {
        let store = SqliteStore::open(&path).unwrap();
        store.put_manifest(&manifest()).unwrap();
        store.put_signature("doc", &sig(&[1, 2, 3, 4])).unwrap();
    }

    let store = SqliteStore::open_existing(&path).unwrap();
    assert!(store.is_read_only());
    let err = store.put_signature("new", &sig(&[5, 6, 7, 8])).unwrap_err();
    assert!(matches!(err, StorageError::Unavailable { .. }));
    assert!(store.clear().is_err());
    assert_eq!(store.signature_count().unwrap(), 1);
}

#[test]
fn open_existing_leaves_foreign_databases_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("other.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE notes (body TEXT);").unwrap();
    }

    let err = SqliteStore::open_existing(&path).err().unwrap();
    assert!(matches!(err, StorageError::Unavailable { .. }));

    let conn = rusqlite::Connection::open(&path).unwrap();
    let version: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap();
    assert_eq!(version, 0);
    let tables: i64 = conn
        .query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'signatures'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 0);
}
