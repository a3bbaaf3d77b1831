//! Queries for the signatures table. Rows are written once.

use neardup_core::errors::StorageError;
use neardup_core::types::Signature;
use rusqlite::{params, Connection, OptionalExtension};

use super::now_unix;
use crate::sqlite_err;

/// Insert a signature unless one exists. An existing row with different
/// bytes is a `WriteConflict`; an identical one is left alone.
pub fn insert_once(
    conn: &Connection,
    doc_id: &str,
    signature: &Signature,
) -> Result<(), StorageError> {
    let bytes = signature.to_bytes();
    let inserted = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO signatures (doc_id, num_perm, signature, indexed_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .and_then(|mut stmt| {
            stmt.execute(params![doc_id, signature.len() as i64, bytes, now_unix()])
        })
        .map_err(sqlite_err("insert signature"))?;

    if inserted == 0 {
        let stored: Vec<u8> = conn
            .query_row(
                "SELECT signature FROM signatures WHERE doc_id = ?1",
                params![doc_id],
                |row| row.get(0),
            )
            .map_err(sqlite_err("read existing signature"))?;
        if stored != bytes {
            return Err(StorageError::WriteConflict {
                doc_id: doc_id.to_string(),
            });
        }
    }
    Ok(())
}

pub fn get(conn: &Connection, doc_id: &str) -> Result<Option<Signature>, StorageError> {
    let bytes: Option<Vec<u8>> = conn
        .prepare_cached("SELECT signature FROM signatures WHERE doc_id = ?1")
        .and_then(|mut stmt| stmt.query_row(params![doc_id], |row| row.get(0)).optional())
        .map_err(sqlite_err("get signature"))?;

    bytes.map(|b| decode(doc_id, &b)).transpose()
}

pub fn count(conn: &Connection) -> Result<usize, StorageError> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM signatures", [], |row| row.get(0))
        .map_err(sqlite_err("count signatures"))?;
    Ok(n as usize)
}

/// Every stored signature, ordered by doc id.
pub fn all(conn: &Connection) -> Result<Vec<(String, Signature)>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT doc_id, signature FROM signatures ORDER BY doc_id")
        .map_err(sqlite_err("prepare signature scan"))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?)))
        .map_err(sqlite_err("scan signatures"))?;

    let mut out = Vec::new();
    for row in rows {
        let (doc_id, bytes) = row.map_err(sqlite_err("read signature row"))?;
        let signature = decode(&doc_id, &bytes)?;
        out.push((doc_id, signature));
    }
    Ok(out)
}

fn decode(doc_id: &str, bytes: &[u8]) -> Result<Signature, StorageError> {
    Signature::from_bytes(bytes).ok_or_else(|| StorageError::CorruptRecord {
        message: format!("signature for {doc_id} has {} bytes", bytes.len()),
    })
}
