//! Queries for the bucket_members table.
//!
//! Bucket keys are u64 and SQLite integers are i64; keys are stored bit-cast.

use neardup_core::errors::StorageError;
use rusqlite::{params, Connection};

use crate::sqlite_err;

pub fn insert_member(
    conn: &Connection,
    band_index: u32,
    bucket_key: u64,
    doc_id: &str,
) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT OR IGNORE INTO bucket_members (band_index, bucket_key, doc_id)
         VALUES (?1, ?2, ?3)",
    )
    .and_then(|mut stmt| stmt.execute(params![band_index, bucket_key as i64, doc_id]))
    .map_err(sqlite_err("insert bucket member"))?;
    Ok(())
}

/// Members of one bucket, ordered by doc id.
pub fn members(
    conn: &Connection,
    band_index: u32,
    bucket_key: u64,
) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT doc_id FROM bucket_members
             WHERE band_index = ?1 AND bucket_key = ?2
             ORDER BY doc_id",
        )
        .map_err(sqlite_err("prepare bucket lookup"))?;
    let rows = stmt
        .query_map(params![band_index, bucket_key as i64], |row| row.get(0))
        .map_err(sqlite_err("bucket lookup"))?;
    rows.collect::<Result<Vec<String>, _>>()
        .map_err(sqlite_err("read bucket row"))
}

/// Every (band, key, doc_id) row ordered by band, key, doc id.
pub fn all(conn: &Connection) -> Result<Vec<(u32, u64, String)>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT band_index, bucket_key, doc_id FROM bucket_members
             ORDER BY band_index, bucket_key, doc_id",
        )
        .map_err(sqlite_err("prepare bucket scan"))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, i64>(1)? as u64,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(sqlite_err("scan buckets"))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(sqlite_err("read bucket row"))
}
