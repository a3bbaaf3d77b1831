//! Queries for the single-row index_manifest table.

use neardup_core::errors::StorageError;
use neardup_core::types::IndexManifest;
use rusqlite::{params, Connection, OptionalExtension};

use super::now_unix;
use crate::sqlite_err;

pub fn put(conn: &Connection, manifest: &IndexManifest) -> Result<(), StorageError> {
    let json = serde_json::to_string(manifest).map_err(|e| StorageError::CorruptRecord {
        message: format!("encode manifest: {e}"),
    })?;
    conn.execute(
        "INSERT OR REPLACE INTO index_manifest (id, manifest_json, created_at)
         VALUES (1, ?1, ?2)",
        params![json, now_unix()],
    )
    .map_err(sqlite_err("write manifest"))?;
    Ok(())
}

pub fn get(conn: &Connection) -> Result<Option<IndexManifest>, StorageError> {
    let json: Option<String> = conn
        .query_row(
            "SELECT manifest_json FROM index_manifest WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(sqlite_err("read manifest"))?;

    json.map(|j| {
        serde_json::from_str(&j).map_err(|e| StorageError::CorruptRecord {
            message: format!("decode manifest: {e}"),
        })
    })
    .transpose()
}
