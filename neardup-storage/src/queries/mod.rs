//! Query modules, one per table.

pub mod buckets;
pub mod manifest;
pub mod signatures;

use neardup_core::errors::StorageError;
use rusqlite::Connection;

use crate::sqlite_err;

/// Delete every row from every index table.
pub fn clear_all(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        DELETE FROM bucket_members;
        DELETE FROM signatures;
        DELETE FROM index_manifest;
        ",
    )
    .map_err(sqlite_err("clear index"))
}

pub(crate) fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
