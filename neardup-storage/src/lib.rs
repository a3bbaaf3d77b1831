//! neardup-storage: persistence adapters for the banding index.
//!
//! Two `PersistenceAdapter` implementations share one portable snapshot
//! format, so an index built in SQLite can be restored into memory and the
//! other way round.

pub mod connection;
pub mod memory;
pub mod migrations;
pub mod queries;
pub mod snapshot;
pub mod sqlite_store;

pub use memory::MemoryStore;
pub use snapshot::IndexSnapshot;
pub use sqlite_store::SqliteStore;

use neardup_core::errors::StorageError;

/// Map a rusqlite error into `StorageError::SqliteError` with context.
pub(crate) fn sqlite_err(context: &str) -> impl Fn(rusqlite::Error) -> StorageError + '_ {
    move |e| StorageError::SqliteError {
        message: format!("{context}: {e}"),
    }
}
