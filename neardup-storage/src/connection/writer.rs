//! Write connection utilities: BEGIN IMMEDIATE transactions.

use neardup_core::errors::StorageError;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::sqlite_err;

/// Run `f` inside a BEGIN IMMEDIATE transaction.
///
/// The write lock is taken at transaction start, so concurrent writers wait
/// on busy_timeout instead of failing mid-transaction with SQLITE_BUSY.
/// Dropping the transaction on an error rolls it back.
pub fn with_immediate_transaction<F, T>(conn: &Connection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(sqlite_err("failed to begin immediate transaction"))?;

    let result = f(&tx)?;

    tx.commit().map_err(sqlite_err("failed to commit"))?;
    Ok(result)
}
