//! Read-only connections for bucket and signature lookups.
//!
//! Candidate search fans out over rayon, so several threads read at once.
//! A caller takes the first idle connection and only waits when every one
//! is busy.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, TryLockError};

use neardup_core::errors::StorageError;
use rusqlite::{Connection, OpenFlags};

use super::pragmas::apply_read_pragmas;

const FALLBACK_READERS: usize = 4;
const MAX_READERS: usize = 8;

pub struct ReadPool {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ReadPool {
    /// Open `readers` query-only connections to `path`, clamped to 1..=8.
    pub fn open(path: &Path, readers: usize) -> Result<Self, StorageError> {
        let readers = readers.clamp(1, MAX_READERS);
        let connections = (0..readers)
            .map(|_| open_reader(path).map(Mutex::new))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(path = %path.display(), readers, "opened read pool");
        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    /// Run `f` on an idle reader, scanning from a rotating start so load
    /// spreads evenly. Blocks on the starting reader when none is idle.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let n = self.connections.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed) % n;
        for offset in 0..n {
            match self.connections[(start + offset) % n].try_lock() {
                Ok(guard) => return f(&guard),
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(_)) => return Err(poisoned()),
            }
        }
        let guard = self.connections[start].lock().map_err(|_| poisoned())?;
        f(&guard)
    }

    /// One reader per core, capped.
    pub fn default_size() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(FALLBACK_READERS)
            .clamp(1, MAX_READERS)
    }
}

fn open_reader(path: &Path) -> Result<Connection, StorageError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| StorageError::Unavailable {
        message: format!("open reader on {}: {e}", path.display()),
    })?;
    apply_read_pragmas(&conn)?;
    Ok(conn)
}

fn poisoned() -> StorageError {
    StorageError::Unavailable {
        message: "read pool lock poisoned".to_string(),
    }
}
