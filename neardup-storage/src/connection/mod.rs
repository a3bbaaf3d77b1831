//! Connection management: one serialized writer plus pooled readers.

pub mod pool;
pub mod pragmas;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use neardup_core::errors::StorageError;
use rusqlite::{Connection, OpenFlags};

use self::pool::ReadPool;
use self::pragmas::{apply_pragmas, apply_read_pragmas};
use crate::migrations;
use crate::sqlite_err;

/// Owns the write connection and, for file databases, a read pool.
///
/// An in-memory database cannot be shared across connections, so reads go
/// through the writer there.
pub struct ConnectionManager {
    writer: Mutex<Connection>,
    readers: Option<ReadPool>,
    path: Option<PathBuf>,
    read_only: bool,
}

impl ConnectionManager {
    /// Open (creating if needed) the database at `path`, apply pragmas and
    /// run migrations.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let writer = Connection::open(path).map_err(|e| StorageError::Unavailable {
            message: format!("open {}: {e}", path.display()),
        })?;
        Self::from_writer(writer, Some(path))
    }

    /// Open an existing index without changing it: no pragmas that write,
    /// no migrations, and `query_only` on every connection. Fails with
    /// `Unavailable` when the file is not a neardup index at the current
    /// schema version.
    pub fn open_read_only(path: &Path) -> Result<Self, StorageError> {
        let unavailable = |message: String| StorageError::Unavailable {
            message: format!("{}: {message}", path.display()),
        };
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unavailable(e.to_string()))?;

        let version = migrations::current_version(&conn).map_err(|e| unavailable(e.to_string()))?;
        match version {
            0 => return Err(unavailable("not a neardup index".to_string())),
            v if v < migrations::LATEST_VERSION => {
                return Err(unavailable(format!(
                    "index schema v{v} is older than v{}; run a build to migrate it",
                    migrations::LATEST_VERSION
                )))
            }
            v if v > migrations::LATEST_VERSION => {
                return Err(unavailable(format!(
                    "index schema v{v} is newer than this binary supports (v{})",
                    migrations::LATEST_VERSION
                )))
            }
            _ => {}
        }
        apply_read_pragmas(&conn)?;

        Ok(Self {
            writer: Mutex::new(conn),
            readers: Some(ReadPool::open(path, ReadPool::default_size())?),
            path: Some(path.to_path_buf()),
            read_only: true,
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(|e| StorageError::Unavailable {
            message: format!("open in-memory database: {e}"),
        })?;
        Self::from_writer(writer, None)
    }

    fn from_writer(writer: Connection, path: Option<&Path>) -> Result<Self, StorageError> {
        apply_pragmas(&writer)?;
        migrations::run_migrations(&writer)?;

        let readers = match path {
            Some(p) => Some(ReadPool::open(p, ReadPool::default_size())?),
            None => None,
        };

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            path: path.map(Path::to_path_buf),
            read_only: false,
        })
    }

    /// Execute a write operation on the serialized writer connection.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        if self.read_only {
            return Err(StorageError::Unavailable {
                message: "index was opened read-only".to_string(),
            });
        }
        self.with_primary(f)
    }

    /// The primary connection, read-only or not.
    fn with_primary<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self.writer.lock().map_err(|_| StorageError::Unavailable {
            message: "write lock poisoned".to_string(),
        })?;
        f(&guard)
    }

    /// Execute a read operation on a pooled connection.
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        match self.readers {
            Some(ref pool) => pool.with_conn(f),
            None => self.with_primary(f),
        }
    }

    /// WAL checkpoint (TRUNCATE), run after a build completes.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        if self.path.is_none() || self.read_only {
            return Ok(());
        }
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(sqlite_err("wal checkpoint"))
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Database file path, `None` for in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
