//! Local persistence for archives, jobs and their version snapshots.
//!
//! Everything lives in a single `SQLite` file:
//!
//! ```text
//! archive   (id, title)
//! job       (id, archive_id, title, date, time, published, last_modified)
//! version   (entity_kind, record_id, revision, author, data, digest, changed, created_at)
//! ```
//!
//! Instants are stored as RFC 3339 text. The connection sits behind a mutex,
//! so every method is one atomic step with respect to other callers sharing
//! the same `Storage`.

mod archive;
mod record;
mod version;

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use jiff::Timestamp;
use rusqlite::Connection;

use crate::model::{ArchiveId, RecordId};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("job item not found: {0}")]
    RecordNotFound(RecordId),

    #[error("job archive not found: {0}")]
    ArchiveNotFound(ArchiveId),

    #[error("job archive already exists: {0}")]
    ArchiveAlreadyExists(ArchiveId),

    #[error("job archive id {0} is reserved")]
    ReservedArchiveId(ArchiveId),

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS archive (
        id    INTEGER PRIMARY KEY,
        title TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS job (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        archive_id    INTEGER NOT NULL REFERENCES archive (id),
        title         TEXT NOT NULL,
        date          TEXT NOT NULL,
        time          TEXT NOT NULL,
        published     INTEGER NOT NULL DEFAULT 0,
        last_modified TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS job_archive ON job (archive_id);

    CREATE TABLE IF NOT EXISTS version (
        entity_kind TEXT NOT NULL,
        record_id   INTEGER NOT NULL,
        revision    INTEGER NOT NULL,
        author      TEXT NOT NULL,
        data        TEXT NOT NULL,
        digest      TEXT NOT NULL,
        changed     INTEGER NOT NULL,
        created_at  TEXT NOT NULL,
        PRIMARY KEY (entity_kind, record_id, revision)
    );
";

/// `SQLite`-backed storage for jobs.
#[derive(Debug)]
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Opens (or creates) the database at `path` and ensures the schema.
    ///
    /// The parent directory is created if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Returns the default database path: `~/.jobdesk/jobs.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".jobdesk").join("jobs.sqlite"))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn parse_timestamp(column: &str, value: &str) -> Result<Timestamp> {
    value
        .parse::<Timestamp>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}
