//! Job storage: insert, load, list, and the narrow updates the workflows
//! issue.

use std::collections::BTreeSet;

use jiff::Timestamp;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::model::{ArchiveId, NewRecord, Record, RecordId};

use super::{Result, Storage, StorageError, archive::archive_exists, parse_timestamp};

const COLUMNS: &str = "id, archive_id, title, date, time, published, last_modified";

impl Storage {
    /// Inserts a new job under an existing archive and returns it.
    pub fn insert_record(&self, new: &NewRecord) -> Result<Record> {
        let conn = self.conn()?;
        if !archive_exists(&conn, new.archive_id)? {
            return Err(StorageError::ArchiveNotFound(new.archive_id));
        }
        conn.execute(
            "INSERT INTO job (archive_id, title, date, time, published, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                new.archive_id.0,
                &new.title,
                new.date.to_string(),
                new.time.to_string(),
                new.published,
                Timestamp::now().to_string(),
            ],
        )?;
        let id = RecordId(conn.last_insert_rowid());
        load_record(&conn, id)
    }

    pub fn get_record(&self, id: RecordId) -> Result<Record> {
        let conn = self.conn()?;
        load_record(&conn, id)
    }

    /// Resolves the archive a job is filed under.
    pub fn owning_archive(&self, id: RecordId) -> Result<ArchiveId> {
        let conn = self.conn()?;
        conn.query_row("SELECT archive_id FROM job WHERE id = ?1", [id.0], |row| {
            row.get(0).map(ArchiveId)
        })
        .optional()?
        .ok_or(StorageError::RecordNotFound(id))
    }

    /// Sets the published flag and refreshes `last_modified`.
    ///
    /// One conditional update keyed by id; no other column is touched.
    pub fn update_published(&self, id: RecordId, published: bool) -> Result<Record> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE job SET published = ?1, last_modified = ?2 WHERE id = ?3",
            rusqlite::params![published, Timestamp::now().to_string(), id.0],
        )?;
        if rows == 0 {
            return Err(StorageError::RecordNotFound(id));
        }
        load_record(&conn, id)
    }

    /// Replaces a job's schedule and refreshes `last_modified`.
    pub fn update_schedule(&self, id: RecordId, date: Timestamp, time: Timestamp) -> Result<Record> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE job SET date = ?1, time = ?2, last_modified = ?3 WHERE id = ?4",
            rusqlite::params![
                date.to_string(),
                time.to_string(),
                Timestamp::now().to_string(),
                id.0
            ],
        )?;
        if rows == 0 {
            return Err(StorageError::RecordNotFound(id));
        }
        load_record(&conn, id)
    }

    /// Ids of all jobs filed under `archive`.
    pub fn record_ids_in_archive(&self, archive: ArchiveId) -> Result<BTreeSet<RecordId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id FROM job WHERE archive_id = ?1")?;
        let ids = stmt.query_map([archive.0], |row| row.get(0).map(RecordId))?;
        Ok(ids.collect::<rusqlite::Result<BTreeSet<_>>>()?)
    }

    /// Lists the jobs of an archive, latest schedule first.
    pub fn list_records(&self, archive: ArchiveId) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM job WHERE archive_id = ?1 ORDER BY date DESC, id DESC"
        ))?;
        let rows = stmt.query_map([archive.0], RawRecord::from_row)?;
        let records = rows
            .map(|raw| raw?.into_record())
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }
}

/// Reads one job row from an open connection.
pub(super) fn load_record(conn: &Connection, id: RecordId) -> Result<Record> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM job WHERE id = ?1"),
        [id.0],
        RawRecord::from_row,
    )
    .optional()?
    .ok_or(StorageError::RecordNotFound(id))?
    .into_record()
}

/// Column values as read, before timestamps are parsed.
struct RawRecord {
    id: i64,
    archive_id: i64,
    title: String,
    date: String,
    time: String,
    published: bool,
    last_modified: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            archive_id: row.get(1)?,
            title: row.get(2)?,
            date: row.get(3)?,
            time: row.get(4)?,
            published: row.get(5)?,
            last_modified: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<Record> {
        Ok(Record {
            id: RecordId(self.id),
            archive_id: ArchiveId(self.archive_id),
            title: self.title,
            date: parse_timestamp("date", &self.date)?,
            time: parse_timestamp("time", &self.time)?,
            published: self.published,
            last_modified: parse_timestamp("last_modified", &self.last_modified)?,
        })
    }
}
