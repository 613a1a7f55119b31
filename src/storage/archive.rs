//! Archive storage: create, load, and list archives.

use rusqlite::{Connection, OptionalExtension};

use crate::model::{Archive, ArchiveId};

use super::{Result, Storage, StorageError};

impl Storage {
    /// Creates an archive with an explicit id.
    pub fn create_archive(&self, archive: &Archive) -> Result<()> {
        if archive.id == ArchiveId::NONE {
            return Err(StorageError::ReservedArchiveId(archive.id));
        }
        let conn = self.conn()?;
        if archive_exists(&conn, archive.id)? {
            return Err(StorageError::ArchiveAlreadyExists(archive.id));
        }
        conn.execute(
            "INSERT INTO archive (id, title) VALUES (?1, ?2)",
            rusqlite::params![archive.id.0, &archive.title],
        )?;
        Ok(())
    }

    pub fn get_archive(&self, id: ArchiveId) -> Result<Archive> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, title FROM archive WHERE id = ?1",
            [id.0],
            |row| {
                Ok(Archive {
                    id: ArchiveId(row.get(0)?),
                    title: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or(StorageError::ArchiveNotFound(id))
    }

    /// Lists all archives ordered by id.
    pub fn list_archives(&self) -> Result<Vec<Archive>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, title FROM archive ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Archive {
                id: ArchiveId(row.get(0)?),
                title: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

pub(super) fn archive_exists(conn: &Connection, id: ArchiveId) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM archive WHERE id = ?1", [id.0], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}
