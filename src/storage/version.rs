//! Version storage: the append-only snapshot table.
//!
//! Revisions are assigned inside the insert itself, so two writers can never
//! claim the same number and no revision is skipped.

use jiff::Timestamp;
use sha2::{Digest, Sha256};

use crate::model::{EntityKind, Record, RecordId, VersionSnapshot};

use super::{Result, Storage, StorageError, parse_timestamp, record::load_record};

impl Storage {
    /// Appends a snapshot of the record as it is stored right now.
    ///
    /// `baseline` is the state captured before the mutation; the snapshot
    /// is flagged `changed` when the content differs from it (or when there
    /// is no baseline at all).
    pub fn append_version(
        &self,
        kind: EntityKind,
        id: RecordId,
        author: &str,
        baseline: Option<&Record>,
    ) -> Result<VersionSnapshot> {
        let conn = self.conn()?;
        let data = load_record(&conn, id)?;
        let json = serde_json::to_string(&data)?;
        let digest = hex::encode(Sha256::digest(json.as_bytes()));
        let changed = baseline.is_none_or(|before| !before.same_fields(&data));
        let created_at = Timestamp::now();

        let revision: i64 = conn.query_row(
            "INSERT INTO version
                 (entity_kind, record_id, revision, author, data, digest, changed, created_at)
             SELECT ?1, ?2, COALESCE(MAX(revision), 0) + 1, ?3, ?4, ?5, ?6, ?7
             FROM version WHERE entity_kind = ?1 AND record_id = ?2
             RETURNING revision",
            rusqlite::params![
                kind.as_str(),
                id.0,
                author,
                &json,
                &digest,
                changed,
                created_at.to_string(),
            ],
            |row| row.get(0),
        )?;

        Ok(VersionSnapshot {
            entity_kind: kind,
            record_id: id,
            revision: to_revision(revision)?,
            author: author.to_string(),
            data,
            digest,
            changed,
            created_at,
        })
    }

    /// Loads all snapshots of a record, oldest revision first.
    pub fn versions(&self, kind: EntityKind, id: RecordId) -> Result<Vec<VersionSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT revision, author, data, digest, changed, created_at
             FROM version WHERE entity_kind = ?1 AND record_id = ?2
             ORDER BY revision",
        )?;
        let rows = stmt.query_map(rusqlite::params![kind.as_str(), id.0], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut snapshots = Vec::new();
        for row in rows {
            let (revision, author, data, digest, changed, created_at) = row?;
            snapshots.push(VersionSnapshot {
                entity_kind: kind,
                record_id: id,
                revision: to_revision(revision)?,
                author,
                data: serde_json::from_str(&data)?,
                digest,
                changed,
                created_at: parse_timestamp("created_at", &created_at)?,
            });
        }
        Ok(snapshots)
    }
}

fn to_revision(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| StorageError::Corrupt(format!("invalid revision: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::testing::{add_archive, add_job, test_storage};

    #[test]
    fn revisions_start_at_one_and_increase() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let job = add_job(&storage, 1, "Welder");

        let first = storage
            .append_version(EntityKind::Job, job.id, "editor", None)
            .unwrap();
        let second = storage
            .append_version(EntityKind::Job, job.id, "editor", Some(&job))
            .unwrap();

        assert_eq!(first.revision, 1);
        assert_eq!(second.revision, 2);
    }

    #[test]
    fn revisions_are_scoped_per_record() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let a = add_job(&storage, 1, "A");
        let b = add_job(&storage, 1, "B");

        storage
            .append_version(EntityKind::Job, a.id, "editor", None)
            .unwrap();
        let snapshot = storage
            .append_version(EntityKind::Job, b.id, "editor", None)
            .unwrap();

        assert_eq!(snapshot.revision, 1);
    }

    #[test]
    fn snapshot_captures_stored_state() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let job = add_job(&storage, 1, "Welder");
        storage.update_published(job.id, true).unwrap();

        let snapshot = storage
            .append_version(EntityKind::Job, job.id, "editor", Some(&job))
            .unwrap();

        assert!(snapshot.data.published);
        assert!(snapshot.changed);
        assert_eq!(snapshot.digest.len(), 64);
    }

    #[test]
    fn unchanged_content_is_flagged() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let job = add_job(&storage, 1, "Welder");

        let snapshot = storage
            .append_version(EntityKind::Job, job.id, "editor", Some(&job))
            .unwrap();

        assert!(!snapshot.changed);
    }

    #[test]
    fn versions_round_trip_in_order() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let job = add_job(&storage, 1, "Welder");

        storage
            .append_version(EntityKind::Job, job.id, "alice", None)
            .unwrap();
        storage.update_published(job.id, true).unwrap();
        storage
            .append_version(EntityKind::Job, job.id, "bob", Some(&job))
            .unwrap();

        let versions = storage.versions(EntityKind::Job, job.id).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].author, "alice");
        assert!(!versions[0].data.published);
        assert_eq!(versions[1].author, "bob");
        assert!(versions[1].data.published);
    }

    #[test]
    fn append_for_missing_record_fails_without_writing() {
        let (_dir, storage) = test_storage();

        let err = storage
            .append_version(EntityKind::Job, RecordId(3), "editor", None)
            .unwrap_err();

        assert!(matches!(err, StorageError::RecordNotFound(RecordId(3))));
        assert!(storage.versions(EntityKind::Job, RecordId(3)).unwrap().is_empty());
    }
}
