//! Version tracking around a mutation.
//!
//! A [`VersionScope`] is opened before a record is mutated and committed
//! afterwards, appending one snapshot of the record as stored at commit
//! time. Snapshots are audit data: a failing commit is logged and swallowed,
//! never allowed to undo or fail the mutation it describes.
//!
//! A scope that saw a write but was never committed (a later step returned
//! early) commits when dropped. A scope that never saw a write appends
//! nothing.

use tracing::{debug, warn};

use crate::model::{EntityKind, Record, RecordId, VersionSnapshot};
use crate::storage::Storage;

/// An open version bracket for one record.
#[derive(Debug)]
pub struct VersionScope<'a> {
    storage: &'a Storage,
    kind: EntityKind,
    id: RecordId,
    author: String,
    baseline: Option<Record>,
    written: bool,
    closed: bool,
}

impl<'a> VersionScope<'a> {
    /// Opens a scope for an existing record, remembering its current state.
    pub fn initialize(storage: &'a Storage, kind: EntityKind, record: &Record, author: &str) -> Self {
        debug!(kind = %kind, record = %record.id, "version scope opened");
        Self {
            storage,
            kind,
            id: record.id,
            author: author.to_string(),
            baseline: Some(record.clone()),
            written: false,
            closed: false,
        }
    }

    /// Opens a scope for a record that was just inserted.
    ///
    /// There is no prior state, so the first snapshot always counts as a
    /// change and the insert itself counts as the write.
    pub fn created(storage: &'a Storage, kind: EntityKind, id: RecordId, author: &str) -> Self {
        debug!(kind = %kind, record = %id, "version scope opened for new record");
        Self {
            storage,
            kind,
            id,
            author: author.to_string(),
            baseline: None,
            written: true,
            closed: false,
        }
    }

    /// Records that the mutation reached storage; a snapshot is now owed.
    pub fn mark_written(&mut self) {
        self.written = true;
    }

    /// Appends the snapshot. Returns `None` when nothing was written or the
    /// append failed.
    pub fn commit(mut self) -> Option<VersionSnapshot> {
        self.close()
    }

    fn close(&mut self) -> Option<VersionSnapshot> {
        if self.closed {
            return None;
        }
        self.closed = true;

        if !self.written {
            debug!(kind = %self.kind, record = %self.id, "nothing written, no snapshot");
            return None;
        }

        match self
            .storage
            .append_version(self.kind, self.id, &self.author, self.baseline.as_ref())
        {
            Ok(snapshot) => {
                debug!(
                    kind = %self.kind,
                    record = %self.id,
                    revision = snapshot.revision,
                    "version committed"
                );
                Some(snapshot)
            }
            Err(e) => {
                warn!(kind = %self.kind, record = %self.id, error = %e, "failed to commit version");
                None
            }
        }
    }
}

impl Drop for VersionScope<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::testing::{add_archive, add_job, test_storage};

    #[test]
    fn commit_appends_after_write() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let job = add_job(&storage, 1, "Welder");

        let mut scope = VersionScope::initialize(&storage, EntityKind::Job, &job, "editor");
        storage.update_published(job.id, true).unwrap();
        scope.mark_written();
        let snapshot = scope.commit().unwrap();

        assert_eq!(snapshot.revision, 1);
        assert!(snapshot.data.published);
        assert!(snapshot.changed);
        assert_eq!(snapshot.author, "editor");
    }

    #[test]
    fn commit_without_write_is_a_no_op() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let job = add_job(&storage, 1, "Welder");

        let scope = VersionScope::initialize(&storage, EntityKind::Job, &job, "editor");

        assert!(scope.commit().is_none());
        assert!(storage.versions(EntityKind::Job, job.id).unwrap().is_empty());
    }

    #[test]
    fn drop_after_write_commits() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let job = add_job(&storage, 1, "Welder");

        {
            let mut scope = VersionScope::initialize(&storage, EntityKind::Job, &job, "editor");
            scope.mark_written();
        }

        assert_eq!(storage.versions(EntityKind::Job, job.id).unwrap().len(), 1);
    }

    #[test]
    fn drop_without_write_appends_nothing() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let job = add_job(&storage, 1, "Welder");

        drop(VersionScope::initialize(&storage, EntityKind::Job, &job, "editor"));

        assert!(storage.versions(EntityKind::Job, job.id).unwrap().is_empty());
    }

    #[test]
    fn failed_append_is_swallowed() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let job = add_job(&storage, 1, "Welder");

        // The record id points nowhere, so the append cannot read a state.
        let mut scope = VersionScope::created(&storage, EntityKind::Job, RecordId(999), "editor");
        scope.mark_written();

        assert!(scope.commit().is_none());
        assert!(storage.versions(EntityKind::Job, job.id).unwrap().is_empty());
    }

    #[test]
    fn created_scope_needs_no_explicit_write() {
        let (_dir, storage) = test_storage();
        add_archive(&storage, 1);
        let job = add_job(&storage, 1, "Welder");

        let snapshot = VersionScope::created(&storage, EntityKind::Job, job.id, "editor")
            .commit()
            .unwrap();

        assert_eq!(snapshot.revision, 1);
        assert!(snapshot.changed);
    }
}
