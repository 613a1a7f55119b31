//! Job records.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::ArchiveId;

/// Identifier of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One job listing item as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,

    /// The archive this job is filed under. Fixed once created.
    pub archive_id: ArchiveId,

    pub title: String,

    /// The scheduled day, carrying the scheduled time of day once reconciled.
    pub date: Timestamp,

    /// The scheduled time of day, anchored on 1970-01-01.
    pub time: Timestamp,

    /// Whether the job is visible.
    pub published: bool,

    /// Assigned by storage on every mutation.
    pub last_modified: Timestamp,
}

impl Record {
    /// Whether both records carry the same editable content.
    ///
    /// `last_modified` is ignored: it moves on every write.
    pub fn same_fields(&self, other: &Self) -> bool {
        self.id == other.id
            && self.archive_id == other.archive_id
            && self.title == other.title
            && self.date == other.date
            && self.time == other.time
            && self.published == other.published
    }
}

/// Field values for a job that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub archive_id: ArchiveId,
    pub title: String,
    pub date: Timestamp,
    pub time: Timestamp,
    pub published: bool,
}
