//! Archives: the containers jobs are filed under.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveId(pub i64);

impl ArchiveId {
    /// Reserved id no archive ever carries.
    ///
    /// A principal without any grants is scoped to this id alone, which
    /// denies every archive-scoped operation.
    pub const NONE: Self = Self(0);
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A grouping container for job records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    pub id: ArchiveId,
    pub title: String,
}
