//! Core data model for jobdesk.
//!
//! Jobs are scheduled listing records grouped into archives. Principals act
//! on them within the archives they are granted, and every mutation leaves a
//! version snapshot behind.

mod archive;
mod principal;
mod record;
mod snapshot;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use archive::{Archive, ArchiveId};
pub use principal::{Principal, field_key};
pub use record::{NewRecord, Record, RecordId};
pub use snapshot::VersionSnapshot;

/// The kind of entity a hook or version snapshot belongs to.
///
/// Closed set: each variant maps to one persistent table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A job listing record.
    Job,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Job => "job",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
