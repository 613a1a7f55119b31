//! Principals: the identities acting on jobs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{ArchiveId, EntityKind};

/// The acting identity and its grants.
///
/// Grants are normalized on construction: a non-administrator without any
/// archive grant is scoped to [`ArchiveId::NONE`] so that every
/// archive-scoped check denies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    name: String,
    administrator: bool,
    archives: BTreeSet<ArchiveId>,

    /// Field grants in `<entity-kind>::<field>` form, e.g. `job::published`.
    fields: BTreeSet<String>,
}

impl Principal {
    /// An administrator: bypasses every archive and field check.
    pub fn administrator(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            administrator: true,
            archives: BTreeSet::new(),
            fields: BTreeSet::new(),
        }
    }

    /// A regular principal scoped to the given archives and fields.
    pub fn scoped<A, F>(name: impl Into<String>, archives: A, fields: F) -> Self
    where
        A: IntoIterator<Item = ArchiveId>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        let mut archives: BTreeSet<ArchiveId> = archives.into_iter().collect();
        if archives.is_empty() {
            archives.insert(ArchiveId::NONE);
        }
        Self {
            name: name.into(),
            administrator: false,
            archives,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_administrator(&self) -> bool {
        self.administrator
    }

    /// The archives this principal may operate within.
    ///
    /// Never empty for a non-administrator. Empty for administrators, who
    /// are not scoped at all.
    pub fn permitted_archives(&self) -> &BTreeSet<ArchiveId> {
        &self.archives
    }

    /// Whether `archive` is within this principal's scope.
    ///
    /// The sentinel archive is never in scope for a non-administrator, even
    /// though it is what an ungranted principal's set holds.
    pub fn may_access_archive(&self, archive: ArchiveId) -> bool {
        self.administrator || (archive != ArchiveId::NONE && self.archives.contains(&archive))
    }

    /// Whether this principal may write `field` on entities of `kind`.
    pub fn may_edit_field(&self, kind: EntityKind, field: &str) -> bool {
        self.administrator || self.fields.contains(&field_key(kind, field))
    }
}

/// The grant key for a field: `<entity-kind>::<field>`.
pub fn field_key(kind: EntityKind, field: &str) -> String {
    format!("{kind}::{field}")
}
