//! Version snapshots: immutable copies of a record after a mutation.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{EntityKind, Record, RecordId};

/// A full copy of a record's fields as of one committed mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    pub entity_kind: EntityKind,
    pub record_id: RecordId,

    /// 1-based, gapless, strictly increasing per record.
    pub revision: u64,

    /// Name of the principal whose mutation produced this snapshot.
    pub author: String,

    pub data: Record,

    /// Hex SHA-256 of the serialized `data`.
    pub digest: String,

    /// Whether `data` differs from the state captured before the mutation.
    pub changed: bool,

    pub created_at: Timestamp,
}
