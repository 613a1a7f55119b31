//! Archive-scoped access control for job commands.
//!
//! Every inbound command is one variant of [`Command`]. [`authorize`] decides
//! whether a principal may run it; callers stop on [`Decision::Deny`].
//! Field-level grants are checked separately by [`authorize_field`].

use std::fmt;

use crate::model::{ArchiveId, EntityKind, Principal, RecordId, field_key};
use crate::storage::{self, Storage, StorageError};

/// Operations on a single job, resolved to its archive before checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOperation {
    Edit,
    Delete,
    Show,
    Toggle,
    Duplicate,
    Cut,
    Feature,
}

impl RecordOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Show => "show",
            Self::Toggle => "toggle",
            Self::Duplicate => "copy",
            Self::Cut => "cut",
            Self::Feature => "feature",
        }
    }
}

/// Operations on a whole archive's selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    Select,
    EditAll,
    DeleteAll,
    OverrideAll,
    CutAll,
    CopyAll,
}

impl BulkOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::EditAll => "editAll",
            Self::DeleteAll => "deleteAll",
            Self::OverrideAll => "overrideAll",
            Self::CutAll => "cutAll",
            Self::CopyAll => "copyAll",
        }
    }
}

/// A command against the job table, with its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Paste a previously cut or copied job. Always allowed.
    Paste,

    /// Create a job under `archive`.
    Create { archive: Option<ArchiveId> },

    /// Act on one job.
    Record {
        operation: RecordOperation,
        id: RecordId,
    },

    /// Act on the selection of one archive.
    Bulk {
        operation: BulkOperation,
        archive: ArchiveId,
    },

    /// No explicit operation: open an archive's listing.
    Browse { archive: ArchiveId },
}

/// Errors turning a raw command into a [`Command`].
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unrecognized operation \"{0}\"")]
    UnrecognizedOperation(String),

    #[error("operation \"{0}\" requires a job item id")]
    MissingId(&'static str),
}

impl Command {
    /// Builds a command from its string surface.
    ///
    /// `act` is the operation name; an absent or empty name means
    /// [`Command::Browse`]. `id` names the job for single-record operations
    /// and the archive for bulk operations and browsing. `pid` names the
    /// parent archive for `create`.
    pub fn parse(act: Option<&str>, id: Option<i64>, pid: Option<i64>) -> Result<Self, CommandError> {
        let archive = ArchiveId(id.unwrap_or(ArchiveId::NONE.0));
        let record = |operation: RecordOperation| {
            id.map(|id| Self::Record {
                operation,
                id: RecordId(id),
            })
            .ok_or(CommandError::MissingId(operation.as_str()))
        };
        let bulk = |operation| -> Result<Self, CommandError> { Ok(Self::Bulk { operation, archive }) };

        match act.unwrap_or_default() {
            "" => Ok(Self::Browse { archive }),
            "paste" => Ok(Self::Paste),
            "create" => Ok(Self::Create {
                archive: pid.map(ArchiveId),
            }),
            "edit" => record(RecordOperation::Edit),
            "delete" => record(RecordOperation::Delete),
            "show" => record(RecordOperation::Show),
            "toggle" => record(RecordOperation::Toggle),
            "copy" => record(RecordOperation::Duplicate),
            "cut" => record(RecordOperation::Cut),
            "feature" => record(RecordOperation::Feature),
            "select" => bulk(BulkOperation::Select),
            "editAll" => bulk(BulkOperation::EditAll),
            "deleteAll" => bulk(BulkOperation::DeleteAll),
            "overrideAll" => bulk(BulkOperation::OverrideAll),
            "cutAll" => bulk(BulkOperation::CutAll),
            "copyAll" => bulk(BulkOperation::CopyAll),
            other => Err(CommandError::UnrecognizedOperation(other.to_string())),
        }
    }

    /// The operation name, as it appears in messages.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Paste => "paste",
            Self::Create { .. } => "create",
            Self::Record { operation, .. } => operation.as_str(),
            Self::Bulk { operation, .. } => operation.as_str(),
            Self::Browse { .. } => "access",
        }
    }

    /// What the command acts on.
    pub fn target(&self) -> Target {
        match *self {
            Self::Paste => Target::Archive(None),
            Self::Create { archive } => Target::Archive(archive),
            Self::Record { id, .. } => Target::Record(id),
            Self::Bulk { archive, .. } | Self::Browse { archive } => Target::Archive(Some(archive)),
        }
    }
}

/// The object of a command, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Record(RecordId),
    Archive(Option<ArchiveId>),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(id) => write!(f, "job item ID {id}"),
            Self::Archive(Some(id)) => write!(f, "job archive ID {id}"),
            Self::Archive(None) => f.write_str("an unspecified job archive"),
        }
    }
}

/// Why a command was denied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenyReason {
    #[error("insufficient archive permission")]
    InsufficientArchivePermission,

    #[error("record not found")]
    RecordNotFound,

    #[error("field {field} not permitted")]
    FieldNotPermitted { field: String },
}

/// The outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// Resolves a job to the archive it is filed under.
pub trait RecordLookup {
    /// `None` when the job does not exist.
    fn archive_of(&self, id: RecordId) -> storage::Result<Option<ArchiveId>>;
}

impl RecordLookup for Storage {
    fn archive_of(&self, id: RecordId) -> storage::Result<Option<ArchiveId>> {
        match self.owning_archive(id) {
            Ok(archive) => Ok(Some(archive)),
            Err(StorageError::RecordNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Decides whether `principal` may run `command`.
///
/// Administrators are always allowed. Everyone else must hold the archive
/// the command resolves to. Only the lookup of a job's archive can fail.
pub fn authorize(
    principal: &Principal,
    command: &Command,
    records: &impl RecordLookup,
) -> storage::Result<Decision> {
    if principal.is_administrator() {
        return Ok(Decision::Allow);
    }

    let decision = match *command {
        Command::Paste => Decision::Allow,
        Command::Create { archive } => match archive {
            Some(archive) => archive_decision(principal, archive),
            None => Decision::Deny(DenyReason::InsufficientArchivePermission),
        },
        Command::Record { id, .. } => match records.archive_of(id)? {
            Some(archive) => archive_decision(principal, archive),
            None => Decision::Deny(DenyReason::RecordNotFound),
        },
        Command::Bulk { archive, .. } | Command::Browse { archive } => {
            archive_decision(principal, archive)
        }
    };
    Ok(decision)
}

/// Decides whether `principal` may write `field` on entities of `kind`.
pub fn authorize_field(principal: &Principal, kind: EntityKind, field: &str) -> Decision {
    if principal.may_edit_field(kind, field) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::FieldNotPermitted {
            field: field_key(kind, field),
        })
    }
}

fn archive_decision(principal: &Principal, archive: ArchiveId) -> Decision {
    if principal.may_access_archive(archive) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::InsufficientArchivePermission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    /// In-memory lookup: job id to archive id.
    struct Jobs(BTreeMap<i64, i64>);

    impl RecordLookup for Jobs {
        fn archive_of(&self, id: RecordId) -> storage::Result<Option<ArchiveId>> {
            Ok(self.0.get(&id.0).copied().map(ArchiveId))
        }
    }

    fn jobs() -> Jobs {
        Jobs(BTreeMap::from([(10, 5), (11, 7)]))
    }

    fn editor() -> Principal {
        Principal::scoped("editor", [ArchiveId(5)], ["job::published"])
    }

    fn deny(reason: DenyReason) -> Decision {
        Decision::Deny(reason)
    }

    #[test]
    fn parse_maps_operation_names() {
        assert_eq!(
            Command::parse(Some("toggle"), Some(10), None).unwrap(),
            Command::Record {
                operation: RecordOperation::Toggle,
                id: RecordId(10)
            }
        );
        assert_eq!(
            Command::parse(Some("copy"), Some(10), None).unwrap(),
            Command::Record {
                operation: RecordOperation::Duplicate,
                id: RecordId(10)
            }
        );
        assert_eq!(
            Command::parse(Some("overrideAll"), Some(5), None).unwrap(),
            Command::Bulk {
                operation: BulkOperation::OverrideAll,
                archive: ArchiveId(5)
            }
        );
        assert_eq!(
            Command::parse(Some("create"), None, Some(5)).unwrap(),
            Command::Create {
                archive: Some(ArchiveId(5))
            }
        );
        assert_eq!(
            Command::parse(None, Some(5), None).unwrap(),
            Command::Browse {
                archive: ArchiveId(5)
            }
        );
        assert_eq!(
            Command::parse(Some(""), Some(5), None).unwrap(),
            Command::Browse {
                archive: ArchiveId(5)
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_operation() {
        let err = Command::parse(Some("explode"), Some(1), None).unwrap_err();

        assert!(matches!(err, CommandError::UnrecognizedOperation(ref name) if name == "explode"));
        assert_eq!(err.to_string(), "unrecognized operation \"explode\"");
    }

    #[test]
    fn parse_requires_id_for_record_operations() {
        let err = Command::parse(Some("edit"), None, None).unwrap_err();
        assert!(matches!(err, CommandError::MissingId("edit")));
    }

    #[test]
    fn administrator_bypasses_everything() {
        let admin = Principal::administrator("root");
        let commands = [
            Command::Create { archive: None },
            Command::Record {
                operation: RecordOperation::Toggle,
                id: RecordId(404),
            },
            Command::Bulk {
                operation: BulkOperation::DeleteAll,
                archive: ArchiveId(0),
            },
            Command::Browse {
                archive: ArchiveId(99),
            },
        ];

        for command in &commands {
            assert_eq!(authorize(&admin, command, &jobs()).unwrap(), Decision::Allow);
        }
    }

    #[test]
    fn paste_is_always_allowed() {
        let nobody = Principal::scoped("nobody", [], Vec::<String>::new());
        assert_eq!(
            authorize(&nobody, &Command::Paste, &jobs()).unwrap(),
            Decision::Allow
        );
    }

    #[test]
    fn create_requires_granted_parent() {
        let p = editor();

        let allowed = Command::Create {
            archive: Some(ArchiveId(5)),
        };
        let foreign = Command::Create {
            archive: Some(ArchiveId(7)),
        };
        let missing = Command::Create { archive: None };

        assert_eq!(authorize(&p, &allowed, &jobs()).unwrap(), Decision::Allow);
        assert_eq!(
            authorize(&p, &foreign, &jobs()).unwrap(),
            deny(DenyReason::InsufficientArchivePermission)
        );
        assert_eq!(
            authorize(&p, &missing, &jobs()).unwrap(),
            deny(DenyReason::InsufficientArchivePermission)
        );
    }

    #[test]
    fn record_operations_resolve_owning_archive() {
        let p = editor();
        let on = |id| Command::Record {
            operation: RecordOperation::Toggle,
            id: RecordId(id),
        };

        assert_eq!(authorize(&p, &on(10), &jobs()).unwrap(), Decision::Allow);
        assert_eq!(
            authorize(&p, &on(11), &jobs()).unwrap(),
            deny(DenyReason::InsufficientArchivePermission)
        );
        assert_eq!(
            authorize(&p, &on(12), &jobs()).unwrap(),
            deny(DenyReason::RecordNotFound)
        );
    }

    #[test]
    fn bulk_and_browse_check_archive_directly() {
        let p = editor();
        let bulk = |archive| Command::Bulk {
            operation: BulkOperation::Select,
            archive: ArchiveId(archive),
        };

        assert_eq!(authorize(&p, &bulk(5), &jobs()).unwrap(), Decision::Allow);
        assert_eq!(
            authorize(&p, &bulk(7), &jobs()).unwrap(),
            deny(DenyReason::InsufficientArchivePermission)
        );
        assert_eq!(
            authorize(&p, &Command::Browse { archive: ArchiveId(7) }, &jobs()).unwrap(),
            deny(DenyReason::InsufficientArchivePermission)
        );
    }

    #[test]
    fn ungranted_principal_cannot_use_sentinel_archive() {
        let nobody = Principal::scoped("nobody", [], Vec::<String>::new());
        let command = Command::Browse {
            archive: ArchiveId::NONE,
        };

        assert_eq!(
            authorize(&nobody, &command, &jobs()).unwrap(),
            deny(DenyReason::InsufficientArchivePermission)
        );
    }

    #[test]
    fn field_check_is_independent_of_archive_scope() {
        let reader = Principal::scoped("reader", [ArchiveId(5)], Vec::<String>::new());

        assert_eq!(
            authorize_field(&reader, EntityKind::Job, "published"),
            deny(DenyReason::FieldNotPermitted {
                field: "job::published".into()
            })
        );
        assert_eq!(
            authorize_field(&editor(), EntityKind::Job, "published"),
            Decision::Allow
        );
    }

    #[test]
    fn target_renders_for_messages() {
        assert_eq!(Target::Record(RecordId(3)).to_string(), "job item ID 3");
        assert_eq!(
            Target::Archive(Some(ArchiveId(2))).to_string(),
            "job archive ID 2"
        );
    }
}
