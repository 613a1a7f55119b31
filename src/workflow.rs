//! The job workflows: every mutation a principal can make, as one unit.
//!
//! Each workflow runs the same bracket:
//!
//! ```text
//! authorize → load → open version scope → load hooks
//!           → (field check → save hooks) → write → submit hooks → commit
//! ```
//!
//! Denials and missing records stop the workflow before anything is
//! written. Workflows on the same record are serialized from load to commit,
//! so every snapshot shows the write of the workflow that committed it.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use jiff::Timestamp;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    access::{self, Command, CommandError, Decision, DenyReason, RecordOperation, Target},
    calendar::{Calendar, CalendarError},
    hooks::{HookError, HookRegistry, RecordContext},
    intent::{IntentError, ToggleIntent, toggle_href},
    ledger::VersionScope,
    model::{ArchiveId, EntityKind, NewRecord, Principal, Record, RecordId},
    storage::{Storage, StorageError},
};

/// The field a toggle writes.
pub const PUBLISHED: &str = "published";

/// Errors surfaced by the workflows.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("not enough permissions to {operation} {target}: {reason}")]
    AuthorizationDenied {
        operation: &'static str,
        target: Target,
        reason: DenyReason,
    },

    #[error("invalid job item ID {0}")]
    RecordNotFound(RecordId),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Intent(#[from] IntentError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for WorkflowError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::RecordNotFound(id) => Self::RecordNotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl WorkflowError {
    /// Process exit code for the command-line boundary.
    ///
    /// Denials, missing records and malformed commands each get their own
    /// code so callers can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Command(_) | Self::Intent(_) => 2,
            Self::AuthorizationDenied { .. } => 3,
            Self::RecordNotFound(_) => 4,
            Self::Hook(_) | Self::Calendar(_) | Self::Storage(_) => 1,
        }
    }
}

pub type Result<T> = core::result::Result<T, WorkflowError>;

/// Field values for a job about to be created.
///
/// Missing schedule parts default to now, as in the editor.
#[derive(Debug, Clone, Default)]
pub struct JobDraft {
    pub title: String,
    pub date: Option<Timestamp>,
    pub time: Option<Timestamp>,
    pub published: bool,
}

/// Runs job workflows against one store.
#[derive(Debug)]
pub struct Workflow {
    storage: Storage,
    calendar: Calendar,
    hooks: HookRegistry,
    locks: Mutex<HashMap<RecordId, Arc<Mutex<()>>>>,
}

impl Workflow {
    pub fn new(storage: Storage, calendar: Calendar, hooks: HookRegistry) -> Self {
        Self {
            storage,
            calendar,
            hooks,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Checks a raw command from the string surface.
    ///
    /// See [`Command::parse`] for how `act`, `id` and `pid` are read.
    pub fn check(
        &self,
        principal: &Principal,
        act: Option<&str>,
        id: Option<i64>,
        pid: Option<i64>,
    ) -> Result<Command> {
        let command = Command::parse(act, id, pid)?;
        self.require(principal, &command)?;
        Ok(command)
    }

    /// Sets a job's published flag.
    ///
    /// `hint` is the caller's context for this record, if it keeps one; it
    /// is handed to the hooks and left holding the updated record.
    /// Setting the flag to the value it already has is still a mutation:
    /// it refreshes `last_modified` and appends a snapshot.
    pub fn toggle(
        &self,
        principal: &Principal,
        id: RecordId,
        published: bool,
        hint: Option<&mut RecordContext>,
    ) -> Result<Record> {
        let command = Command::Record {
            operation: RecordOperation::Toggle,
            id,
        };
        self.require(principal, &command)?;

        let entry = self.record_lock(id)?;
        let _serial = entry.lock()?;

        let record = self.storage.get_record(id)?;
        let mut scope = VersionScope::initialize(&self.storage, EntityKind::Job, &record, principal.name());

        let mut fresh;
        let ctx = match hint {
            Some(ctx) => ctx,
            None => {
                fresh = RecordContext::new(EntityKind::Job, id);
                &mut fresh
            }
        };
        ctx.kind = EntityKind::Job;
        ctx.id = id;
        ctx.active_record = Some(record);

        debug!(record = %id, "running load hooks");
        self.hooks.run_load(ctx)?;

        if let Decision::Deny(reason) = access::authorize_field(principal, EntityKind::Job, PUBLISHED) {
            warn!(principal = principal.name(), record = %id, %reason, "field write denied");
            return Err(WorkflowError::AuthorizationDenied {
                operation: command.operation(),
                target: command.target(),
                reason,
            });
        }

        let value = self.hooks.run_save(PUBLISHED, Value::Bool(published), ctx)?;
        let published = value.as_bool().ok_or_else(|| {
            HookError::new(PUBLISHED, format!("save hooks returned {value}, expected a boolean"))
        })?;

        let updated = self.storage.update_published(id, published)?;
        scope.mark_written();
        ctx.active_record = Some(updated.clone());

        debug!(record = %id, "running submit hooks");
        self.hooks.run_submit(ctx)?;

        let revision = scope.commit().map(|snapshot| snapshot.revision);
        info!(
            principal = principal.name(),
            record = %id,
            published,
            revision,
            "job visibility set"
        );
        Ok(updated)
    }

    /// Follows a toggle link. Does nothing when the query carries no intent.
    pub fn handle_intent(&self, principal: &Principal, query: &str) -> Result<Option<Record>> {
        let Some(intent) = ToggleIntent::from_query(query)? else {
            return Ok(None);
        };
        self.toggle(principal, intent.id, intent.publish, None).map(Some)
    }

    /// The toggle link for `record`, if `principal` may flip it at all.
    pub fn toggle_link(&self, principal: &Principal, record: &Record) -> Option<String> {
        match access::authorize_field(principal, EntityKind::Job, PUBLISHED) {
            Decision::Allow => Some(toggle_href(record)),
            Decision::Deny(_) => None,
        }
    }

    /// Creates a job under `archive` and records its first version.
    pub fn create(&self, principal: &Principal, archive: ArchiveId, draft: JobDraft) -> Result<Record> {
        self.require(principal, &Command::Create {
            archive: Some(archive),
        })?;

        let date = self.calendar.day_start(draft.date)?;
        let time = self.calendar.time_of_day(draft.time)?;
        let (date, time) = self.calendar.reconcile(date, time)?;

        let record = self.storage.insert_record(&NewRecord {
            archive_id: archive,
            title: draft.title,
            date,
            time,
            published: draft.published,
        })?;

        let revision = VersionScope::created(&self.storage, EntityKind::Job, record.id, principal.name())
            .commit()
            .map(|snapshot| snapshot.revision);
        info!(
            principal = principal.name(),
            record = %record.id,
            archive = %archive,
            revision,
            "job created"
        );
        Ok(record)
    }

    /// Moves a job to a new day and/or time of day.
    ///
    /// A missing part keeps the stored value. The stored date and time are
    /// reconciled so both carry the same time of day.
    pub fn reschedule(
        &self,
        principal: &Principal,
        id: RecordId,
        date: Option<Timestamp>,
        time: Option<Timestamp>,
    ) -> Result<Record> {
        self.require(principal, &Command::Record {
            operation: RecordOperation::Edit,
            id,
        })?;

        let entry = self.record_lock(id)?;
        let _serial = entry.lock()?;

        let record = self.storage.get_record(id)?;
        let mut scope = VersionScope::initialize(&self.storage, EntityKind::Job, &record, principal.name());

        let (date, time) = (date.unwrap_or(record.date), time.unwrap_or(record.time));

        let mut ctx = RecordContext::new(EntityKind::Job, id);
        ctx.active_record = Some(record);
        self.hooks.run_load(&mut ctx)?;

        let (date, time) = self.calendar.reconcile(date, time)?;

        let updated = self.storage.update_schedule(id, date, time)?;
        scope.mark_written();
        ctx.active_record = Some(updated.clone());
        self.hooks.run_submit(&mut ctx)?;

        let revision = scope.commit().map(|snapshot| snapshot.revision);
        info!(principal = principal.name(), record = %id, revision, "job rescheduled");
        Ok(updated)
    }

    /// Narrows a selection to the jobs of `archive`.
    ///
    /// Returns the empty set when `principal` may not act on `archive`.
    pub fn filter_selection(
        &self,
        principal: &Principal,
        archive: ArchiveId,
        candidates: &BTreeSet<RecordId>,
    ) -> Result<BTreeSet<RecordId>> {
        let command = Command::Bulk {
            operation: access::BulkOperation::Select,
            archive,
        };
        if let Decision::Deny(reason) = access::authorize(principal, &command, &self.storage)? {
            debug!(principal = principal.name(), archive = %archive, %reason, "selection dropped");
            return Ok(BTreeSet::new());
        }

        let in_archive = self.storage.record_ids_in_archive(archive)?;
        Ok(candidates.intersection(&in_archive).copied().collect())
    }

    /// Authorizes `command`, turning a denial into an error.
    fn require(&self, principal: &Principal, command: &Command) -> Result<()> {
        match (access::authorize(principal, command, &self.storage)?, command.target()) {
            (Decision::Allow, _) => Ok(()),
            (Decision::Deny(DenyReason::RecordNotFound), Target::Record(id)) => {
                warn!(principal = principal.name(), record = %id, "job item not found");
                Err(WorkflowError::RecordNotFound(id))
            }
            (Decision::Deny(reason), _) => {
                warn!(
                    principal = principal.name(),
                    operation = command.operation(),
                    target = %command.target(),
                    %reason,
                    "command denied"
                );
                Err(WorkflowError::AuthorizationDenied {
                    operation: command.operation(),
                    target: command.target(),
                    reason,
                })
            }
        }
    }

    /// The lock serializing workflows on one record.
    fn record_lock(&self, id: RecordId) -> Result<RecordLock<'_>> {
        let mut locks = self.locks.lock().map_err(|_| StorageError::Poisoned)?;
        let entry = Arc::clone(locks.entry(id).or_default());
        Ok(RecordLock {
            locks: &self.locks,
            id,
            entry,
        })
    }
}

/// One workflow's claim on a record's lock.
///
/// The map entry is removed when the last claim is dropped. Claims are only
/// taken and released under the map lock, so the count check cannot race.
struct RecordLock<'a> {
    locks: &'a Mutex<HashMap<RecordId, Arc<Mutex<()>>>>,
    id: RecordId,
    entry: Arc<Mutex<()>>,
}

impl RecordLock<'_> {
    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        Ok(self.entry.lock().map_err(|_| StorageError::Poisoned)?)
    }
}

impl Drop for RecordLock<'_> {
    fn drop(&mut self) {
        // One reference is the map's, one is ours.
        if let Ok(mut locks) = self.locks.lock()
            && Arc::strong_count(&self.entry) == 2
        {
            locks.remove(&self.id);
        }
    }
}
