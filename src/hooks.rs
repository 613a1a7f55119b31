//! Typed hooks run by the workflows around a mutation.
//!
//! Three phases, each an ordered list per entity kind:
//!
//! - **load**: after the record is loaded, before any write.
//! - **field save**: per field, may transform the value about to be written.
//! - **submit**: after the write, with the updated record in context.
//!
//! A hook error aborts the workflow and is returned unchanged to the caller.

use std::{collections::BTreeMap, fmt};

use serde_json::Value;

use crate::model::{EntityKind, Record, RecordId};

/// A hook failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{hook} hook failed: {message}")]
pub struct HookError {
    pub hook: String,
    pub message: String,
}

impl HookError {
    pub fn new(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            message: message.into(),
        }
    }
}

/// The record a workflow is operating on, as seen by hooks.
#[derive(Debug, Clone)]
pub struct RecordContext {
    pub kind: EntityKind,
    pub id: RecordId,

    /// The record as last loaded or written by the workflow.
    pub active_record: Option<Record>,
}

impl RecordContext {
    pub fn new(kind: EntityKind, id: RecordId) -> Self {
        Self {
            kind,
            id,
            active_record: None,
        }
    }
}

/// Runs after a record is loaded, before it is written.
pub trait LoadHook: Send + Sync {
    fn apply(&self, ctx: &mut RecordContext) -> Result<(), HookError>;
}

/// Transforms a field value before it is written.
pub trait FieldSaveHook: Send + Sync {
    fn apply(&self, value: Value, ctx: &RecordContext) -> Result<Value, HookError>;
}

/// Runs after a record is written.
pub trait SubmitHook: Send + Sync {
    fn apply(&self, ctx: &mut RecordContext) -> Result<(), HookError>;
}

impl<F> LoadHook for F
where
    F: Fn(&mut RecordContext) -> Result<(), HookError> + Send + Sync,
{
    fn apply(&self, ctx: &mut RecordContext) -> Result<(), HookError> {
        self(ctx)
    }
}

impl<F> FieldSaveHook for F
where
    F: Fn(Value, &RecordContext) -> Result<Value, HookError> + Send + Sync,
{
    fn apply(&self, value: Value, ctx: &RecordContext) -> Result<Value, HookError> {
        self(value, ctx)
    }
}

impl<F> SubmitHook for F
where
    F: Fn(&mut RecordContext) -> Result<(), HookError> + Send + Sync,
{
    fn apply(&self, ctx: &mut RecordContext) -> Result<(), HookError> {
        self(ctx)
    }
}

/// Hooks registered per entity kind and phase, run in registration order.
#[derive(Default)]
pub struct HookRegistry {
    load: BTreeMap<EntityKind, Vec<Box<dyn LoadHook>>>,
    field_save: BTreeMap<(EntityKind, String), Vec<Box<dyn FieldSaveHook>>>,
    submit: BTreeMap<EntityKind, Vec<Box<dyn SubmitHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_load(&mut self, kind: EntityKind, hook: impl LoadHook + 'static) -> &mut Self {
        self.load.entry(kind).or_default().push(Box::new(hook));
        self
    }

    pub fn on_save(
        &mut self,
        kind: EntityKind,
        field: &str,
        hook: impl FieldSaveHook + 'static,
    ) -> &mut Self {
        self.field_save
            .entry((kind, field.to_string()))
            .or_default()
            .push(Box::new(hook));
        self
    }

    pub fn on_submit(&mut self, kind: EntityKind, hook: impl SubmitHook + 'static) -> &mut Self {
        self.submit.entry(kind).or_default().push(Box::new(hook));
        self
    }

    pub fn run_load(&self, ctx: &mut RecordContext) -> Result<(), HookError> {
        for hook in self.load.get(&ctx.kind).into_iter().flatten() {
            hook.apply(ctx)?;
        }
        Ok(())
    }

    /// Threads `value` through every save hook registered for `field`.
    pub fn run_save(&self, field: &str, value: Value, ctx: &RecordContext) -> Result<Value, HookError> {
        let key = (ctx.kind, field.to_string());
        self.field_save
            .get(&key)
            .into_iter()
            .flatten()
            .try_fold(value, |value, hook| hook.apply(value, ctx))
    }

    pub fn run_submit(&self, ctx: &mut RecordContext) -> Result<(), HookError> {
        for hook in self.submit.get(&ctx.kind).into_iter().flatten() {
            hook.apply(ctx)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("load", &self.load.values().map(Vec::len).sum::<usize>())
            .field("field_save", &self.field_save.values().map(Vec::len).sum::<usize>())
            .field("submit", &self.submit.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}
