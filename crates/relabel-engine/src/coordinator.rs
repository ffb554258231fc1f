//! Undo/redo coordinator
//!
//! Holds the two history stacks and serializes every history operation
//! behind one fair (FIFO) async mutex: `perform`, `undo` and `redo` each
//! take the lock for their whole duration, remote round trips included,
//! so overlapping calls run one after another in arrival order.
//!
//! ## Stack discipline
//!
//! - `perform` pushes onto the undo stack and clears the redo stack, only
//!   when the effect succeeded and changed something
//! - `undo` pops the undo stack; on success the entry moves to the redo
//!   stack, on failure it is dropped
//! - `redo` pops the redo stack; on success the entry moves back to the
//!   undo stack, on failure it is dropped
//! - `undo`/`redo` on an empty stack do nothing
//!
//! A future dropped while it holds the lock releases it. An entry popped by
//! a cancelled `undo`/`redo` is lost, like a failed one.
//!
//! ## Logging Ownership
//!
//! The coordinator owns lifecycle logging for history operations:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Commands use only `tracing::debug!()`/`warn!()` for internal details.

use std::time::Instant;

use async_trait::async_trait;
use relabel_core::{log_op_end, log_op_error, log_op_start};
use relabel_core::{Effect, ExError, ExErrorKind, ExResult};
use relabel_core_types::schema::{
    EVENT_NOOP, FIELD_EFFECT, FIELD_EVENT, FIELD_OP, FIELD_REDO_DEPTH, FIELD_REQUEST_ID,
    FIELD_UNDO_DEPTH, OP_PERFORM, OP_REDO, OP_UNDO,
};
use relabel_core_types::RequestContext;
use serde::Serialize;
use tokio::sync::{watch, Mutex};

/// What the undo/redo buttons need to render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_depth: usize,
    pub redo_depth: usize,
}

/// Entry names, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistorySnapshot {
    pub undo: Vec<String>,
    pub redo: Vec<String>,
}

/// A performed effect together with the value its next step consumes
#[async_trait]
trait HistoryEntry: Send + Sync {
    fn name(&self) -> &str;
    async fn undo(&mut self) -> ExResult<()>;
    async fn redo(&mut self) -> ExResult<()>;
}

enum EntryState<D, U> {
    Done(D),
    Undone(U),
    /// Transient while a step is in flight
    Spent,
}

struct Entry<E: Effect> {
    effect: E,
    state: EntryState<E::Done, E::Undone>,
}

impl<E: Effect> Entry<E> {
    fn misplaced(&self, op: &str) -> ExError {
        ExError::new(ExErrorKind::HistoryCorrupt)
            .with_op(op)
            .with_message(format!(
                "entry '{}' is not in a state that allows {}",
                self.effect.name(),
                op
            ))
    }
}

#[async_trait]
impl<E: Effect> HistoryEntry for Entry<E> {
    fn name(&self) -> &str {
        self.effect.name()
    }

    async fn undo(&mut self) -> ExResult<()> {
        let done = match std::mem::replace(&mut self.state, EntryState::Spent) {
            EntryState::Done(done) => done,
            other => {
                self.state = other;
                return Err(self.misplaced(OP_UNDO));
            }
        };
        let undone = self.effect.revert(done).await?;
        self.state = EntryState::Undone(undone);
        Ok(())
    }

    async fn redo(&mut self) -> ExResult<()> {
        let undone = match std::mem::replace(&mut self.state, EntryState::Spent) {
            EntryState::Undone(undone) => undone,
            other => {
                self.state = other;
                return Err(self.misplaced(OP_REDO));
            }
        };
        let done = self.effect.reapply(undone).await?;
        self.state = EntryState::Done(done);
        Ok(())
    }
}

#[derive(Default)]
struct History {
    undo: Vec<Box<dyn HistoryEntry>>,
    redo: Vec<Box<dyn HistoryEntry>>,
}

impl History {
    fn status(&self) -> HistoryStatus {
        HistoryStatus {
            can_undo: !self.undo.is_empty(),
            can_redo: !self.redo.is_empty(),
            undo_depth: self.undo.len(),
            redo_depth: self.redo.len(),
        }
    }
}

pub struct Coordinator {
    history: Mutex<History>,
    status: watch::Sender<HistoryStatus>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        let (status, _) = watch::channel(HistoryStatus::default());
        Self {
            history: Mutex::new(History::default()),
            status,
        }
    }

    /// Apply `effect` and record it, unless [`Effect::records`] says the
    /// outcome changed nothing
    ///
    /// # Errors
    ///
    /// The effect's own error, tagged with the call's request id. Nothing is
    /// recorded and the redo stack is left alone.
    pub async fn perform<E: Effect + 'static>(&self, effect: E) -> ExResult<E::Done> {
        let ctx = RequestContext::new();
        let mut history = self.history.lock().await;

        log_op_start!(
            OP_PERFORM,
            { FIELD_EFFECT } = effect.name(),
            { FIELD_REQUEST_ID } = ctx.request_id.as_str()
        );
        let start = Instant::now();

        let done = effect.apply().await.map_err(|e| {
            log_op_error!(
                OP_PERFORM,
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                { FIELD_EFFECT } = effect.name(),
                { FIELD_REQUEST_ID } = ctx.request_id.as_str()
            );
            e.with_request_id(ctx.request_id.clone())
        })?;

        let name = effect.name().to_string();
        if !effect.records(&done) {
            tracing::debug!(
                component = module_path!(),
                { FIELD_OP } = OP_PERFORM,
                { FIELD_EVENT } = EVENT_NOOP,
                { FIELD_EFFECT } = name.as_str(),
                { FIELD_REQUEST_ID } = ctx.request_id.as_str(),
                "effect changed nothing, not recorded"
            );
            return Ok(done);
        }
        history.undo.push(Box::new(Entry {
            effect,
            state: EntryState::Done(done.clone()),
        }));
        history.redo.clear();
        let status = self.publish(&history);

        log_op_end!(
            OP_PERFORM,
            duration_ms = start.elapsed().as_millis() as u64,
            { FIELD_EFFECT } = name.as_str(),
            { FIELD_REQUEST_ID } = ctx.request_id.as_str(),
            { FIELD_UNDO_DEPTH } = status.undo_depth,
            { FIELD_REDO_DEPTH } = status.redo_depth
        );

        Ok(done)
    }

    /// Revert the most recent entry. Returns its name, or `None` when there
    /// was nothing to undo.
    ///
    /// # Errors
    ///
    /// The revert's error, tagged with the call's request id. The entry is
    /// dropped from history.
    pub async fn undo(&self) -> ExResult<Option<String>> {
        let ctx = RequestContext::new();
        let mut history = self.history.lock().await;
        let Some(mut entry) = history.undo.pop() else {
            tracing::debug!(
                component = module_path!(),
                { FIELD_OP } = OP_UNDO,
                { FIELD_EVENT } = EVENT_NOOP,
                "undo stack is empty"
            );
            return Ok(None);
        };

        let name = entry.name().to_string();
        log_op_start!(
            OP_UNDO,
            { FIELD_EFFECT } = name.as_str(),
            { FIELD_REQUEST_ID } = ctx.request_id.as_str()
        );
        let start = Instant::now();

        let outcome = entry.undo().await;
        if outcome.is_ok() {
            history.redo.push(entry);
        }
        let status = self.publish(&history);

        outcome.map_err(|e| {
            log_op_error!(
                OP_UNDO,
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                { FIELD_EFFECT } = name.as_str(),
                { FIELD_REQUEST_ID } = ctx.request_id.as_str()
            );
            e.with_request_id(ctx.request_id.clone())
        })?;

        log_op_end!(
            OP_UNDO,
            duration_ms = start.elapsed().as_millis() as u64,
            { FIELD_EFFECT } = name.as_str(),
            { FIELD_REQUEST_ID } = ctx.request_id.as_str(),
            { FIELD_UNDO_DEPTH } = status.undo_depth,
            { FIELD_REDO_DEPTH } = status.redo_depth
        );

        Ok(Some(name))
    }

    /// Reapply the most recently undone entry. Returns its name, or `None`
    /// when there was nothing to redo.
    ///
    /// # Errors
    ///
    /// The reapply's error, tagged with the call's request id. The entry is
    /// dropped from history.
    pub async fn redo(&self) -> ExResult<Option<String>> {
        let ctx = RequestContext::new();
        let mut history = self.history.lock().await;
        let Some(mut entry) = history.redo.pop() else {
            tracing::debug!(
                component = module_path!(),
                { FIELD_OP } = OP_REDO,
                { FIELD_EVENT } = EVENT_NOOP,
                "redo stack is empty"
            );
            return Ok(None);
        };

        let name = entry.name().to_string();
        log_op_start!(
            OP_REDO,
            { FIELD_EFFECT } = name.as_str(),
            { FIELD_REQUEST_ID } = ctx.request_id.as_str()
        );
        let start = Instant::now();

        let outcome = entry.redo().await;
        if outcome.is_ok() {
            history.undo.push(entry);
        }
        let status = self.publish(&history);

        outcome.map_err(|e| {
            log_op_error!(
                OP_REDO,
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                { FIELD_EFFECT } = name.as_str(),
                { FIELD_REQUEST_ID } = ctx.request_id.as_str()
            );
            e.with_request_id(ctx.request_id.clone())
        })?;

        log_op_end!(
            OP_REDO,
            duration_ms = start.elapsed().as_millis() as u64,
            { FIELD_EFFECT } = name.as_str(),
            { FIELD_REQUEST_ID } = ctx.request_id.as_str(),
            { FIELD_UNDO_DEPTH } = status.undo_depth,
            { FIELD_REDO_DEPTH } = status.redo_depth
        );

        Ok(Some(name))
    }

    /// Forget both stacks, e.g. when the user switches image
    pub async fn clear(&self) {
        let mut history = self.history.lock().await;
        history.undo.clear();
        history.redo.clear();
        self.publish(&history);
    }

    pub async fn history_names(&self) -> HistorySnapshot {
        let history = self.history.lock().await;
        HistorySnapshot {
            undo: history.undo.iter().map(|e| e.name().to_string()).collect(),
            redo: history.redo.iter().map(|e| e.name().to_string()).collect(),
        }
    }

    /// Last published status; does not wait for an in-flight operation
    pub fn status(&self) -> HistoryStatus {
        *self.status.borrow()
    }

    pub fn can_undo(&self) -> bool {
        self.status().can_undo
    }

    pub fn can_redo(&self) -> bool {
        self.status().can_redo
    }

    /// Receive every status change
    pub fn subscribe(&self) -> watch::Receiver<HistoryStatus> {
        self.status.subscribe()
    }

    /// An operation currently holds the history
    pub fn is_busy(&self) -> bool {
        self.history.try_lock().is_err()
    }

    fn publish(&self, history: &History) -> HistoryStatus {
        let status = history.status();
        self.status.send_replace(status);
        status
    }
}
