//! Reversible commands
//!
//! An [`Effect`] is one user action expressed as three asynchronous steps
//! that thread typed values between them:
//!
//! ```text
//! apply()            -> Done
//! revert(Done)       -> Undone
//! reapply(Undone)    -> Done
//! ```
//!
//! `apply` and `reapply` must be observationally equivalent for whoever
//! holds the history: both produce a `Done` that a later `revert` accepts.
//! Effects are constructed fresh per user action and carry only the context
//! they need (ids, field values, handles to the remote and the UI state).

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{ExError, ExErrorKind, ExResult};

#[async_trait]
pub trait Effect: Send + Sync {
    /// Produced by `apply`/`reapply`, consumed by `revert`
    type Done: Clone + Send + Sync + 'static;
    /// Produced by `revert`, consumed by `reapply`
    type Undone: Clone + Send + Sync + 'static;

    /// Short name for the undo-history menu and for logs
    fn name(&self) -> &str;

    async fn apply(&self) -> ExResult<Self::Done>;

    async fn revert(&self, done: Self::Done) -> ExResult<Self::Undone>;

    /// Whether an `apply` that produced `done` belongs in history. An effect
    /// that turned out to change nothing returns `false` and is not recorded.
    fn records(&self, _done: &Self::Done) -> bool {
        true
    }

    /// Defaults to running `apply` again. Effects that create entities must
    /// override this to recreate them under their original ids.
    async fn reapply(&self, _undone: Self::Undone) -> ExResult<Self::Done> {
        self.apply().await
    }
}

/// Type-erased value threaded between the steps of a [`DynEffect`]
pub type Outcome = Arc<dyn Any + Send + Sync>;

/// Recover a typed value out of an [`Outcome`]
pub fn downcast_outcome<T: Clone + 'static>(outcome: &Outcome) -> Option<T> {
    outcome.downcast_ref::<T>().cloned()
}

/// Object-safe form of [`Effect`], so effects of different types can be
/// sequenced inside one composite.
#[async_trait]
pub trait DynEffect: Send + Sync {
    fn name(&self) -> &str;
    async fn apply_dyn(&self) -> ExResult<Outcome>;
    async fn revert_dyn(&self, done: Outcome) -> ExResult<Outcome>;
    async fn reapply_dyn(&self, undone: Outcome) -> ExResult<Outcome>;
}

#[async_trait]
impl<E> DynEffect for E
where
    E: Effect,
{
    fn name(&self) -> &str {
        Effect::name(self)
    }

    async fn apply_dyn(&self) -> ExResult<Outcome> {
        let done = self.apply().await?;
        Ok(Arc::new(done))
    }

    async fn revert_dyn(&self, done: Outcome) -> ExResult<Outcome> {
        let done = downcast_outcome::<E::Done>(&done)
            .ok_or_else(|| mismatched(Effect::name(self), "revert"))?;
        let undone = self.revert(done).await?;
        Ok(Arc::new(undone))
    }

    async fn reapply_dyn(&self, undone: Outcome) -> ExResult<Outcome> {
        let undone = downcast_outcome::<E::Undone>(&undone)
            .ok_or_else(|| mismatched(Effect::name(self), "reapply"))?;
        let done = self.reapply(undone).await?;
        Ok(Arc::new(done))
    }
}

fn mismatched(effect: &str, step: &str) -> ExError {
    ExError::new(ExErrorKind::HistoryCorrupt)
        .with_op(step.to_string())
        .with_message(format!("value handed to '{}' has the wrong type", effect))
}
