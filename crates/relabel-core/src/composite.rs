//! Composite commands
//!
//! `compose([e1, .., en])` is itself an [`Effect`]:
//!
//! - `apply` runs `e1.apply .. en.apply` in order
//! - `revert` runs `en.revert .. e1.revert`, strictly in reverse, because a
//!   later step may depend on state an earlier one created (a label pointing
//!   at a class that is deleted only after the pointer is restored)
//! - `reapply` runs `e1.reapply .. en.reapply` in order
//!
//! There is no rollback across steps. When step `k > 0` fails, steps
//! `0..k` have already landed remotely; the error says so
//! (`ERR_PARTIAL_COMPOSITE`, `step = k`, the step's error as source) and the
//! caller decides what to compensate. A failure of the very first step is
//! returned unchanged since nothing landed.

use async_trait::async_trait;

use crate::effect::{DynEffect, Effect, Outcome};
use crate::errors::{ExError, ExErrorKind, ExResult};

pub struct Composite {
    name: String,
    steps: Vec<Box<dyn DynEffect>>,
}

/// Build a composite out of already-constructed effects
pub fn compose(name: impl Into<String>, steps: Vec<Box<dyn DynEffect>>) -> Composite {
    Composite {
        name: name.into(),
        steps,
    }
}

impl Composite {
    pub fn new(name: impl Into<String>) -> Self {
        compose(name, Vec::new())
    }

    /// Append a step
    pub fn then<E: Effect + 'static>(mut self, effect: E) -> Self {
        self.steps.push(Box::new(effect));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    fn check_arity(&self, values: &[Outcome], op: &str) -> ExResult<()> {
        if values.len() == self.steps.len() {
            return Ok(());
        }
        Err(ExError::new(ExErrorKind::HistoryCorrupt)
            .with_op(op.to_string())
            .with_message(format!(
                "composite '{}' has {} steps but got {} values",
                self.name,
                self.steps.len(),
                values.len()
            )))
    }

    fn partial_failure(&self, op: &str, step: usize, landed: usize, err: ExError) -> ExError {
        if landed == 0 {
            return err;
        }
        ExError::new(ExErrorKind::PartialComposite)
            .with_op(op.to_string())
            .with_step(step)
            .with_message(format!(
                "step {} ('{}') of composite '{}' failed after {} step(s) completed",
                step,
                self.steps[step].name(),
                self.name,
                landed
            ))
            .with_source(err)
    }
}

#[async_trait]
impl Effect for Composite {
    /// One value per step, in step order
    type Done = Vec<Outcome>;
    type Undone = Vec<Outcome>;

    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self) -> ExResult<Vec<Outcome>> {
        let mut done = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            match step.apply_dyn().await {
                Ok(value) => done.push(value),
                Err(err) => return Err(self.partial_failure("apply", i, i, err)),
            }
        }
        Ok(done)
    }

    async fn revert(&self, done: Vec<Outcome>) -> ExResult<Vec<Outcome>> {
        self.check_arity(&done, "revert")?;
        let mut undone = Vec::with_capacity(done.len());
        for (landed, (i, value)) in done.into_iter().enumerate().rev().enumerate() {
            match self.steps[i].revert_dyn(value).await {
                Ok(u) => undone.push(u),
                Err(err) => return Err(self.partial_failure("revert", i, landed, err)),
            }
        }
        undone.reverse();
        Ok(undone)
    }

    async fn reapply(&self, undone: Vec<Outcome>) -> ExResult<Vec<Outcome>> {
        self.check_arity(&undone, "reapply")?;
        let mut done = Vec::with_capacity(undone.len());
        for (i, value) in undone.into_iter().enumerate() {
            match self.steps[i].reapply_dyn(value).await {
                Ok(d) => done.push(d),
                Err(err) => return Err(self.partial_failure("reapply", i, i, err)),
            }
        }
        Ok(done)
    }
}
