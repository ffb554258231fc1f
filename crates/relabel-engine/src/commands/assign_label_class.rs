//! Assign a class to a label, merging duplicate classifications
//!
//! An image carries at most one classification label per class. Assigning
//! class `C` to classification label `L` when another classification label
//! of the same image already has `C` deletes `L` instead of reassigning it.
//! `revert` undoes whichever of the two happened; `reapply` repeats the
//! same branch without re-checking siblings.

use async_trait::async_trait;
use relabel_core::{Effect, ExResult, Label};

use super::delete_label::{remove, restore};
use super::update_label_class::set_class;
use super::{CommandContext, DeletedLabel};

/// What an assignment did
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Reassigned { previous_class_id: Option<String> },
    MergedAway(DeletedLabel),
}

pub struct AssignLabelClass {
    label_id: String,
    label_class_id: Option<String>,
    ctx: CommandContext,
}

impl AssignLabelClass {
    pub fn new(
        label_id: impl Into<String>,
        label_class_id: Option<String>,
        ctx: CommandContext,
    ) -> Self {
        Self {
            label_id: label_id.into(),
            label_class_id,
            ctx,
        }
    }

    async fn duplicates(&self, label: &Label) -> ExResult<bool> {
        let Some(class_id) = self.label_class_id.as_deref() else {
            return Ok(false);
        };
        if !label.is_classification() {
            return Ok(false);
        }
        let siblings = self.ctx.fetch_image_labels(&label.image_id).await?;
        Ok(siblings.iter().any(|other| {
            other.id != label.id
                && other.is_classification()
                && other.label_class_id.as_deref() == Some(class_id)
        }))
    }
}

#[async_trait]
impl Effect for AssignLabelClass {
    type Done = Assignment;
    type Undone = Assignment;

    fn name(&self) -> &str {
        "assign_label_class"
    }

    async fn apply(&self) -> ExResult<Assignment> {
        let label = self.ctx.fetch_label(&self.label_id).await?;
        if self.duplicates(&label).await? {
            tracing::debug!(
                label_id = %label.id,
                "class already classifies this image, merging label away"
            );
            return Ok(Assignment::MergedAway(remove(&self.ctx, label).await?));
        }
        let previous_class_id = label.label_class_id.clone();
        set_class(&self.ctx, &self.label_id, self.label_class_id.clone()).await?;
        Ok(Assignment::Reassigned { previous_class_id })
    }

    async fn revert(&self, done: Assignment) -> ExResult<Assignment> {
        match &done {
            Assignment::Reassigned { previous_class_id } => {
                set_class(&self.ctx, &self.label_id, previous_class_id.clone()).await?;
            }
            Assignment::MergedAway(deleted) => {
                restore(&self.ctx, deleted).await?;
            }
        }
        Ok(done)
    }

    async fn reapply(&self, undone: Assignment) -> ExResult<Assignment> {
        match undone {
            Assignment::Reassigned { previous_class_id } => {
                set_class(&self.ctx, &self.label_id, self.label_class_id.clone()).await?;
                Ok(Assignment::Reassigned { previous_class_id })
            }
            Assignment::MergedAway(deleted) => Ok(Assignment::MergedAway(
                remove(&self.ctx, deleted.label).await?,
            )),
        }
    }
}
