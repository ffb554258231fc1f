//! Delete a label
//!
//! The full record is fetched before the delete so `revert` can recreate
//! it under the same id.

use async_trait::async_trait;
use relabel_core::model::NewLabel;
use relabel_core::{Effect, ExResult, Label, Mutation};

use super::CommandContext;

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedLabel {
    pub label: Label,
    /// The label was the selection when it was deleted
    pub was_selected: bool,
}

pub struct DeleteLabel {
    id: String,
    ctx: CommandContext,
}

impl DeleteLabel {
    pub fn new(id: impl Into<String>, ctx: CommandContext) -> Self {
        Self { id: id.into(), ctx }
    }
}

#[async_trait]
impl Effect for DeleteLabel {
    type Done = DeletedLabel;
    type Undone = DeletedLabel;

    fn name(&self) -> &str {
        "delete_label"
    }

    async fn apply(&self) -> ExResult<DeletedLabel> {
        let label = self.ctx.fetch_label(&self.id).await?;
        remove(&self.ctx, label).await
    }

    async fn revert(&self, done: DeletedLabel) -> ExResult<DeletedLabel> {
        restore(&self.ctx, &done).await?;
        Ok(done)
    }

    async fn reapply(&self, undone: DeletedLabel) -> ExResult<DeletedLabel> {
        remove(&self.ctx, undone.label).await
    }
}

/// Delete `label` remotely and drop it from the selection
pub(crate) async fn remove(ctx: &CommandContext, label: Label) -> ExResult<DeletedLabel> {
    let was_selected = ctx.ui.selected_label_id().as_deref() == Some(label.id.as_str());
    ctx.delete_label(&label.id).await?;
    if was_selected {
        ctx.ui.set_selected_label_id(None);
    }
    Ok(DeletedLabel {
        label,
        was_selected,
    })
}

/// Recreate a deleted label under its original id
pub(crate) async fn restore(ctx: &CommandContext, deleted: &DeletedLabel) -> ExResult<Label> {
    let label = ctx
        .mutate_label(Mutation::CreateLabel(NewLabel::from(&deleted.label)))
        .await?;
    if deleted.was_selected {
        ctx.ui.set_selected_label_id(Some(label.id.clone()));
    }
    ctx.refresh_cache(|cache| cache.put_label(label.clone()));
    Ok(label)
}
