//! Point a label at another class (or at none)
//!
//! The class selection follows the label: after `apply` the new class is
//! selected, after `revert` the label's previous class is.

use async_trait::async_trait;
use relabel_core::remote::LabelUpdate;
use relabel_core::{Effect, ExResult};

use super::CommandContext;

pub struct UpdateLabelClassOfLabel {
    label_id: String,
    label_class_id: Option<String>,
    ctx: CommandContext,
}

impl UpdateLabelClassOfLabel {
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
}

#[async_trait]
impl Effect for UpdateLabelClassOfLabel {
    /// Class the label had before
    type Done = Option<String>;
    type Undone = ();

    fn name(&self) -> &str {
        "update_label_class_of_label"
    }

    async fn apply(&self) -> ExResult<Option<String>> {
        let previous = self.ctx.fetch_label(&self.label_id).await?.label_class_id;
        set_class(&self.ctx, &self.label_id, self.label_class_id.clone()).await?;
        Ok(previous)
    }

    async fn revert(&self, previous: Option<String>) -> ExResult<()> {
        set_class(&self.ctx, &self.label_id, previous).await
    }
}

pub(crate) async fn set_class(
    ctx: &CommandContext,
    label_id: &str,
    label_class_id: Option<String>,
) -> ExResult<()> {
    ctx.update_label(label_id, LabelUpdate::class(label_class_id.clone()))
        .await?;
    ctx.ui.set_selected_label_class_id(label_class_id);
    Ok(())
}
