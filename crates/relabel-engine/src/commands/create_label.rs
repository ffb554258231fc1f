//! Create a label and select it

use async_trait::async_trait;
use relabel_core::model::{NewLabel, SmartToolInput};
use relabel_core::{Effect, ExResult, Geometry, Label, LabelType, Mutation};

use super::{new_id, CommandContext};

#[derive(Debug, Clone, PartialEq)]
pub struct CreateLabelInput {
    pub image_id: String,
    pub label_type: LabelType,
    pub geometry: Geometry,
    pub label_class_id: Option<String>,
    pub smart_tool_input: Option<SmartToolInput>,
}

/// The label as the remote stored it, plus the selection it displaced
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedLabel {
    pub label: Label,
    pub previous_selection: Option<String>,
}

pub struct CreateLabel {
    id: String,
    input: CreateLabelInput,
    ctx: CommandContext,
}

impl CreateLabel {
    pub fn new(input: CreateLabelInput, ctx: CommandContext) -> Self {
        Self::with_id(new_id(), input, ctx)
    }

    pub fn with_id(id: impl Into<String>, input: CreateLabelInput, ctx: CommandContext) -> Self {
        Self {
            id: id.into(),
            input,
            ctx,
        }
    }

    /// Id the label is (or will be) stored under
    pub fn id(&self) -> &str {
        &self.id
    }

    async fn create(
        &self,
        data: NewLabel,
        previous_selection: Option<String>,
    ) -> ExResult<CreatedLabel> {
        let label = self.ctx.mutate_label(Mutation::CreateLabel(data)).await?;
        self.ctx.ui.set_selected_label_id(Some(label.id.clone()));
        self.ctx.refresh_cache(|cache| cache.put_label(label.clone()));
        Ok(CreatedLabel {
            label,
            previous_selection,
        })
    }
}

#[async_trait]
impl Effect for CreateLabel {
    type Done = CreatedLabel;
    type Undone = CreatedLabel;

    fn name(&self) -> &str {
        "create_label"
    }

    async fn apply(&self) -> ExResult<CreatedLabel> {
        let data = NewLabel {
            id: self.id.clone(),
            image_id: self.input.image_id.clone(),
            label_type: self.input.label_type,
            geometry: self.input.geometry.clone(),
            label_class_id: self.input.label_class_id.clone(),
            smart_tool_input: self.input.smart_tool_input.clone(),
            created_at: None,
        };
        let previous = self.ctx.ui.selected_label_id();
        self.create(data, previous).await
    }

    async fn revert(&self, done: CreatedLabel) -> ExResult<CreatedLabel> {
        self.ctx.delete_label(&done.label.id).await?;
        self.ctx
            .ui
            .set_selected_label_id(done.previous_selection.clone());
        Ok(done)
    }

    /// Recreates the exact record `apply` produced, timestamps included
    async fn reapply(&self, undone: CreatedLabel) -> ExResult<CreatedLabel> {
        let data = NewLabel::from(&undone.label);
        self.create(data, undone.previous_selection).await
    }
}
