//! Change the shape of a label
//!
//! Also the history entry an inference session commits: the session knows
//! both shapes already, so it builds the command with
//! [`UpdateLabelGeometry::from_change`] and no fetch happens.

use async_trait::async_trait;
use relabel_core::model::SmartToolInput;
use relabel_core::remote::LabelUpdate;
use relabel_core::{Effect, ExResult, Geometry, Label};

use super::CommandContext;

/// Geometry plus the smart-tool hints that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub geometry: Geometry,
    pub smart_tool_input: Option<SmartToolInput>,
}

impl Shape {
    pub fn of(label: &Label) -> Self {
        Self {
            geometry: label.geometry.clone(),
            smart_tool_input: label.smart_tool_input.clone(),
        }
    }

    fn into_update(self) -> LabelUpdate {
        LabelUpdate::shape(self.geometry, self.smart_tool_input)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeChange {
    pub label_id: String,
    pub before: Shape,
    pub after: Shape,
}

pub struct UpdateLabelGeometry {
    label_id: String,
    before: Option<Shape>,
    after: Shape,
    ctx: CommandContext,
}

impl UpdateLabelGeometry {
    pub fn new(label_id: impl Into<String>, after: Shape, ctx: CommandContext) -> Self {
        Self {
            label_id: label_id.into(),
            before: None,
            after,
            ctx,
        }
    }

    /// Record a change whose previous shape is already known
    pub fn from_change(change: ShapeChange, ctx: CommandContext) -> Self {
        Self {
            label_id: change.label_id,
            before: Some(change.before),
            after: change.after,
            ctx,
        }
    }

    async fn write(&self, shape: Shape) -> ExResult<()> {
        self.ctx
            .update_label(&self.label_id, shape.into_update())
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Effect for UpdateLabelGeometry {
    type Done = ShapeChange;
    type Undone = ShapeChange;

    fn name(&self) -> &str {
        "update_label_geometry"
    }

    async fn apply(&self) -> ExResult<ShapeChange> {
        let before = match &self.before {
            Some(shape) => shape.clone(),
            None => Shape::of(&self.ctx.fetch_label(&self.label_id).await?),
        };
        self.write(self.after.clone()).await?;
        Ok(ShapeChange {
            label_id: self.label_id.clone(),
            before,
            after: self.after.clone(),
        })
    }

    async fn revert(&self, done: ShapeChange) -> ExResult<ShapeChange> {
        self.write(done.before.clone()).await?;
        Ok(done)
    }

    async fn reapply(&self, undone: ShapeChange) -> ExResult<ShapeChange> {
        self.write(undone.after.clone()).await?;
        Ok(undone)
    }
}
