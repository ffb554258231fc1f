//! Create a label class and select it

use async_trait::async_trait;
use relabel_core::model::NewLabelClass;
use relabel_core::{Effect, ExResult, LabelClass, Mutation};

use super::{new_id, CommandContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLabelClassInput {
    pub dataset_id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedLabelClass {
    pub label_class: LabelClass,
    pub previous_selection: Option<String>,
}

pub struct CreateLabelClass {
    id: String,
    input: CreateLabelClassInput,
    ctx: CommandContext,
}

impl CreateLabelClass {
    pub fn new(input: CreateLabelClassInput, ctx: CommandContext) -> Self {
        Self::with_id(new_id(), input, ctx)
    }

    pub fn with_id(
        id: impl Into<String>,
        input: CreateLabelClassInput,
        ctx: CommandContext,
    ) -> Self {
        Self {
            id: id.into(),
            input,
            ctx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    async fn create(
        &self,
        data: NewLabelClass,
        previous_selection: Option<String>,
    ) -> ExResult<CreatedLabelClass> {
        let op = "createLabelClass";
        let label_class = self
            .ctx
            .remote
            .mutate(Mutation::CreateLabelClass(data))
            .await?
            .into_label_class(op)?;
        self.ctx
            .ui
            .set_selected_label_class_id(Some(label_class.id.clone()));
        self.ctx
            .refresh_cache(|cache| cache.put_label_class(label_class.clone()));
        Ok(CreatedLabelClass {
            label_class,
            previous_selection,
        })
    }
}

#[async_trait]
impl Effect for CreateLabelClass {
    type Done = CreatedLabelClass;
    type Undone = CreatedLabelClass;

    fn name(&self) -> &str {
        "create_label_class"
    }

    async fn apply(&self) -> ExResult<CreatedLabelClass> {
        let data = NewLabelClass {
            id: self.id.clone(),
            dataset_id: self.input.dataset_id.clone(),
            name: self.input.name.clone(),
            color: self.input.color.clone(),
            index: None,
        };
        let previous = self.ctx.ui.selected_label_class_id();
        self.create(data, previous).await
    }

    async fn revert(&self, done: CreatedLabelClass) -> ExResult<CreatedLabelClass> {
        let id = done.label_class.id.clone();
        self.ctx
            .remote
            .mutate(Mutation::DeleteLabelClass { id: id.clone() })
            .await?;
        self.ctx.refresh_cache(|cache| {
            cache.evict_label_class(&id);
        });
        self.ctx
            .ui
            .set_selected_label_class_id(done.previous_selection.clone());
        Ok(done)
    }

    /// Recreates the class with its original id and position
    async fn reapply(&self, undone: CreatedLabelClass) -> ExResult<CreatedLabelClass> {
        let data = NewLabelClass::from(&undone.label_class);
        self.create(data, undone.previous_selection).await
    }
}
