//! Multi-step commands recorded as one history entry
//!
//! Creating a class from the class picker either relabels an existing
//! label or creates a new one with it. Both are one undo step for the
//! user; undoing restores the label first and deletes the class after.

use relabel_core::palette::next_class_color;
use relabel_core::{Composite, ExResult};

use super::{
    CommandContext, CreateLabel, CreateLabelClass, CreateLabelClassInput, CreateLabelInput,
    UpdateLabelClassOfLabel,
};

/// Create a class, then point `label_id` at it
pub fn create_label_class_and_update_label(
    class: CreateLabelClassInput,
    label_id: impl Into<String>,
    ctx: &CommandContext,
) -> Composite {
    let create = CreateLabelClass::new(class, ctx.clone());
    let class_id = create.id().to_string();
    Composite::new("create_label_class_and_update_label")
        .then(create)
        .then(UpdateLabelClassOfLabel::new(
            label_id,
            Some(class_id),
            ctx.clone(),
        ))
}

/// Create a class, then a label of that class. `label.label_class_id` is
/// overwritten with the new class.
pub fn create_label_class_and_create_label(
    class: CreateLabelClassInput,
    mut label: CreateLabelInput,
    ctx: &CommandContext,
) -> Composite {
    let create = CreateLabelClass::new(class, ctx.clone());
    label.label_class_id = Some(create.id().to_string());
    Composite::new("create_label_class_and_create_label")
        .then(create)
        .then(CreateLabel::new(label, ctx.clone()))
}

/// Color for the next class of a dataset, continuing the palette after the
/// most recently created class
///
/// # Errors
///
/// Fails when the dataset's classes cannot be queried.
pub async fn pick_class_color(
    ctx: &CommandContext,
    dataset_id: &str,
    palette: &[String],
) -> ExResult<String> {
    let existing: Vec<String> = ctx
        .fetch_label_classes(dataset_id)
        .await?
        .into_iter()
        .map(|class| class.color)
        .collect();
    Ok(next_class_color(palette, &existing))
}
