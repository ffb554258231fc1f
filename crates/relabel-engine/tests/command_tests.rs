// Integration tests for the labeling commands.
// Covers create/delete round trips, reassignment, merge-on-duplicate,
// composites and identity preservation across undo/redo.

mod common;

use common::{box_input, class_input, fixture, seed_class, seed_label, DATASET_ID};
use relabel_core::model::NewLabelClass;
use relabel_core::{ExErrorKind, Geometry, LabelType, UiStateStore};
use relabel_engine::commands::{
    create_label_class_and_create_label, create_label_class_and_update_label, pick_class_color,
    AssignLabelClass, Assignment, CreateLabel, DeleteLabel, Shape, UpdateLabelClassOfLabel,
    UpdateLabelGeometry,
};

// ---------------------------------------------------------------------------
// create_label / delete_label
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_label_undo_redo_round_trip() {
    let f = fixture();
    f.ui.set_selected_label_id(Some("previous".to_string()));

    let command = CreateLabel::new(box_input(10.0, None), f.ctx.clone());
    let id = command.id().to_string();
    let created = f.coordinator.perform(command).await.unwrap();

    assert_eq!(created.label.id, id);
    assert_eq!(f.ui.selected_label_id(), Some(id.clone()));
    assert!(f.remote.cache().label(&id).is_some());

    f.coordinator.undo().await.unwrap();
    assert!(f.remote.label(&id).is_none());
    assert!(f.remote.cache().label(&id).is_none());
    assert_eq!(f.ui.selected_label_id(), Some("previous".to_string()));

    f.coordinator.redo().await.unwrap();
    // Same id and the exact record, timestamps included
    assert_eq!(f.remote.label(&id), Some(created.label));
    assert_eq!(f.ui.selected_label_id(), Some(id));
}

#[tokio::test]
async fn test_delete_label_undo_recreates_same_record() {
    let f = fixture();
    let original = seed_label(&f.remote, "L1", LabelType::Polygon, None);
    f.ui.set_selected_label_id(Some("L1".to_string()));

    let deleted = f
        .coordinator
        .perform(DeleteLabel::new("L1", f.ctx.clone()))
        .await
        .unwrap();

    assert!(deleted.was_selected);
    assert!(f.remote.label("L1").is_none());
    assert_eq!(f.ui.selected_label_id(), None);

    f.coordinator.undo().await.unwrap();
    assert_eq!(f.remote.label("L1"), Some(original));
    assert_eq!(f.ui.selected_label_id(), Some("L1".to_string()));

    f.coordinator.redo().await.unwrap();
    assert!(f.remote.label("L1").is_none());
    assert_eq!(
        f.remote.mutation_names(),
        vec!["deleteLabel", "createLabel", "deleteLabel"]
    );
}

#[tokio::test]
async fn test_delete_missing_label_fails_without_history() {
    let f = fixture();

    let err = f
        .coordinator
        .perform(DeleteLabel::new("missing", f.ctx.clone()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert!(!f.coordinator.can_undo());
    assert!(f.remote.mutations().is_empty());
}

// ---------------------------------------------------------------------------
// update_label_geometry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_update_geometry_round_trip() {
    let f = fixture();
    let original = seed_label(&f.remote, "L1", LabelType::Box, None);
    let moved = Shape {
        geometry: Geometry::rectangle(0.0, 0.0, 5.0, 5.0),
        smart_tool_input: None,
    };

    f.coordinator
        .perform(UpdateLabelGeometry::new("L1", moved.clone(), f.ctx.clone()))
        .await
        .unwrap();
    assert_eq!(f.remote.label("L1").unwrap().geometry, moved.geometry);

    f.coordinator.undo().await.unwrap();
    assert_eq!(f.remote.label("L1").unwrap().geometry, original.geometry);

    f.coordinator.redo().await.unwrap();
    assert_eq!(f.remote.label("L1").unwrap().geometry, moved.geometry);
}

// ---------------------------------------------------------------------------
// update_label_class_of_label
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_reassign_class_moves_class_selection() {
    let f = fixture();
    seed_class(&f.remote, "C1", "car");
    seed_class(&f.remote, "C2", "bike");
    seed_label(&f.remote, "L1", LabelType::Box, Some("C1"));

    let previous = f
        .coordinator
        .perform(UpdateLabelClassOfLabel::new(
            "L1",
            Some("C2".to_string()),
            f.ctx.clone(),
        ))
        .await
        .unwrap();

    assert_eq!(previous, Some("C1".to_string()));
    assert_eq!(f.ui.selected_label_class_id(), Some("C2".to_string()));

    f.coordinator.undo().await.unwrap();
    assert_eq!(
        f.remote.label("L1").unwrap().label_class_id,
        Some("C1".to_string())
    );
    assert_eq!(f.ui.selected_label_class_id(), Some("C1".to_string()));
}

#[tokio::test]
async fn test_reassign_to_unknown_class_is_rejected() {
    let f = fixture();
    seed_label(&f.remote, "L1", LabelType::Box, None);

    let err = f
        .coordinator
        .perform(UpdateLabelClassOfLabel::new(
            "L1",
            Some("nope".to_string()),
            f.ctx.clone(),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(f.remote.label("L1").unwrap().label_class_id, None);
}

// ---------------------------------------------------------------------------
// assign_label_class (merge-on-duplicate)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_assign_duplicate_classification_merges_label_away() {
    // GIVEN: two classification labels of one image, classes C1 and C2
    let f = fixture();
    seed_class(&f.remote, "C1", "day");
    seed_class(&f.remote, "C2", "night");
    seed_label(&f.remote, "A", LabelType::Classification, Some("C1"));
    let b = seed_label(&f.remote, "B", LabelType::Classification, Some("C2"));

    // WHEN: B is assigned C1
    let done = f
        .coordinator
        .perform(AssignLabelClass::new(
            "B",
            Some("C1".to_string()),
            f.ctx.clone(),
        ))
        .await
        .unwrap();

    // THEN: B is deleted instead of duplicating C1
    assert!(matches!(done, Assignment::MergedAway(_)));
    assert!(f.remote.label("B").is_none());
    assert_eq!(
        f.remote.label("A").unwrap().label_class_id,
        Some("C1".to_string())
    );

    // AND: undo restores B with its original class
    f.coordinator.undo().await.unwrap();
    assert_eq!(f.remote.label("B"), Some(b));

    // AND: redo merges it away again
    f.coordinator.redo().await.unwrap();
    assert!(f.remote.label("B").is_none());
}

#[tokio::test]
async fn test_assign_without_duplicate_reassigns() {
    let f = fixture();
    seed_class(&f.remote, "C1", "day");
    seed_class(&f.remote, "C2", "night");
    seed_label(&f.remote, "A", LabelType::Classification, Some("C1"));

    let done = f
        .coordinator
        .perform(AssignLabelClass::new(
            "A",
            Some("C2".to_string()),
            f.ctx.clone(),
        ))
        .await
        .unwrap();

    assert_eq!(
        done,
        Assignment::Reassigned {
            previous_class_id: Some("C1".to_string())
        }
    );

    f.coordinator.undo().await.unwrap();
    assert_eq!(
        f.remote.label("A").unwrap().label_class_id,
        Some("C1".to_string())
    );
}

#[tokio::test]
async fn test_duplicate_check_only_applies_to_classifications() {
    let f = fixture();
    seed_class(&f.remote, "C1", "car");
    seed_label(&f.remote, "box-a", LabelType::Box, Some("C1"));
    seed_label(&f.remote, "box-b", LabelType::Box, None);

    let done = f
        .coordinator
        .perform(AssignLabelClass::new(
            "box-b",
            Some("C1".to_string()),
            f.ctx.clone(),
        ))
        .await
        .unwrap();

    assert!(matches!(done, Assignment::Reassigned { .. }));
    assert_eq!(f.remote.labels().len(), 2);
}

// ---------------------------------------------------------------------------
// composites
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_class_and_update_label_order() {
    // GIVEN: a label of class C1 that is also the selected class
    let f = fixture();
    seed_class(&f.remote, "C1", "car");
    seed_label(&f.remote, "L1", LabelType::Box, Some("C1"));
    f.ui.set_selected_label_class_id(Some("C1".to_string()));

    // WHEN: a new class is created from the picker for L1
    let composite = create_label_class_and_update_label(class_input("truck"), "L1", &f.ctx);
    f.coordinator.perform(composite).await.unwrap();

    let class = f
        .remote
        .label_classes()
        .into_iter()
        .find(|c| c.name == "truck")
        .unwrap();
    assert_eq!(f.remote.label("L1").unwrap().label_class_id, Some(class.id.clone()));
    assert_eq!(f.ui.selected_label_class_id(), Some(class.id.clone()));

    // THEN: undo restores the label before deleting the class
    f.coordinator.undo().await.unwrap();
    assert_eq!(
        f.remote.mutation_names(),
        vec!["createLabelClass", "updateLabel", "updateLabel", "deleteLabelClass"]
    );
    assert_eq!(f.remote.label("L1").unwrap().label_class_id, Some("C1".to_string()));
    assert_eq!(f.ui.selected_label_class_id(), Some("C1".to_string()));

    // AND: redo recreates the class under the same id and index
    f.coordinator.redo().await.unwrap();
    assert_eq!(f.remote.label_class(&class.id), Some(class.clone()));
    assert_eq!(f.remote.label("L1").unwrap().label_class_id, Some(class.id));
}

#[tokio::test]
async fn test_redo_keeps_references_between_created_entities() {
    let f = fixture();
    let composite =
        create_label_class_and_create_label(class_input("tree"), box_input(5.0, None), &f.ctx);

    f.coordinator.perform(composite).await.unwrap();
    let label = f.remote.labels().pop().unwrap();
    let class_id = label.label_class_id.clone().unwrap();

    f.coordinator.undo().await.unwrap();
    assert!(f.remote.labels().is_empty());
    assert!(f.remote.label_classes().is_empty());

    f.coordinator.redo().await.unwrap();
    assert_eq!(f.remote.label(&label.id), Some(label));
    assert!(f.remote.label_class(&class_id).is_some());
}

#[tokio::test]
async fn test_composite_partial_failure_is_reported_not_rolled_back() {
    let f = fixture();
    f.remote.fail_next("createLabel", "quota exceeded");

    let composite =
        create_label_class_and_create_label(class_input("tree"), box_input(5.0, None), &f.ctx);
    let err = f.coordinator.perform(composite).await.unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::PartialComposite);
    assert_eq!(err.step(), Some(1));
    assert_eq!(err.root_cause().message(), "quota exceeded");
    // The class landed and stays; nothing was recorded
    assert_eq!(f.remote.label_classes().len(), 1);
    assert!(!f.coordinator.can_undo());
}

// ---------------------------------------------------------------------------
// side effects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_cache_failure_does_not_fail_command() {
    let f = fixture();
    f.remote.fail_cache_updates(true);

    let created = f
        .coordinator
        .perform(CreateLabel::new(box_input(1.0, None), f.ctx.clone()))
        .await
        .unwrap();

    assert!(f.remote.label(&created.label.id).is_some());
    assert!(f.remote.cache().label(&created.label.id).is_none());
    assert!(f.coordinator.can_undo());
}

#[tokio::test]
async fn test_pick_class_color_continues_palette() {
    let f = fixture();
    let palette = vec!["#111111".to_string(), "#222222".to_string()];

    assert_eq!(
        pick_class_color(&f.ctx, DATASET_ID, &palette).await.unwrap(),
        "#111111"
    );

    f.remote
        .seed_label_class(NewLabelClass {
            id: "C1".to_string(),
            dataset_id: DATASET_ID.to_string(),
            name: "car".to_string(),
            color: "#111111".to_string(),
            index: None,
        })
        .unwrap();

    assert_eq!(
        pick_class_color(&f.ctx, DATASET_ID, &palette).await.unwrap(),
        "#222222"
    );
}
