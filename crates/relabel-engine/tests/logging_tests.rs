// Lifecycle logging emitted by the coordinator.
// The capture subscriber is global to this test binary, so every assertion
// filters on the effect name or error code unique to its test.

mod common;

use common::{box_input, fixture, seed_label};
use relabel_core::logging_facility::init_test_capture;
use relabel_core::LabelType;
use relabel_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_NOOP, EVENT_START, FIELD_DURATION_MS, FIELD_EFFECT,
    FIELD_ERR_CODE, FIELD_ERR_MESSAGE, FIELD_REQUEST_ID,
};
use relabel_engine::commands::{CreateLabel, DeleteLabel};

#[tokio::test]
async fn test_perform_logs_start_and_end() {
    let capture = init_test_capture();
    let f = fixture();

    f.coordinator
        .perform(CreateLabel::new(box_input(1.0, None), f.ctx.clone()))
        .await
        .unwrap();

    let ends = capture.matching(|e| {
        e.is("perform", EVENT_END) && e.field(FIELD_EFFECT) == Some("create_label")
    });
    assert!(!ends.is_empty());
    assert!(ends[0].field(FIELD_DURATION_MS).is_some());
    assert!(ends[0].field(FIELD_REQUEST_ID).is_some());
    capture.assert_event_exists("perform", EVENT_START);
}

#[tokio::test]
async fn test_failed_undo_logs_error_code() {
    let capture = init_test_capture();
    let f = fixture();
    seed_label(&f.remote, "L1", LabelType::Box, None);
    f.coordinator
        .perform(DeleteLabel::new("L1", f.ctx.clone()))
        .await
        .unwrap();
    f.remote.fail_next("createLabel", "undo rejected");

    f.coordinator.undo().await.unwrap_err();

    let errors = capture.matching(|e| {
        e.is("undo", EVENT_END_ERROR) && e.field(FIELD_ERR_MESSAGE) == Some("undo rejected")
    });
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field(FIELD_ERR_CODE), Some("ERR_EXTERNAL_SERVICE"));
    assert_eq!(errors[0].field(FIELD_EFFECT), Some("delete_label"));
}

#[tokio::test]
async fn test_empty_redo_logs_noop() {
    let capture = init_test_capture();
    let f = fixture();

    f.coordinator.redo().await.unwrap();

    assert!(capture.count_events(|e| e.is("redo", EVENT_NOOP)) >= 1);
}

#[tokio::test]
async fn test_failed_perform_error_carries_logged_request_id() {
    // GIVEN: a remote that rejects the next label creation
    let capture = init_test_capture();
    let f = fixture();
    f.remote.fail_next("createLabel", "quota exceeded");

    // WHEN: the create is performed
    let err = f
        .coordinator
        .perform(CreateLabel::new(box_input(2.0, None), f.ctx.clone()))
        .await
        .unwrap_err();

    // THEN: the returned error and the end_error event share one request id
    let request_id = err.request_id().expect("error should carry a request id");
    let errors = capture.matching(|e| {
        e.is("perform", EVENT_END_ERROR) && e.field(FIELD_ERR_MESSAGE) == Some("quota exceeded")
    });
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field(FIELD_REQUEST_ID), Some(request_id.as_str()));
}

#[tokio::test]
async fn test_failed_undo_error_carries_request_id() {
    let f = fixture();
    seed_label(&f.remote, "L2", LabelType::Box, None);
    f.coordinator
        .perform(DeleteLabel::new("L2", f.ctx.clone()))
        .await
        .unwrap();
    f.remote.fail_next("createLabel", "restore rejected");

    let err = f.coordinator.undo().await.unwrap_err();

    assert!(err.request_id().is_some());
    assert_eq!(err.message(), "restore rejected");
}
