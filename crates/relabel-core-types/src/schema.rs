//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent between the logging macros,
//! the error facility and test assertions.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Entity identifiers
pub const FIELD_LABEL_ID: &str = "label_id";
pub const FIELD_LABEL_CLASS_ID: &str = "label_class_id";
pub const FIELD_IMAGE_ID: &str = "image_id";

// History
pub const FIELD_EFFECT: &str = "effect";
pub const FIELD_UNDO_DEPTH: &str = "undo_depth";
pub const FIELD_REDO_DEPTH: &str = "redo_depth";

// Inference
pub const FIELD_SEQ: &str = "seq";
pub const FIELD_LATEST_SEQ: &str = "latest_seq";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";
pub const FIELD_ERR_MESSAGE: &str = "err_message";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_NOOP: &str = "noop";

// Coordinator operations
pub const OP_PERFORM: &str = "perform";
pub const OP_UNDO: &str = "undo";
pub const OP_REDO: &str = "redo";
