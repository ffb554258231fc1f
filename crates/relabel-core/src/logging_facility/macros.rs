//! Lifecycle logging macros
//!
//! Every lifecycle event carries the same keys, taken from
//! `relabel_core_types::schema`, so the capture layer and log queries can
//! rely on them. `component` must stay the first field: a leading
//! `{ CONST } = value` would be parsed by `tracing` as a format string.
//! Extra fields follow the fixed ones and may use either form.

/// Emit `start` for `$op`
///
/// ```
/// # use relabel_core::log_op_start;
/// log_op_start!("perform");
/// log_op_start!("perform", effect = "create_label");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            { relabel_core_types::schema::FIELD_OP } = $op,
            { relabel_core_types::schema::FIELD_EVENT } = relabel_core_types::schema::EVENT_START,
            $($($field)*)?
        );
    };
}

/// Emit `end` for `$op` with the time it took
///
/// ```
/// # use relabel_core::log_op_end;
/// log_op_end!("undo", duration_ms = 42);
/// log_op_end!("undo", duration_ms = 42, effect = "delete_label");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            { relabel_core_types::schema::FIELD_OP } = $op,
            { relabel_core_types::schema::FIELD_EVENT } = relabel_core_types::schema::EVENT_END,
            { relabel_core_types::schema::FIELD_DURATION_MS } = $duration,
            $($($field)*)?
        );
    };
}

/// Emit `end_error` for `$op`, flattening `$err` into kind, code and message
///
/// `$err` is anything convertible into `ExError`.
///
/// ```
/// # use relabel_core::{log_op_error, errors::RelabelError};
/// let err = RelabelError::LabelNotFound { label_id: "L1".to_string() };
/// log_op_error!("undo", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            { relabel_core_types::schema::FIELD_OP } = $op,
            { relabel_core_types::schema::FIELD_EVENT } = relabel_core_types::schema::EVENT_END_ERROR,
            { relabel_core_types::schema::FIELD_DURATION_MS } = $duration,
            { relabel_core_types::schema::FIELD_ERR_KIND } = ?ex_err.kind(),
            { relabel_core_types::schema::FIELD_ERR_CODE } = ex_err.code(),
            { relabel_core_types::schema::FIELD_ERR_MESSAGE } = ex_err.message(),
            $($($field)*)?
        );
    }};
}
