use relabel_core_types::RequestId;
use thiserror::Error;

/// Result type alias using RelabelError
pub type Result<T> = std::result::Result<T, RelabelError>;

/// Result type alias for everything that crosses the remote boundary
pub type ExResult<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used by the UI layer (toasts),
/// by tests, and by the structured logging macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    NotFound,
    AlreadyExists,

    // Remote boundary
    ExternalService,
    Timeout,
    Serialization,

    // Composition / history
    /// A composite command failed after some of its steps already landed
    PartialComposite,
    /// A history entry was asked to undo/redo from the wrong state
    HistoryCorrupt,

    // Setup
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::PartialComposite => "ERR_PARTIAL_COMPOSITE",
            ExErrorKind::HistoryCorrupt => "ERR_HISTORY_CORRUPT",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the context a
/// user-visible report needs (which operation, which entity, which step of
/// a composite).
#[derive(Debug, Clone, PartialEq)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    step: Option<usize>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            step: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add the index of the failing composite step
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn step(&self) -> Option<usize> {
        self.step
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Innermost error of a source chain (the remote failure of a composite)
    pub fn root_cause(&self) -> &ExError {
        let mut current = self;
        while let Some(next) = current.source.as_deref() {
            current = next;
        }
        current
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(step) = self.step {
            write!(f, " (step: {})", step)?;
        }
        if let Some(source) = &self.source {
            write!(f, " <- {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain failures raised by the remote store, the cache and configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelabelError {
    #[error("Label not found: {label_id}")]
    LabelNotFound { label_id: String },

    #[error("Label class not found: {label_class_id}")]
    LabelClassNotFound { label_class_id: String },

    #[error("Image not found: {image_id}")]
    ImageNotFound { image_id: String },

    /// A create was issued with an id that is already live
    #[error("Entity already exists: {id}")]
    AlreadyExists { id: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The remote service rejected or failed the operation
    #[error("Remote operation '{op}' failed: {message}")]
    Remote { op: String, message: String },

    /// The remote call did not answer in time
    #[error("Remote operation '{op}' timed out")]
    Timeout { op: String },

    /// The remote answered with a payload of an unexpected shape
    #[error("Unexpected response to '{op}'")]
    UnexpectedResponse { op: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl From<RelabelError> for ExError {
    fn from(err: RelabelError) -> Self {
        match err {
            RelabelError::LabelNotFound { label_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(label_id)
                .with_message("Label not found"),

            RelabelError::LabelClassNotFound { label_class_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(label_class_id)
                    .with_message("Label class not found")
            }

            RelabelError::ImageNotFound { image_id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(image_id)
                .with_message("Image not found"),

            RelabelError::AlreadyExists { id } => ExError::new(ExErrorKind::AlreadyExists)
                .with_entity_id(id)
                .with_message("Entity already exists"),

            RelabelError::InvalidInput { reason } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(reason)
            }

            RelabelError::Remote { op, message } => ExError::new(ExErrorKind::ExternalService)
                .with_op(op)
                .with_message(message),

            RelabelError::Timeout { op } => ExError::new(ExErrorKind::Timeout)
                .with_op(op)
                .with_message("Remote operation timed out"),

            RelabelError::UnexpectedResponse { op } => ExError::new(ExErrorKind::Serialization)
                .with_op(op)
                .with_message("Unexpected response shape"),

            RelabelError::Config { reason } => {
                ExError::new(ExErrorKind::Config).with_message(reason)
            }
        }
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ExErrorKind::NotFound.code(), "ERR_NOT_FOUND");
        assert_eq!(ExErrorKind::PartialComposite.code(), "ERR_PARTIAL_COMPOSITE");
        assert_eq!(ExErrorKind::ExternalService.code(), "ERR_EXTERNAL_SERVICE");
    }

    #[test]
    fn test_label_not_found_conversion() {
        let err: ExError = RelabelError::LabelNotFound {
            label_id: "L1".to_string(),
        }
        .into();

        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(err.entity_id(), Some("L1"));
    }

    #[test]
    fn test_remote_failure_keeps_op_and_message() {
        let err: ExError = RelabelError::Remote {
            op: "createLabel".to_string(),
            message: "network down".to_string(),
        }
        .into();

        assert_eq!(err.code(), "ERR_EXTERNAL_SERVICE");
        assert_eq!(err.op(), Some("createLabel"));
        assert_eq!(err.message(), "network down");
    }

    #[test]
    fn test_root_cause_walks_source_chain() {
        let remote = ExError::new(ExErrorKind::ExternalService).with_message("boom");
        let wrapped = ExError::new(ExErrorKind::PartialComposite)
            .with_step(1)
            .with_source(remote.clone());

        assert_eq!(wrapped.root_cause(), &remote);
        assert!(wrapped.to_string().contains("ERR_PARTIAL_COMPOSITE"));
        assert!(wrapped.to_string().contains("boom"));
    }
}
