//! Relabel Engine - Orchestration layer
//!
//! Owns the undo/redo history and the labeling commands that run through
//! it. Commands reach the remote store through
//! [`relabel_core::RemoteOperations`] and the selection through
//! [`relabel_core::UiStateStore`]; the [`Coordinator`] serializes them.

pub mod commands;
pub mod coordinator;
pub mod inference;
pub mod memory;

pub use commands::CommandContext;
pub use coordinator::{Coordinator, HistorySnapshot, HistoryStatus};
pub use inference::{InferenceOutcome, InferenceSequencer, InferenceSession, RunInference};
pub use memory::InMemoryRemote;
