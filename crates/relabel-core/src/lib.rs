//! relabel core - reversible commands over a remote-backed annotation store
//!
//! This crate provides the building blocks the engine composes:
//! - the [`Effect`] abstraction (apply / revert / reapply) and [`Composite`]
//! - the Remote Operation Interface ([`RemoteOperations`]) and [`LocalCache`]
//! - the UI-state store ([`UiStateStore`])
//! - the domain model (images, labels, label classes)
//! - error, logging and configuration facilities

pub mod cache;
pub mod composite;
pub mod config;
pub mod effect;
pub mod errors;
pub mod inference;
pub mod logging_facility;
pub mod model;
pub mod palette;
pub mod remote;
pub mod ui_state;

// Re-export commonly used types
pub use cache::LocalCache;
pub use composite::{compose, Composite};
pub use config::EngineConfig;
pub use effect::{downcast_outcome, DynEffect, Effect, Outcome};
pub use errors::{ExError, ExErrorKind, ExResult, RelabelError, Result};
pub use model::{Geometry, Image, Label, LabelClass, LabelType};
pub use remote::{Mutation, MutationData, Query, QueryData, RemoteOperations};
pub use ui_state::{EditorState, Selection, UiStateStore};
