//! UI-state store
//!
//! The editor keeps "what is selected" outside the remote store. Commands
//! read the current value before changing it so `revert` can put it back.
//! A selection is valid on its own, so a lock poisoned by a panicking
//! writer is recovered rather than treated as lost state.

use std::sync::{PoisonError, RwLock};

pub trait UiStateStore: Send + Sync {
    fn selected_label_id(&self) -> Option<String>;
    fn set_selected_label_id(&self, id: Option<String>);
    fn selected_label_class_id(&self) -> Option<String>;
    fn set_selected_label_class_id(&self, id: Option<String>);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub label_id: Option<String>,
    pub label_class_id: Option<String>,
}

/// In-memory [`UiStateStore`]
#[derive(Debug, Default)]
pub struct EditorState {
    selection: RwLock<Selection>,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(selection: Selection) -> Self {
        Self {
            selection: RwLock::new(selection),
        }
    }

    pub fn snapshot(&self) -> Selection {
        self.selection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write(&self, f: impl FnOnce(&mut Selection)) {
        f(&mut self.selection.write().unwrap_or_else(PoisonError::into_inner));
    }
}

impl UiStateStore for EditorState {
    fn selected_label_id(&self) -> Option<String> {
        self.snapshot().label_id
    }

    fn set_selected_label_id(&self, id: Option<String>) {
        self.write(|s| s.label_id = id);
    }

    fn selected_label_class_id(&self) -> Option<String> {
        self.snapshot().label_class_id
    }

    fn set_selected_label_class_id(&self, id: Option<String>) {
        self.write(|s| s.label_class_id = id);
    }
}
