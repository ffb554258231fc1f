//! Labeling commands
//!
//! Every command is an [`Effect`](relabel_core::Effect) constructed fresh
//! per user action. Ids of entities a command creates are generated at
//! construction time, so `reapply` recreates them under the same id and a
//! composite can hand the id to a later step before anything ran.
//!
//! ## Side effects
//!
//! Each step issues its remote mutation first; only once the remote has
//! accepted it are the selection and the local cache updated. A cache
//! refresh that fails is logged and swallowed since the remote already
//! holds the truth.

pub mod assign_label_class;
pub mod composites;
pub mod create_label;
pub mod create_label_class;
pub mod delete_label;
pub mod update_label_class;
pub mod update_label_geometry;

use std::sync::Arc;

use relabel_core::cache::LocalCache;
use relabel_core::remote::LabelUpdate;
use relabel_core::{
    ExResult, Image, Label, LabelClass, Mutation, Query, QueryData, RelabelError,
    RemoteOperations, UiStateStore,
};

pub use assign_label_class::{AssignLabelClass, Assignment};
pub use composites::{
    create_label_class_and_create_label, create_label_class_and_update_label, pick_class_color,
};
pub use create_label::{CreateLabel, CreateLabelInput, CreatedLabel};
pub use create_label_class::{CreateLabelClass, CreateLabelClassInput, CreatedLabelClass};
pub use delete_label::{DeleteLabel, DeletedLabel};
pub use update_label_class::UpdateLabelClassOfLabel;
pub use update_label_geometry::{Shape, ShapeChange, UpdateLabelGeometry};

/// Handles every command carries
#[derive(Clone)]
pub struct CommandContext {
    pub remote: Arc<dyn RemoteOperations>,
    pub ui: Arc<dyn UiStateStore>,
}

impl CommandContext {
    pub fn new(remote: Arc<dyn RemoteOperations>, ui: Arc<dyn UiStateStore>) -> Self {
        Self { remote, ui }
    }

    pub(crate) async fn fetch_label(&self, id: &str) -> ExResult<Label> {
        let data = self
            .remote
            .query(Query::Label { id: id.to_string() })
            .await?;
        match data {
            QueryData::Label(Some(label)) => Ok(label),
            QueryData::Label(None) => Err(RelabelError::LabelNotFound {
                label_id: id.to_string(),
            }
            .into()),
            _ => Err(unexpected("getLabel")),
        }
    }

    pub(crate) async fn fetch_image(&self, id: &str) -> ExResult<Image> {
        match self.remote.query(Query::Image { id: id.to_string() }).await? {
            QueryData::Image(Some(image)) => Ok(image),
            QueryData::Image(None) => Err(RelabelError::ImageNotFound {
                image_id: id.to_string(),
            }
            .into()),
            _ => Err(unexpected("getImage")),
        }
    }

    pub(crate) async fn fetch_image_labels(&self, image_id: &str) -> ExResult<Vec<Label>> {
        let query = Query::ImageLabels {
            image_id: image_id.to_string(),
        };
        match self.remote.query(query).await? {
            QueryData::Labels(labels) => Ok(labels),
            _ => Err(unexpected("getImageLabels")),
        }
    }

    pub(crate) async fn fetch_label_classes(&self, dataset_id: &str) -> ExResult<Vec<LabelClass>> {
        let query = Query::LabelClasses {
            dataset_id: dataset_id.to_string(),
        };
        match self.remote.query(query).await? {
            QueryData::LabelClasses(classes) => Ok(classes),
            _ => Err(unexpected("getLabelClassesOfDataset")),
        }
    }

    /// Issue a mutation that answers with the resulting label
    pub(crate) async fn mutate_label(&self, mutation: Mutation) -> ExResult<Label> {
        let op = mutation.name();
        self.remote.mutate(mutation).await?.into_label(op)
    }

    pub(crate) async fn update_label(&self, id: &str, data: LabelUpdate) -> ExResult<Label> {
        let label = self
            .mutate_label(Mutation::UpdateLabel {
                id: id.to_string(),
                data,
            })
            .await?;
        self.refresh_cache(|cache| cache.put_label(label.clone()));
        Ok(label)
    }

    pub(crate) async fn delete_label(&self, id: &str) -> ExResult<()> {
        self.remote
            .mutate(Mutation::DeleteLabel { id: id.to_string() })
            .await?;
        self.refresh_cache(|cache| {
            cache.evict_label(id);
        });
        Ok(())
    }

    /// Reflect an accepted mutation in the local cache
    pub(crate) fn refresh_cache(&self, mut update: impl FnMut(&mut LocalCache)) {
        if let Err(err) = self.remote.update_cache(&mut update) {
            tracing::warn!(
                err_code = err.code(),
                err_message = err.message(),
                "local cache refresh failed, remote state is unaffected"
            );
        }
    }
}

fn unexpected(op: &str) -> relabel_core::ExError {
    RelabelError::UnexpectedResponse { op: op.to_string() }.into()
}

/// Client-generated id for a new entity
pub(crate) fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
