//! Remote Operation Interface
//!
//! The authoritative store is reached through named mutations and queries.
//! [`Mutation`] and [`Query`] are typed, but each one still knows its wire
//! `name()` and `variables()` so a GraphQL-style transport can forward them
//! as `mutate(name, variables)` without a second schema.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::cache::LocalCache;
use crate::errors::{ExResult, RelabelError};
use crate::inference::{InferenceRequest, InferenceResponse};
use crate::model::{Geometry, Image, Label, LabelClass, NewLabel, NewLabelClass, SmartToolInput};

/// Partial update of a label. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_class_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_tool_input: Option<Option<SmartToolInput>>,
}

impl LabelUpdate {
    pub fn class(label_class_id: Option<String>) -> Self {
        Self {
            label_class_id: Some(label_class_id),
            ..Self::default()
        }
    }

    pub fn shape(geometry: Geometry, smart_tool_input: Option<SmartToolInput>) -> Self {
        Self {
            geometry: Some(geometry),
            smart_tool_input: Some(smart_tool_input),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateLabel(NewLabel),
    UpdateLabel { id: String, data: LabelUpdate },
    DeleteLabel { id: String },
    CreateLabelClass(NewLabelClass),
    DeleteLabelClass { id: String },
    RunInference(InferenceRequest),
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CreateLabel(_) => "createLabel",
            Mutation::UpdateLabel { .. } => "updateLabel",
            Mutation::DeleteLabel { .. } => "deleteLabel",
            Mutation::CreateLabelClass(_) => "createLabelClass",
            Mutation::DeleteLabelClass { .. } => "deleteLabelClass",
            Mutation::RunInference(_) => "runIog",
        }
    }

    /// # Errors
    ///
    /// Returns a serialization error if a payload cannot be encoded.
    pub fn variables(&self) -> ExResult<Value> {
        Ok(match self {
            Mutation::CreateLabel(data) => json!({ "data": data }),
            Mutation::UpdateLabel { id, data } => json!({ "where": { "id": id }, "data": data }),
            Mutation::DeleteLabel { id } | Mutation::DeleteLabelClass { id } => {
                json!({ "where": { "id": id } })
            }
            Mutation::CreateLabelClass(data) => json!({ "data": data }),
            Mutation::RunInference(data) => json!({ "data": serde_json::to_value(data)? }),
        })
    }

    /// Id of the entity the mutation targets
    pub fn target_id(&self) -> &str {
        match self {
            Mutation::CreateLabel(data) => &data.id,
            Mutation::UpdateLabel { id, .. }
            | Mutation::DeleteLabel { id }
            | Mutation::DeleteLabelClass { id } => id,
            Mutation::CreateLabelClass(data) => &data.id,
            Mutation::RunInference(data) => &data.label_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationData {
    Label(Label),
    LabelClass(LabelClass),
    Deleted { id: String },
    Inference(InferenceResponse),
}

impl MutationData {
    /// # Errors
    ///
    /// `UnexpectedResponse` when the payload is not a label.
    pub fn into_label(self, op: &str) -> ExResult<Label> {
        match self {
            MutationData::Label(label) => Ok(label),
            _ => Err(unexpected(op)),
        }
    }

    /// # Errors
    ///
    /// `UnexpectedResponse` when the payload is not a label class.
    pub fn into_label_class(self, op: &str) -> ExResult<LabelClass> {
        match self {
            MutationData::LabelClass(class) => Ok(class),
            _ => Err(unexpected(op)),
        }
    }

    /// # Errors
    ///
    /// `UnexpectedResponse` when the payload is not an inference result.
    pub fn into_inference(self, op: &str) -> ExResult<InferenceResponse> {
        match self {
            MutationData::Inference(response) => Ok(response),
            _ => Err(unexpected(op)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Label { id: String },
    Image { id: String },
    ImageLabels { image_id: String },
    LabelClasses { dataset_id: String },
}

impl Query {
    pub fn name(&self) -> &'static str {
        match self {
            Query::Label { .. } => "getLabel",
            Query::Image { .. } => "getImage",
            Query::ImageLabels { .. } => "getImageLabels",
            Query::LabelClasses { .. } => "getLabelClassesOfDataset",
        }
    }

    pub fn variables(&self) -> Value {
        match self {
            Query::Label { id } | Query::Image { id } => json!({ "id": id }),
            Query::ImageLabels { image_id } => json!({ "imageId": image_id }),
            Query::LabelClasses { dataset_id } => json!({ "datasetId": dataset_id }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Label(Option<Label>),
    Image(Option<Image>),
    Labels(Vec<Label>),
    LabelClasses(Vec<LabelClass>),
}

fn unexpected(op: &str) -> crate::errors::ExError {
    RelabelError::UnexpectedResponse { op: op.to_string() }.into()
}

/// The external collaborator every domain command talks to
#[async_trait]
pub trait RemoteOperations: Send + Sync {
    async fn mutate(&self, mutation: Mutation) -> ExResult<MutationData>;

    async fn query(&self, query: Query) -> ExResult<QueryData>;

    /// Reflect a mutation result into the local read cache
    ///
    /// # Errors
    ///
    /// Returns an error when the cache cannot be written; callers report it
    /// separately and never roll back the remote write because of it.
    fn update_cache(&self, update: &mut dyn FnMut(&mut LocalCache)) -> ExResult<()>;
}
