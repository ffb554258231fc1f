//! In-memory remote store
//!
//! Authoritative stand-in for the labeling backend: enforces id uniqueness
//! and existence, assigns class indices, answers inference requests with a
//! deterministic mask, and records every mutation it receives in order.
//! Failures can be injected for upcoming mutations.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use relabel_core::cache::LocalCache;
use relabel_core::errors::{ExError, ExErrorKind, Result};
use relabel_core::inference::{InferenceRequest, InferenceResponse};
use relabel_core::model::{NewLabel, NewLabelClass};
use relabel_core::remote::LabelUpdate;
use relabel_core::{
    ExResult, Geometry, Image, Label, LabelClass, Mutation, MutationData, Query, QueryData,
    RelabelError, RemoteOperations,
};

#[derive(Debug, Default)]
struct Store {
    images: BTreeMap<String, Image>,
    labels: BTreeMap<String, Label>,
    label_classes: BTreeMap<String, LabelClass>,
}

impl Store {
    fn label(&self, id: &str) -> Result<&Label> {
        self.labels.get(id).ok_or_else(|| RelabelError::LabelNotFound {
            label_id: id.to_string(),
        })
    }

    fn require_class(&self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) if !self.label_classes.contains_key(id) => {
                Err(RelabelError::LabelClassNotFound {
                    label_class_id: id.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    fn create_label(&mut self, data: NewLabel) -> Result<Label> {
        if !self.images.contains_key(&data.image_id) {
            return Err(RelabelError::ImageNotFound {
                image_id: data.image_id,
            });
        }
        if self.labels.contains_key(&data.id) {
            return Err(RelabelError::AlreadyExists { id: data.id });
        }
        self.require_class(data.label_class_id.as_deref())?;

        let created_at = data.created_at.unwrap_or_else(Utc::now);
        let label = Label {
            id: data.id,
            image_id: data.image_id,
            label_type: data.label_type,
            geometry: data.geometry,
            label_class_id: data.label_class_id,
            smart_tool_input: data.smart_tool_input,
            created_at,
            updated_at: created_at,
        };
        self.labels.insert(label.id.clone(), label.clone());
        Ok(label)
    }

    fn update_label(&mut self, id: &str, data: LabelUpdate) -> Result<Label> {
        if let Some(class_id) = &data.label_class_id {
            self.require_class(class_id.as_deref())?;
        }
        let label = self
            .labels
            .get_mut(id)
            .ok_or_else(|| RelabelError::LabelNotFound {
                label_id: id.to_string(),
            })?;
        if let Some(class_id) = data.label_class_id {
            label.label_class_id = class_id;
        }
        if let Some(geometry) = data.geometry {
            label.geometry = geometry;
        }
        if let Some(input) = data.smart_tool_input {
            label.smart_tool_input = input;
        }
        label.updated_at = Utc::now();
        Ok(label.clone())
    }

    fn delete_label(&mut self, id: &str) -> Result<()> {
        self.labels
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RelabelError::LabelNotFound {
                label_id: id.to_string(),
            })
    }

    fn create_label_class(&mut self, data: NewLabelClass) -> Result<LabelClass> {
        if self.label_classes.contains_key(&data.id) {
            return Err(RelabelError::AlreadyExists { id: data.id });
        }
        let index = match data.index {
            Some(index) => index,
            None => self.classes_of(&data.dataset_id).len() as u32,
        };
        let class = LabelClass {
            id: data.id,
            dataset_id: data.dataset_id,
            name: data.name,
            color: data.color,
            index,
        };
        self.label_classes.insert(class.id.clone(), class.clone());
        Ok(class)
    }

    /// Labels still pointing at the class lose their class
    fn delete_label_class(&mut self, id: &str) -> Result<()> {
        if self.label_classes.remove(id).is_none() {
            return Err(RelabelError::LabelClassNotFound {
                label_class_id: id.to_string(),
            });
        }
        for label in self.labels.values_mut() {
            if label.label_class_id.as_deref() == Some(id) {
                label.label_class_id = None;
            }
        }
        Ok(())
    }

    fn infer(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        let label = self.label(&request.label_id)?;
        if label.image_id != request.image_id {
            return Err(RelabelError::InvalidInput {
                reason: format!(
                    "label {} does not belong to image {}",
                    label.id, request.image_id
                ),
            });
        }
        Ok(InferenceResponse {
            label_id: label.id.clone(),
            geometry: mask(request),
        })
    }

    fn labels_of(&self, image_id: &str) -> Vec<Label> {
        let mut labels: Vec<Label> = self
            .labels
            .values()
            .filter(|l| l.image_id == image_id)
            .cloned()
            .collect();
        labels.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        labels
    }

    fn classes_of(&self, dataset_id: &str) -> Vec<LabelClass> {
        let mut classes: Vec<LabelClass> = self
            .label_classes
            .values()
            .filter(|c| c.dataset_id == dataset_id)
            .cloned()
            .collect();
        classes.sort_by(|a, b| a.index.cmp(&b.index).then(a.id.cmp(&b.id)));
        classes
    }
}

/// Bounding box of the hint box grown to cover every foreground point
fn mask(request: &InferenceRequest) -> Geometry {
    let input = &request.input;
    let init = (input.x, input.y, input.x + input.width, input.y + input.height);
    let (x0, y0, x1, y1) = input
        .points_inside
        .iter()
        .fold(init, |(x0, y0, x1, y1), p| {
            (x0.min(p[0]), y0.min(p[1]), x1.max(p[0]), y1.max(p[1]))
        });
    Geometry::rectangle(x0, y0, x1 - x0, y1 - y0)
}

#[derive(Debug, Default)]
struct Faults {
    /// Keyed by mutation wire name
    by_name: HashMap<String, VecDeque<String>>,
    /// Keyed by position in the mutation log
    by_position: BTreeMap<usize, String>,
    cache: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryRemote {
    store: Mutex<Store>,
    log: Mutex<Vec<Mutation>>,
    faults: Mutex<Faults>,
    cache: Mutex<LocalCache>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images(images: impl IntoIterator<Item = Image>) -> Self {
        let remote = Self::new();
        for image in images {
            remote.seed_image(image);
        }
        remote
    }

    pub fn seed_image(&self, image: Image) {
        lock(&self.store).images.insert(image.id.clone(), image);
    }

    /// Place a label directly, bypassing the mutation log
    ///
    /// # Errors
    ///
    /// Same checks as a `createLabel` mutation.
    pub fn seed_label(&self, data: NewLabel) -> ExResult<Label> {
        let label = lock(&self.store).create_label(data)?;
        lock(&self.cache).put_label(label.clone());
        Ok(label)
    }

    /// Place a label class directly, bypassing the mutation log
    ///
    /// # Errors
    ///
    /// Same checks as a `createLabelClass` mutation.
    pub fn seed_label_class(&self, data: NewLabelClass) -> ExResult<LabelClass> {
        let class = lock(&self.store).create_label_class(data)?;
        lock(&self.cache).put_label_class(class.clone());
        Ok(class)
    }

    /// The next mutation named `op` (wire name, e.g. `"createLabel"`) fails
    pub fn fail_next(&self, op: &str, message: impl Into<String>) {
        lock(&self.faults)
            .by_name
            .entry(op.to_string())
            .or_default()
            .push_back(message.into());
    }

    /// The `n`-th mutation from now fails, whatever it is; `n = 1` is the
    /// next one
    pub fn fail_nth(&self, n: usize, message: impl Into<String>) {
        let position = lock(&self.log).len() + n.max(1) - 1;
        lock(&self.faults)
            .by_position
            .insert(position, message.into());
    }

    /// Make every `update_cache` call fail
    pub fn fail_cache_updates(&self, fail: bool) {
        lock(&self.faults).cache = fail;
    }

    /// Every mutation received, in arrival order, failed ones included
    pub fn mutations(&self) -> Vec<Mutation> {
        lock(&self.log).clone()
    }

    pub fn mutation_names(&self) -> Vec<&'static str> {
        lock(&self.log).iter().map(Mutation::name).collect()
    }

    pub fn label(&self, id: &str) -> Option<Label> {
        lock(&self.store).labels.get(id).cloned()
    }

    pub fn labels(&self) -> Vec<Label> {
        lock(&self.store).labels.values().cloned().collect()
    }

    pub fn label_class(&self, id: &str) -> Option<LabelClass> {
        lock(&self.store).label_classes.get(id).cloned()
    }

    pub fn label_classes(&self) -> Vec<LabelClass> {
        lock(&self.store).label_classes.values().cloned().collect()
    }

    pub fn cache(&self) -> LocalCache {
        lock(&self.cache).clone()
    }

    fn injected_failure(&self, mutation: &Mutation) -> Option<ExError> {
        let position = {
            let mut log = lock(&self.log);
            log.push(mutation.clone());
            log.len() - 1
        };
        let mut faults = lock(&self.faults);
        let message = faults.by_position.remove(&position).or_else(|| {
            faults
                .by_name
                .get_mut(mutation.name())
                .and_then(VecDeque::pop_front)
        })?;
        Some(
            RelabelError::Remote {
                op: mutation.name().to_string(),
                message,
            }
            .into(),
        )
    }

    fn apply(&self, mutation: Mutation) -> Result<MutationData> {
        let mut store = lock(&self.store);
        Ok(match mutation {
            Mutation::CreateLabel(data) => MutationData::Label(store.create_label(data)?),
            Mutation::UpdateLabel { id, data } => {
                MutationData::Label(store.update_label(&id, data)?)
            }
            Mutation::DeleteLabel { id } => {
                store.delete_label(&id)?;
                MutationData::Deleted { id }
            }
            Mutation::CreateLabelClass(data) => {
                MutationData::LabelClass(store.create_label_class(data)?)
            }
            Mutation::DeleteLabelClass { id } => {
                store.delete_label_class(&id)?;
                MutationData::Deleted { id }
            }
            Mutation::RunInference(request) => MutationData::Inference(store.infer(&request)?),
        })
    }
}

#[async_trait]
impl RemoteOperations for InMemoryRemote {
    async fn mutate(&self, mutation: Mutation) -> ExResult<MutationData> {
        tracing::debug!(
            mutation = mutation.name(),
            target_id = mutation.target_id(),
            "remote mutation"
        );
        if let Some(err) = self.injected_failure(&mutation) {
            return Err(err);
        }
        let op = mutation.name();
        self.apply(mutation)
            .map_err(|e| ExError::from(e).with_op(op))
    }

    async fn query(&self, query: Query) -> ExResult<QueryData> {
        let store = lock(&self.store);
        Ok(match query {
            Query::Label { id } => QueryData::Label(store.labels.get(&id).cloned()),
            Query::Image { id } => QueryData::Image(store.images.get(&id).cloned()),
            Query::ImageLabels { image_id } => QueryData::Labels(store.labels_of(&image_id)),
            Query::LabelClasses { dataset_id } => {
                QueryData::LabelClasses(store.classes_of(&dataset_id))
            }
        })
    }

    fn update_cache(&self, update: &mut dyn FnMut(&mut LocalCache)) -> ExResult<()> {
        if lock(&self.faults).cache {
            return Err(ExError::new(ExErrorKind::Internal)
                .with_op("update_cache")
                .with_message("local cache unavailable"));
        }
        let mut cache = lock(&self.cache);
        update(&mut *cache);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relabel_core::model::SmartToolInput;
    use relabel_core::LabelType;

    fn image() -> Image {
        Image {
            id: "I1".to_string(),
            dataset_id: "D1".to_string(),
            name: "cat.jpg".to_string(),
            width: 100,
            height: 80,
            url: "https://example.test/cat.jpg".to_string(),
        }
    }

    fn new_label(id: &str) -> NewLabel {
        NewLabel {
            id: id.to_string(),
            image_id: "I1".to_string(),
            label_type: LabelType::Box,
            geometry: Geometry::rectangle(1.0, 1.0, 10.0, 10.0),
            label_class_id: None,
            smart_tool_input: None,
            created_at: None,
        }
    }

    fn new_class(id: &str) -> NewLabelClass {
        NewLabelClass {
            id: id.to_string(),
            dataset_id: "D1".to_string(),
            name: id.to_string(),
            color: "#e53e3e".to_string(),
            index: None,
        }
    }

    #[tokio::test]
    async fn test_create_label_rejects_duplicate_id() {
        let remote = InMemoryRemote::with_images([image()]);
        remote
            .mutate(Mutation::CreateLabel(new_label("L1")))
            .await
            .unwrap();

        let err = remote
            .mutate(Mutation::CreateLabel(new_label("L1")))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::AlreadyExists);
        assert_eq!(err.op(), Some("createLabel"));
    }

    #[tokio::test]
    async fn test_class_index_follows_dataset_size() {
        let remote = InMemoryRemote::with_images([image()]);
        remote.seed_label_class(new_class("C1")).unwrap();

        let data = remote
            .mutate(Mutation::CreateLabelClass(new_class("C2")))
            .await
            .unwrap();

        assert_eq!(data.into_label_class("createLabelClass").unwrap().index, 1);
    }

    #[tokio::test]
    async fn test_recreate_keeps_timestamps() {
        let remote = InMemoryRemote::with_images([image()]);
        let label = remote.seed_label(new_label("L1")).unwrap();
        remote
            .mutate(Mutation::DeleteLabel {
                id: "L1".to_string(),
            })
            .await
            .unwrap();

        remote
            .mutate(Mutation::CreateLabel(NewLabel::from(&label)))
            .await
            .unwrap();

        assert_eq!(remote.label("L1"), Some(label));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let remote = InMemoryRemote::with_images([image()]);
        remote.fail_next("deleteLabel", "offline");
        remote.fail_nth(2, "boom");

        let first = remote.mutate(Mutation::CreateLabel(new_label("L1"))).await;
        let second = remote.mutate(Mutation::CreateLabel(new_label("L2"))).await;
        let third = remote
            .mutate(Mutation::DeleteLabel {
                id: "L1".to_string(),
            })
            .await;

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err().message(), "boom");
        assert_eq!(third.unwrap_err().message(), "offline");
        assert_eq!(
            remote.mutation_names(),
            vec!["createLabel", "createLabel", "deleteLabel"]
        );
        assert!(remote.label("L2").is_none());
    }

    #[tokio::test]
    async fn test_mask_grows_to_cover_foreground_points() {
        let remote = InMemoryRemote::with_images([image()]);
        remote.seed_label(new_label("L1")).unwrap();
        let request = InferenceRequest {
            label_id: "L1".to_string(),
            image_id: "I1".to_string(),
            image_url: None,
            input: SmartToolInput {
                x: 10.0,
                y: 10.0,
                width: 10.0,
                height: 10.0,
                center_point: [15.0, 15.0],
                points_inside: vec![[30.0, 5.0]],
                points_outside: vec![],
            },
        };

        let response = remote
            .mutate(Mutation::RunInference(request))
            .await
            .unwrap()
            .into_inference("runIog")
            .unwrap();

        assert_eq!(response.geometry.extent(), Some((10.0, 5.0, 30.0, 20.0)));
    }

    #[test]
    fn test_cache_failure_is_reported() {
        let remote = InMemoryRemote::new();
        remote.fail_cache_updates(true);

        let err = remote.update_cache(&mut |_: &mut LocalCache| {}).unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::Internal);
    }
}
