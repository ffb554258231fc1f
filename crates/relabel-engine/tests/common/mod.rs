use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relabel_core::cache::LocalCache;
use relabel_core::model::{NewLabel, NewLabelClass};
use relabel_core::{
    EditorState, ExResult, Geometry, Image, Label, LabelClass, LabelType, Mutation, MutationData,
    Query, QueryData, RelabelError, RemoteOperations,
};
use relabel_engine::commands::{CreateLabelClassInput, CreateLabelInput};
use relabel_engine::{CommandContext, Coordinator, InMemoryRemote};
use tokio::sync::oneshot;

pub const IMAGE_ID: &str = "image-1";
pub const DATASET_ID: &str = "dataset-1";

/// Remote store, selection and coordinator wired together
#[allow(dead_code)]
pub struct Fixture {
    pub remote: Arc<InMemoryRemote>,
    pub ui: Arc<EditorState>,
    pub ctx: CommandContext,
    pub coordinator: Coordinator,
}

#[allow(dead_code)]
pub fn image() -> Image {
    Image {
        id: IMAGE_ID.to_string(),
        dataset_id: DATASET_ID.to_string(),
        name: "street.jpg".to_string(),
        width: 640,
        height: 480,
        url: "https://images.test/street.jpg".to_string(),
    }
}

#[allow(dead_code)]
pub fn fixture() -> Fixture {
    let remote = Arc::new(InMemoryRemote::with_images([image()]));
    let ui = Arc::new(EditorState::new());
    let ctx = CommandContext::new(remote.clone(), ui.clone());
    Fixture {
        remote,
        ui,
        ctx,
        coordinator: Coordinator::new(),
    }
}

#[allow(dead_code)]
pub fn box_input(x: f64, class: Option<&str>) -> CreateLabelInput {
    CreateLabelInput {
        image_id: IMAGE_ID.to_string(),
        label_type: LabelType::Box,
        geometry: Geometry::rectangle(x, 10.0, 50.0, 40.0),
        label_class_id: class.map(str::to_string),
        smart_tool_input: None,
    }
}

#[allow(dead_code)]
pub fn class_input(name: &str) -> CreateLabelClassInput {
    CreateLabelClassInput {
        dataset_id: DATASET_ID.to_string(),
        name: name.to_string(),
        color: "#e53e3e".to_string(),
    }
}

#[allow(dead_code)]
pub fn seed_class(remote: &InMemoryRemote, id: &str, name: &str) -> LabelClass {
    remote
        .seed_label_class(NewLabelClass {
            id: id.to_string(),
            dataset_id: DATASET_ID.to_string(),
            name: name.to_string(),
            color: "#dd6b20".to_string(),
            index: None,
        })
        .unwrap()
}

#[allow(dead_code)]
pub fn seed_label(
    remote: &InMemoryRemote,
    id: &str,
    label_type: LabelType,
    class: Option<&str>,
) -> Label {
    let geometry = match label_type {
        LabelType::Classification => image().full_geometry(),
        _ => Geometry::rectangle(100.0, 100.0, 40.0, 30.0),
    };
    remote
        .seed_label(NewLabel {
            id: id.to_string(),
            image_id: IMAGE_ID.to_string(),
            label_type,
            geometry,
            label_class_id: class.map(str::to_string),
            smart_tool_input: None,
            created_at: None,
        })
        .unwrap()
}

/// Inference responses held back until the test releases them
///
/// Every `runIog` call takes the next gate in call order and waits on it;
/// all other traffic goes straight to the inner store.
#[allow(dead_code)]
pub struct GatedRemote {
    pub inner: Arc<InMemoryRemote>,
    gates: Mutex<VecDeque<Gate>>,
}

#[allow(dead_code)]
struct Gate {
    open: oneshot::Receiver<()>,
    failure: Option<String>,
}

#[allow(dead_code)]
impl GatedRemote {
    pub fn new(inner: Arc<InMemoryRemote>) -> Self {
        Self {
            inner,
            gates: Mutex::new(VecDeque::new()),
        }
    }

    /// Gate for the next inference call
    pub fn gate(&self) -> oneshot::Sender<()> {
        self.push(None)
    }

    /// Gate for the next inference call, which fails once released
    pub fn failing_gate(&self, message: &str) -> oneshot::Sender<()> {
        self.push(Some(message.to_string()))
    }

    fn push(&self, failure: Option<String>) -> oneshot::Sender<()> {
        let (tx, open) = oneshot::channel();
        self.gates.lock().unwrap().push_back(Gate { open, failure });
        tx
    }
}

#[async_trait]
impl RemoteOperations for GatedRemote {
    async fn mutate(&self, mutation: Mutation) -> ExResult<MutationData> {
        if let Mutation::RunInference(_) = &mutation {
            let gate = self.gates.lock().unwrap().pop_front();
            if let Some(gate) = gate {
                let _ = gate.open.await;
                if let Some(message) = gate.failure {
                    return Err(RelabelError::Remote {
                        op: mutation.name().to_string(),
                        message,
                    }
                    .into());
                }
            }
        }
        self.inner.mutate(mutation).await
    }

    async fn query(&self, query: Query) -> ExResult<QueryData> {
        self.inner.query(query).await
    }

    fn update_cache(&self, update: &mut dyn FnMut(&mut LocalCache)) -> ExResult<()> {
        self.inner.update_cache(update)
    }
}

/// Let every other branch of a `join!` run until it blocks again
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
