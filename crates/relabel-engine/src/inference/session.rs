//! Point-by-point refinement of one label

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use relabel_core::config::InferenceConfig;
use relabel_core::inference::InferenceRequest;
use relabel_core::model::{Coordinate, SmartToolInput};
use relabel_core::{Effect, ExResult, Label};
use relabel_core_types::TraceId;

use super::{dispatch, InferenceOutcome, InferenceSequencer};
use crate::commands::{CommandContext, Shape, ShapeChange, UpdateLabelGeometry};
use crate::coordinator::Coordinator;

/// Tracks the hint points of one label and fires a request per point
///
/// Requests run concurrently and outside the coordinator; the label shows
/// the newest mask as soon as it arrives. Only [`InferenceSession::commit`]
/// touches history.
pub struct InferenceSession {
    label_id: String,
    image_id: String,
    image_url: Option<String>,
    input: Mutex<SmartToolInput>,
    before: Shape,
    sequencer: Arc<InferenceSequencer>,
    /// Groups the log lines of every request of this session
    trace_id: TraceId,
    surface_latest_failure: bool,
    ctx: CommandContext,
}

impl InferenceSession {
    /// Open a session on an existing label. Hint points already stored on
    /// the label are kept; without any, the label's extent is the box.
    ///
    /// # Errors
    ///
    /// `ERR_NOT_FOUND` if the label or its image does not exist.
    pub async fn start(
        label_id: impl Into<String>,
        config: &InferenceConfig,
        ctx: CommandContext,
    ) -> ExResult<Self> {
        let label_id = label_id.into();
        let label = ctx.fetch_label(&label_id).await?;
        let image = ctx.fetch_image(&label.image_id).await?;
        let input = label
            .smart_tool_input
            .clone()
            .unwrap_or_else(|| box_of(&label));
        Ok(Self {
            label_id,
            image_id: label.image_id.clone(),
            image_url: Some(image.url),
            input: Mutex::new(input),
            before: Shape::of(&label),
            sequencer: Arc::new(InferenceSequencer::new()),
            trace_id: TraceId::new(),
            surface_latest_failure: config.surface_latest_failure,
            ctx,
        })
    }

    /// Send the image itself instead of its URL, e.g. a
    /// [`data_url`](relabel_core::inference::data_url)
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn label_id(&self) -> &str {
        &self.label_id
    }

    pub fn sequencer(&self) -> &InferenceSequencer {
        &self.sequencer
    }

    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    pub fn points(&self) -> (Vec<Coordinate>, Vec<Coordinate>) {
        let input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        (input.points_inside.clone(), input.points_outside.clone())
    }

    /// Add a foreground (`inside`) or background point and request a mask
    /// for the whole point set
    ///
    /// # Errors
    ///
    /// The endpoint's failure, when this request is still the newest and the
    /// session surfaces such failures.
    pub async fn add_point(&self, point: Coordinate, inside: bool) -> ExResult<InferenceOutcome> {
        // Numbered under the same lock that extends the point set, so a
        // higher number always carries more points.
        let (seq, input) = {
            let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
            if inside {
                input.points_inside.push(point);
            } else {
                input.points_outside.push(point);
            }
            (self.sequencer.issue(), input.clone())
        };
        let request = InferenceRequest {
            label_id: self.label_id.clone(),
            image_id: self.image_id.clone(),
            image_url: self.image_url.clone(),
            input,
        };
        dispatch(
            &self.ctx,
            &self.sequencer,
            seq,
            request,
            &self.trace_id,
            self.surface_latest_failure,
        )
        .await
    }

    /// Record the net change since `start` as one undoable entry. Callers
    /// await their outstanding `add_point` calls first.
    ///
    /// Returns `None` without touching history when nothing changed.
    ///
    /// # Errors
    ///
    /// Failure to read the label or to record the change.
    pub async fn commit(self, coordinator: &Coordinator) -> ExResult<Option<ShapeChange>> {
        let after = Shape::of(&self.ctx.fetch_label(&self.label_id).await?);
        if after == self.before {
            tracing::debug!(
                label_id = %self.label_id,
                "inference session left label unchanged"
            );
            return Ok(None);
        }
        let change = ShapeChange {
            label_id: self.label_id,
            before: self.before,
            after,
        };
        coordinator
            .perform(RefineLabel::new(change, self.ctx))
            .await
            .map(Some)
    }
}

fn box_of(label: &Label) -> SmartToolInput {
    let (x0, y0, x1, y1) = label.geometry.extent().unwrap_or_default();
    SmartToolInput {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
        center_point: [(x0 + x1) / 2.0, (y0 + y1) / 2.0],
        points_inside: Vec::new(),
        points_outside: Vec::new(),
    }
}

/// Net shape change of an inference session
pub struct RefineLabel {
    update: UpdateLabelGeometry,
}

impl RefineLabel {
    pub fn new(change: ShapeChange, ctx: CommandContext) -> Self {
        Self {
            update: UpdateLabelGeometry::from_change(change, ctx),
        }
    }
}

#[async_trait]
impl Effect for RefineLabel {
    type Done = ShapeChange;
    type Undone = ShapeChange;

    fn name(&self) -> &str {
        "refine_label"
    }

    async fn apply(&self) -> ExResult<ShapeChange> {
        self.update.apply().await
    }

    async fn revert(&self, done: ShapeChange) -> ExResult<ShapeChange> {
        self.update.revert(done).await
    }

    async fn reapply(&self, undone: ShapeChange) -> ExResult<ShapeChange> {
        self.update.reapply(undone).await
    }
}
