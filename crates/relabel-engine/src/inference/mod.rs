//! Interactive segmentation
//!
//! A user adds hint points faster than the inference endpoint answers, so
//! requests overlap and their responses come back in any order. Requests
//! run outside the coordinator and go through an [`InferenceSequencer`]:
//! only the response of the most recently issued request is applied.
//!
//! Two ways in:
//! - [`RunInference`]: one request recorded as one history entry
//! - [`InferenceSession`]: many requests while the user clicks, then one
//!   [`RefineLabel`] entry for the net change on `commit`

pub mod sequencer;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use relabel_core::config::InferenceConfig;
use relabel_core::inference::InferenceRequest;
use relabel_core::remote::LabelUpdate;
use relabel_core::{Effect, ExResult, Mutation};
use relabel_core_types::schema::{
    FIELD_ERR_CODE, FIELD_ERR_MESSAGE, FIELD_LABEL_ID, FIELD_LATEST_SEQ, FIELD_TRACE_ID,
};
use relabel_core_types::TraceId;

use crate::commands::{CommandContext, Shape, ShapeChange};

pub use sequencer::{CommitPermit, InferenceSequencer};
pub use session::{InferenceSession, RefineLabel};

#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
    /// The response was the newest and its mask is now the label's shape
    Applied { seq: u64, shape: Shape },
    /// A newer request was issued before this one could be applied
    Superseded { seq: u64 },
}

impl InferenceOutcome {
    pub fn seq(&self) -> u64 {
        match self {
            InferenceOutcome::Applied { seq, .. } | InferenceOutcome::Superseded { seq } => *seq,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, InferenceOutcome::Applied { .. })
    }
}

/// Send request `seq` and apply its mask if it is still the newest
pub(crate) async fn dispatch(
    ctx: &CommandContext,
    sequencer: &InferenceSequencer,
    seq: u64,
    request: InferenceRequest,
    trace_id: &TraceId,
    surface_latest_failure: bool,
) -> ExResult<InferenceOutcome> {
    let label_id = request.label_id.clone();
    let input = request.input.clone();
    tracing::debug!(
        seq,
        { FIELD_LABEL_ID } = %label_id,
        { FIELD_TRACE_ID } = trace_id.as_str(),
        "inference request issued"
    );

    let op = "runIog";
    let response = ctx
        .remote
        .mutate(Mutation::RunInference(request))
        .await
        .and_then(|data| data.into_inference(op));
    let response = match response {
        Ok(response) => response,
        Err(err) if surface_latest_failure && sequencer.is_latest(seq) => return Err(err),
        Err(err) => {
            tracing::debug!(
                seq,
                { FIELD_LATEST_SEQ } = sequencer.latest(),
                { FIELD_TRACE_ID } = trace_id.as_str(),
                { FIELD_ERR_CODE } = err.code(),
                { FIELD_ERR_MESSAGE } = err.message(),
                "dropping failed inference response"
            );
            return Ok(InferenceOutcome::Superseded { seq });
        }
    };

    let Some(permit) = sequencer.admit(seq).await else {
        tracing::debug!(
            seq,
            { FIELD_LATEST_SEQ } = sequencer.latest(),
            { FIELD_TRACE_ID } = trace_id.as_str(),
            "dropping stale inference response"
        );
        return Ok(InferenceOutcome::Superseded { seq });
    };

    let shape = Shape {
        geometry: response.geometry,
        smart_tool_input: Some(input),
    };
    ctx.update_label(
        &label_id,
        LabelUpdate::shape(shape.geometry.clone(), shape.smart_tool_input.clone()),
    )
    .await?;
    permit.commit();

    Ok(InferenceOutcome::Applied { seq, shape })
}

/// One inference request as an undoable command
///
/// Shares its sequencer with any other request for the same label. A
/// `RunInference` overtaken by a newer one is not recorded in history.
pub struct RunInference {
    request: InferenceRequest,
    sequencer: Arc<InferenceSequencer>,
    surface_latest_failure: bool,
    ctx: CommandContext,
}

impl RunInference {
    pub fn new(
        request: InferenceRequest,
        sequencer: Arc<InferenceSequencer>,
        config: &InferenceConfig,
        ctx: CommandContext,
    ) -> Self {
        Self {
            request,
            sequencer,
            surface_latest_failure: config.surface_latest_failure,
            ctx,
        }
    }

    async fn write(&self, shape: Shape) -> ExResult<()> {
        let update = LabelUpdate::shape(shape.geometry, shape.smart_tool_input);
        self.ctx
            .update_label(&self.request.label_id, update)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Effect for RunInference {
    /// `None` when the response was superseded
    type Done = Option<ShapeChange>;
    type Undone = Option<ShapeChange>;

    fn name(&self) -> &str {
        "run_inference"
    }

    async fn apply(&self) -> ExResult<Option<ShapeChange>> {
        let before = Shape::of(&self.ctx.fetch_label(&self.request.label_id).await?);
        let seq = self.sequencer.issue();
        let outcome = dispatch(
            &self.ctx,
            &self.sequencer,
            seq,
            self.request.clone(),
            &TraceId::new(),
            self.surface_latest_failure,
        )
        .await?;
        Ok(match outcome {
            InferenceOutcome::Applied { shape, .. } => Some(ShapeChange {
                label_id: self.request.label_id.clone(),
                before,
                after: shape,
            }),
            InferenceOutcome::Superseded { .. } => None,
        })
    }

    /// A superseded run left the label alone
    fn records(&self, done: &Option<ShapeChange>) -> bool {
        done.is_some()
    }

    async fn revert(&self, done: Option<ShapeChange>) -> ExResult<Option<ShapeChange>> {
        if let Some(change) = &done {
            self.write(change.before.clone()).await?;
        }
        Ok(done)
    }

    /// Writes the recorded mask back instead of asking the endpoint again
    async fn reapply(&self, undone: Option<ShapeChange>) -> ExResult<Option<ShapeChange>> {
        if let Some(change) = &undone {
            self.write(change.after.clone()).await?;
        }
        Ok(undone)
    }
}
