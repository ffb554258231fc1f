//! Replay command
//!
//! Usage: relabel replay <SCRIPT> [--config PATH] [--json] [--fail-fast]
//!
//! Runs a JSON editing script through the coordinator against an in-memory
//! store, then prints the final labels, classes, selection and history.
//!
//! ```json
//! {
//!   "images": [{"id": "img", "datasetId": "ds", "name": "a.png",
//!               "width": 640, "height": 480, "url": "https://example.test/a.png"}],
//!   "steps": [
//!     {"op": "create_label", "id": "L1", "imageId": "img", "type": "Box", "rect": [10, 10, 50, 40]},
//!     {"op": "undo"},
//!     {"op": "redo"}
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use relabel_core::config::EngineConfig;
use relabel_core::logging_facility::init_with_filter;
use relabel_core::model::{Coordinate, NewLabel, NewLabelClass};
use relabel_core::{
    EditorState, ExError, ExResult, Geometry, Image, Label, LabelClass, LabelType, RelabelError,
};
use relabel_engine::commands::{
    create_label_class_and_update_label, pick_class_color, AssignLabelClass, Assignment,
    CreateLabel, CreateLabelClass, CreateLabelClassInput, CreateLabelInput, DeleteLabel, Shape,
    UpdateLabelGeometry,
};
use relabel_engine::{
    CommandContext, Coordinator, HistorySnapshot, InMemoryRemote, InferenceSession,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Path to the JSON script
    pub script: PathBuf,

    /// Engine configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the final state as JSON
    #[arg(long)]
    pub json: bool,

    /// Stop at the first failing step
    #[arg(long)]
    pub fail_fast: bool,
}

/// Seed data plus the steps to replay
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub label_classes: Vec<NewLabelClass>,
    #[serde(default)]
    pub labels: Vec<NewLabel>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// `rect` is `[x, y, width, height]`
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    #[serde(rename_all = "camelCase")]
    CreateLabelClass {
        id: Option<String>,
        dataset_id: String,
        name: String,
        color: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    CreateLabel {
        id: Option<String>,
        image_id: String,
        #[serde(rename = "type")]
        label_type: LabelType,
        rect: Option<[f64; 4]>,
        label_class_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    DeleteLabel { label_id: String },
    #[serde(rename_all = "camelCase")]
    AssignClass {
        label_id: String,
        label_class_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateGeometry { label_id: String, rect: [f64; 4] },
    #[serde(rename_all = "camelCase")]
    CreateLabelClassAndUpdateLabel {
        dataset_id: String,
        name: String,
        color: Option<String>,
        label_id: String,
    },
    /// Interactive segmentation session, committed as one history entry
    #[serde(rename_all = "camelCase")]
    Refine {
        label_id: String,
        points: Vec<HintPoint>,
    },
    Undo,
    Redo,
    /// Make the next remote mutation named `mutation` fail
    FailNext { mutation: String, message: String },
}

#[derive(Debug, Deserialize)]
pub struct HintPoint {
    pub point: Coordinate,
    #[serde(default = "default_inside")]
    pub inside: bool,
}

fn default_inside() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFailure {
    pub step: usize,
    pub code: &'static str,
    pub message: String,
}

/// Final state after a replay
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub labels: Vec<Label>,
    pub label_classes: Vec<LabelClass>,
    pub selected_label_id: Option<String>,
    pub selected_label_class_id: Option<String>,
    pub history: HistorySnapshot,
    pub mutations: Vec<&'static str>,
    pub failures: Vec<StepFailure>,
}

/// Execute replay command
pub async fn execute(args: ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    init_with_filter(config.logging.profile, config.logging.filter.as_deref());

    let input = std::fs::read_to_string(&args.script)?;
    let script: Script = serde_json::from_str(&input)?;

    let report = replay(script, config, args.fail_fast).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Seed an in-memory store from `script` and run its steps in order.
/// Failing steps are collected in the report unless `fail_fast` is set.
///
/// # Errors
///
/// Seeding failures, and with `fail_fast` the first failing step.
pub async fn replay(script: Script, config: EngineConfig, fail_fast: bool) -> ExResult<Report> {
    let remote = Arc::new(InMemoryRemote::with_images(script.images.clone()));
    for class in script.label_classes {
        remote.seed_label_class(class)?;
    }
    for label in script.labels {
        remote.seed_label(label)?;
    }

    let ui = Arc::new(EditorState::new());
    let replayer = Replayer {
        ctx: CommandContext::new(remote.clone(), ui.clone()),
        remote: remote.clone(),
        coordinator: Coordinator::new(),
        images: script
            .images
            .into_iter()
            .map(|image| (image.id.clone(), image))
            .collect(),
        config,
    };

    let mut failures = Vec::new();
    for (index, step) in script.steps.into_iter().enumerate() {
        if let Err(err) = replayer.run(step).await {
            if fail_fast {
                return Err(err);
            }
            failures.push(StepFailure {
                step: index,
                code: err.code(),
                message: err.message().to_string(),
            });
        }
    }

    let selection = ui.snapshot();
    Ok(Report {
        labels: remote.labels(),
        label_classes: remote.label_classes(),
        selected_label_id: selection.label_id,
        selected_label_class_id: selection.label_class_id,
        history: replayer.coordinator.history_names().await,
        mutations: remote.mutation_names(),
        failures,
    })
}

struct Replayer {
    ctx: CommandContext,
    remote: Arc<InMemoryRemote>,
    coordinator: Coordinator,
    images: HashMap<String, Image>,
    config: EngineConfig,
}

impl Replayer {
    async fn run(&self, step: Step) -> ExResult<()> {
        match step {
            Step::CreateLabelClass {
                id,
                dataset_id,
                name,
                color,
            } => {
                let input = self.class_input(dataset_id, name, color).await?;
                let command = match id {
                    Some(id) => CreateLabelClass::with_id(id, input, self.ctx.clone()),
                    None => CreateLabelClass::new(input, self.ctx.clone()),
                };
                self.coordinator.perform(command).await?;
            }
            Step::CreateLabel {
                id,
                image_id,
                label_type,
                rect,
                label_class_id,
            } => {
                let geometry = match rect {
                    Some([x, y, w, h]) => Geometry::rectangle(x, y, w, h),
                    None => self.image(&image_id)?.full_geometry(),
                };
                let input = CreateLabelInput {
                    image_id,
                    label_type,
                    geometry,
                    label_class_id,
                    smart_tool_input: None,
                };
                let command = match id {
                    Some(id) => CreateLabel::with_id(id, input, self.ctx.clone()),
                    None => CreateLabel::new(input, self.ctx.clone()),
                };
                self.coordinator.perform(command).await?;
            }
            Step::DeleteLabel { label_id } => {
                self.coordinator
                    .perform(DeleteLabel::new(label_id, self.ctx.clone()))
                    .await?;
            }
            Step::AssignClass {
                label_id,
                label_class_id,
            } => {
                let assignment = self
                    .coordinator
                    .perform(AssignLabelClass::new(
                        label_id,
                        label_class_id,
                        self.ctx.clone(),
                    ))
                    .await?;
                if let Assignment::MergedAway(deleted) = assignment {
                    tracing::info!(
                        label_id = deleted.label.id.as_str(),
                        "duplicate classification merged away"
                    );
                }
            }
            Step::UpdateGeometry {
                label_id,
                rect: [x, y, w, h],
            } => {
                let after = Shape {
                    geometry: Geometry::rectangle(x, y, w, h),
                    smart_tool_input: None,
                };
                self.coordinator
                    .perform(UpdateLabelGeometry::new(label_id, after, self.ctx.clone()))
                    .await?;
            }
            Step::CreateLabelClassAndUpdateLabel {
                dataset_id,
                name,
                color,
                label_id,
            } => {
                let input = self.class_input(dataset_id, name, color).await?;
                self.coordinator
                    .perform(create_label_class_and_update_label(
                        input, label_id, &self.ctx,
                    ))
                    .await?;
            }
            Step::Refine { label_id, points } => {
                let session =
                    InferenceSession::start(label_id, &self.config.inference, self.ctx.clone())
                        .await?;
                for hint in points {
                    session.add_point(hint.point, hint.inside).await?;
                }
                session.commit(&self.coordinator).await?;
            }
            Step::Undo => {
                self.coordinator.undo().await?;
            }
            Step::Redo => {
                self.coordinator.redo().await?;
            }
            Step::FailNext { mutation, message } => {
                self.remote.fail_next(&mutation, message);
            }
        }
        Ok(())
    }

    async fn class_input(
        &self,
        dataset_id: String,
        name: String,
        color: Option<String>,
    ) -> ExResult<CreateLabelClassInput> {
        let color = match color {
            Some(color) => color,
            None => pick_class_color(&self.ctx, &dataset_id, &self.config.palette.colors).await?,
        };
        Ok(CreateLabelClassInput {
            dataset_id,
            name,
            color,
        })
    }

    fn image(&self, image_id: &str) -> ExResult<&Image> {
        self.images.get(image_id).ok_or_else(|| {
            ExError::from(RelabelError::ImageNotFound {
                image_id: image_id.to_string(),
            })
        })
    }
}

fn print_report(report: &Report) {
    println!("Labels ({}):", report.labels.len());
    for label in &report.labels {
        println!(
            "  {} {:?} class={}",
            label.id,
            label.label_type,
            label.label_class_id.as_deref().unwrap_or("-")
        );
    }
    println!("Label classes ({}):", report.label_classes.len());
    for class in &report.label_classes {
        println!("  {} {} {}", class.id, class.name, class.color);
    }
    println!(
        "Selection: label={} class={}",
        report.selected_label_id.as_deref().unwrap_or("-"),
        report.selected_label_class_id.as_deref().unwrap_or("-")
    );
    println!("Undo: [{}]", report.history.undo.join(", "));
    println!("Redo: [{}]", report.history.redo.join(", "));
    println!("Mutations: [{}]", report.mutations.join(", "));
    for failure in &report.failures {
        println!(
            "✗ step {}: {} {}",
            failure.step, failure.code, failure.message
        );
    }
}
