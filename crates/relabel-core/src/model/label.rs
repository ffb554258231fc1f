use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Coordinate, Geometry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelType {
    /// Whole-image tag; at most one live classification per class and image
    Classification,
    Polygon,
    Box,
}

/// Inputs of the last interactive-segmentation run, kept on the label so a
/// refinement can be resumed and so undo can restore them with the geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartToolInput {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub center_point: Coordinate,
    #[serde(default)]
    pub points_inside: Vec<Coordinate>,
    #[serde(default)]
    pub points_outside: Vec<Coordinate>,
}

/// A label as stored by the remote service
///
/// A delete command keeps the whole record so the recreate on undo is
/// identical, timestamps and id included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub image_id: String,
    #[serde(rename = "type")]
    pub label_type: LabelType,
    pub geometry: Geometry,
    pub label_class_id: Option<String>,
    pub smart_tool_input: Option<SmartToolInput>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Label {
    pub fn is_classification(&self) -> bool {
        self.label_type == LabelType::Classification
    }
}

/// Create payload; `created_at` is set when recreating a deleted label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLabel {
    pub id: String,
    pub image_id: String,
    #[serde(rename = "type")]
    pub label_type: LabelType,
    pub geometry: Geometry,
    pub label_class_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smart_tool_input: Option<SmartToolInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Label> for NewLabel {
    fn from(label: &Label) -> Self {
        Self {
            id: label.id.clone(),
            image_id: label.image_id.clone(),
            label_type: label.label_type,
            geometry: label.geometry.clone(),
            label_class_id: label.label_class_id.clone(),
            smart_tool_input: label.smart_tool_input.clone(),
            created_at: Some(label.created_at),
        }
    }
}
