//! Payloads of the interactive-segmentation endpoint

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::model::{Geometry, SmartToolInput};

/// One inference round trip: current hint points plus image context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    pub label_id: String,
    pub image_id: String,
    /// Remote URL or a `data:` URL built by [`data_url`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub input: SmartToolInput,
}

/// Mask returned by the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResponse {
    pub label_id: String,
    pub geometry: Geometry,
}

/// Encode raw image bytes as a `data:` URL for endpoints that cannot fetch
/// the image themselves
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}
