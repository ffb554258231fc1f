use serde::{Deserialize, Serialize};

use super::Geometry;

/// An image of a dataset; read-only from the editor's point of view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    pub dataset_id: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub url: String,
}

impl Image {
    /// Geometry a classification label of this image carries
    pub fn full_geometry(&self) -> Geometry {
        Geometry::full_image(self.width, self.height)
    }
}
