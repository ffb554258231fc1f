use serde::{Deserialize, Serialize};

/// `[x, y]` in image pixel space
pub type Coordinate = [f64; 2];

/// GeoJSON-shaped label geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// First ring is the outer boundary; rings are closed (last == first)
    Polygon { coordinates: Vec<Vec<Coordinate>> },
}

impl Geometry {
    /// Axis-aligned rectangle as a closed polygon ring
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        let (x_max, y_max) = (x + width, y + height);
        Geometry::Polygon {
            coordinates: vec![vec![
                [x, y],
                [x, y_max],
                [x_max, y_max],
                [x_max, y],
                [x, y],
            ]],
        }
    }

    /// Polygon covering a whole image; used by classification labels
    pub fn full_image(width: u32, height: u32) -> Self {
        Self::rectangle(0.0, 0.0, f64::from(width), f64::from(height))
    }

    /// `(x_min, y_min, x_max, y_max)` of every vertex, `None` for an empty polygon
    pub fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        let Geometry::Polygon { coordinates } = self;
        let mut points = coordinates.iter().flatten();
        let first = points.next()?;
        let init = (first[0], first[1], first[0], first[1]);
        Some(points.fold(init, |(x0, y0, x1, y1), p| {
            (x0.min(p[0]), y0.min(p[1]), x1.max(p[0]), y1.max(p[1]))
        }))
    }
}
