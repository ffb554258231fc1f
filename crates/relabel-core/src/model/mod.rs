//! Entities owned by the remote store
//!
//! Commands never own these; they hold copies of the fields they need to
//! replay an inverse operation.

pub mod geometry;
pub mod image;
pub mod label;
pub mod label_class;

pub use geometry::{Coordinate, Geometry};
pub use image::Image;
pub use label::{Label, LabelType, NewLabel, SmartToolInput};
pub use label_class::{LabelClass, NewLabelClass};
