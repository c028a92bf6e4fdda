//! Pure geometry for the transform pipeline.
//!
//! Nothing in this module touches pixels. Every function is deterministic
//! given its inputs, which is what lets the compositor and the interactive
//! preview share the same numbers.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner, y grows downward
//! - Rotation angles are in degrees, positive = clockwise on screen
//! - Crop rectangles are in whole source pixels

mod crop;
mod fit;
mod rotation;

pub use crop::{crop_rectangle, crop_viewport, CropRect, CropState};
pub use fit::{resize_fit, FitGeometry};
pub use rotation::{normalize_degrees, quarter_turns, rotated_bounding_box};

/// Values closer than this to an integer are treated as that integer.
pub(crate) const SNAP_EPSILON: f64 = 1e-9;

/// Remove floating-point noise around whole numbers.
#[inline]
pub(crate) fn snap(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < SNAP_EPSILON * value.abs().max(1.0) {
        rounded
    } else {
        value
    }
}
