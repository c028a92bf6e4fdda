//! Bounding-box geometry for rotated images.

use super::snap;

/// Normalize an angle in degrees to `[0, 360)`.
pub fn normalize_degrees(angle_degrees: f64) -> f64 {
    let normalized = snap(angle_degrees.rem_euclid(360.0));
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Number of clockwise quarter turns if `angle_degrees` is an exact multiple
/// of 90, otherwise `None`.
///
/// ```
/// use pixelsmith_core::geometry::quarter_turns;
///
/// assert_eq!(quarter_turns(-90.0), Some(3));
/// assert_eq!(quarter_turns(45.0), None);
/// ```
pub fn quarter_turns(angle_degrees: f64) -> Option<u8> {
    if !angle_degrees.is_finite() {
        return None;
    }
    let turns = normalize_degrees(angle_degrees) / 90.0;
    let snapped = snap(turns);
    if snapped.fract() == 0.0 {
        Some((snapped as u8) % 4)
    } else {
        None
    }
}

/// Compute the dimensions of the bounding box for a rotated image.
///
/// When an image is rotated about its center, its corners extend beyond the
/// original bounds. This returns the minimal axis-aligned box containing the
/// whole rotated rectangle, with both sides rounded up to whole pixels so no
/// rotated pixel is ever cropped:
///
/// ```text
/// box_w = w * |cos θ| + h * |sin θ|
/// box_h = w * |sin θ| + h * |cos θ|
/// ```
///
/// # Example
///
/// ```
/// use pixelsmith_core::geometry::rotated_bounding_box;
///
/// // 90-degree rotation swaps dimensions
/// assert_eq!(rotated_bounding_box(100, 50, 90.0), (50, 100));
///
/// // |cos 45| == |sin 45|, so the box is square
/// assert_eq!(rotated_bounding_box(800, 600, 45.0), (990, 990));
/// ```
pub fn rotated_bounding_box(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    if !angle_degrees.is_finite() {
        return (width.max(1), height.max(1));
    }

    // Exact quarter turns never go through trigonometry
    if let Some(turns) = quarter_turns(angle_degrees) {
        return if turns % 2 == 0 {
            (width.max(1), height.max(1))
        } else {
            (height.max(1), width.max(1))
        };
    }

    let angle_rad = angle_degrees.to_radians();
    let cos = angle_rad.cos().abs();
    let sin = angle_rad.sin().abs();

    let w = width as f64;
    let h = height as f64;

    let box_w = snap(w * cos + h * sin).ceil() as u32;
    let box_h = snap(w * sin + h * cos).ceil() as u32;

    (box_w.max(1), box_h.max(1))
}
