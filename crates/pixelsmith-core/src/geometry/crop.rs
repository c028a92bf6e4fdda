//! Mapping an interactive crop viewport back to source pixels.
//!
//! The interactive cropper shows the source (rotated onto its bounding box,
//! which we call the frame) behind a fixed-aspect viewport. The user zooms and
//! pans the image under the viewport. To export, the visible viewport has to
//! be expressed as a rectangle in the unrotated source.
//!
//! # Algorithm
//!
//! 1. At zoom 1 the viewport is the largest `viewport_aspect` rectangle that
//!    fits inside the frame, centered on it.
//! 2. Zoom shrinks it by `1/zoom`; pan moves its center by `-pan/zoom`.
//! 3. Its corners are rotated by `-rotation` about the frame center, which is
//!    also the source center.
//! 4. The axis-aligned bounds of those corners, snapped outward to whole
//!    pixels, are intersected with the source.

use serde::{Deserialize, Serialize};

use super::rotation::rotated_bounding_box;
use super::snap;
use crate::error::{Result, TransformError};

/// Interactive crop state, relative to the display frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropState {
    /// Magnification, 1.0 = viewport fills the frame.
    pub zoom: f64,
    /// Horizontal image offset in frame pixels at zoom 1 (positive = right).
    pub pan_x: f64,
    /// Vertical image offset in frame pixels at zoom 1 (positive = down).
    pub pan_y: f64,
    /// Rotation of the source in degrees (positive = clockwise).
    pub rotation_deg: f64,
}

impl Default for CropState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            rotation_deg: 0.0,
        }
    }
}

/// An axis-aligned rectangle in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle covering a whole `width x height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the rectangle lies inside `[0, width] x [0, height]`.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width as u64 && self.bottom() <= height as u64
    }
}

/// Compute the source-pixel crop rectangle for an interactive crop state.
///
/// # Arguments
///
/// * `source_width`, `source_height` - Dimensions of the unrotated source
/// * `state` - Zoom, pan and rotation of the cropper
/// * `viewport_aspect` - Width / height of the crop viewport
///
/// # Errors
///
/// - `InvalidParameters` for zero source dimensions or a non-positive,
///   non-finite zoom, aspect, pan or rotation
/// - `EmptyCrop` if the viewport does not overlap the source
///
/// # Example
///
/// ```
/// use pixelsmith_core::geometry::{crop_rectangle, CropRect, CropState};
///
/// let rect = crop_rectangle(1000, 500, &CropState::default(), 2.0).unwrap();
/// assert_eq!(rect, CropRect::full(1000, 500));
/// ```
pub fn crop_rectangle(
    source_width: u32,
    source_height: u32,
    state: &CropState,
    viewport_aspect: f64,
) -> Result<CropRect> {
    validate(source_width, source_height, state, viewport_aspect)?;

    let (frame_w, frame_h) = rotated_bounding_box(source_width, source_height, state.rotation_deg);
    let view = Viewport::new(frame_w as f64, frame_h as f64, state, viewport_aspect);
    let (center_x, center_y, view_w, view_h) = (view.center_x, view.center_y, view.width, view.height);

    let angle = state.rotation_deg.to_radians();
    let (sin, cos) = (snap(angle.sin()), snap(angle.cos()));

    let src_cx = source_width as f64 / 2.0;
    let src_cy = source_height as f64 / 2.0;

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for (dx, dy) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
        let fx = center_x + dx * view_w;
        let fy = center_y + dy * view_h;

        // Rotate by -angle to undo the display rotation
        let sx = fx * cos + fy * sin + src_cx;
        let sy = -fx * sin + fy * cos + src_cy;

        min_x = min_x.min(sx);
        min_y = min_y.min(sy);
        max_x = max_x.max(sx);
        max_y = max_y.max(sy);
    }

    pixel_bounds(min_x, min_y, max_x, max_y, source_width, source_height)
}

/// Compute the crop viewport in frame coordinates.
///
/// The frame is the source rotated onto its bounding box, so the result can
/// be passed to `crop_rotated` together with `state.rotation_deg` to get
/// exactly what the cropper displays. With no rotation this equals
/// [`crop_rectangle`].
///
/// # Errors
///
/// Same as [`crop_rectangle`].
pub fn crop_viewport(
    source_width: u32,
    source_height: u32,
    state: &CropState,
    viewport_aspect: f64,
) -> Result<CropRect> {
    validate(source_width, source_height, state, viewport_aspect)?;

    let (frame_w, frame_h) = rotated_bounding_box(source_width, source_height, state.rotation_deg);
    let view = Viewport::new(frame_w as f64, frame_h as f64, state, viewport_aspect);

    let cx = view.center_x + frame_w as f64 / 2.0;
    let cy = view.center_y + frame_h as f64 / 2.0;

    pixel_bounds(
        cx - view.width / 2.0,
        cy - view.height / 2.0,
        cx + view.width / 2.0,
        cy + view.height / 2.0,
        frame_w,
        frame_h,
    )
}

/// Viewport size and center offset from the frame center, in frame pixels.
struct Viewport {
    center_x: f64,
    center_y: f64,
    width: f64,
    height: f64,
}

impl Viewport {
    fn new(frame_w: f64, frame_h: f64, state: &CropState, viewport_aspect: f64) -> Self {
        // Largest viewport of the requested aspect inside the frame
        let (base_w, base_h) = if frame_w / frame_h > viewport_aspect {
            (frame_h * viewport_aspect, frame_h)
        } else {
            (frame_w, frame_w / viewport_aspect)
        };

        Self {
            center_x: -state.pan_x / state.zoom,
            center_y: -state.pan_y / state.zoom,
            width: base_w / state.zoom,
            height: base_h / state.zoom,
        }
    }
}

/// Snap real-valued bounds outward to whole pixels and clamp to `[0, w] x [0, h]`.
fn pixel_bounds(
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    width: u32,
    height: u32,
) -> Result<CropRect> {
    let left = snap(min_x).floor().clamp(0.0, width as f64);
    let top = snap(min_y).floor().clamp(0.0, height as f64);
    let right = snap(max_x).ceil().clamp(0.0, width as f64);
    let bottom = snap(max_y).ceil().clamp(0.0, height as f64);

    if right <= left || bottom <= top {
        return Err(TransformError::EmptyCrop);
    }

    Ok(CropRect::new(
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

fn validate(
    source_width: u32,
    source_height: u32,
    state: &CropState,
    viewport_aspect: f64,
) -> Result<()> {
    if source_width == 0 || source_height == 0 {
        return Err(TransformError::invalid("source dimensions must be non-zero"));
    }
    if !(state.zoom.is_finite() && state.zoom > 0.0) {
        return Err(TransformError::invalid(format!(
            "zoom must be a positive number, got {}",
            state.zoom
        )));
    }
    if !(viewport_aspect.is_finite() && viewport_aspect > 0.0) {
        return Err(TransformError::invalid(format!(
            "viewport aspect must be a positive number, got {viewport_aspect}"
        )));
    }
    if !(state.pan_x.is_finite() && state.pan_y.is_finite() && state.rotation_deg.is_finite()) {
        return Err(TransformError::invalid("pan and rotation must be finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_viewport_is_full_source() {
        let rect = crop_rectangle(1000, 500, &CropState::default(), 2.0).unwrap();
        assert_eq!(rect, CropRect::full(1000, 500));
    }

    #[test]
    fn test_square_viewport_on_landscape() {
        // Square viewport inside 1000x500 is 500x500, centered
        let rect = crop_rectangle(1000, 500, &CropState::default(), 1.0).unwrap();
        assert_eq!(rect, CropRect::new(250, 0, 500, 500));
    }

    #[test]
    fn test_zoom_shrinks_viewport() {
        let state = CropState {
            zoom: 2.0,
            ..Default::default()
        };
        let rect = crop_rectangle(1000, 500, &state, 2.0).unwrap();
        assert_eq!(rect, CropRect::new(250, 125, 500, 250));
    }

    #[test]
    fn test_pan_moves_viewport_opposite_to_image() {
        // Moving the image right by 100 shows content further left
        let state = CropState {
            zoom: 2.0,
            pan_x: 100.0,
            ..Default::default()
        };
        let rect = crop_rectangle(1000, 500, &state, 2.0).unwrap();
        assert_eq!(rect, CropRect::new(200, 125, 500, 250));
    }

    #[test]
    fn test_pan_is_clamped_to_source() {
        let state = CropState {
            pan_x: 300.0,
            ..Default::default()
        };
        let rect = crop_rectangle(1000, 500, &state, 2.0).unwrap();
        assert_eq!(rect, CropRect::new(0, 0, 700, 500));
    }

    #[test]
    fn test_pan_beyond_source_is_empty() {
        let state = CropState {
            pan_x: 5000.0,
            ..Default::default()
        };
        let result = crop_rectangle(1000, 500, &state, 2.0);
        assert!(matches!(result, Err(TransformError::EmptyCrop)));
    }

    #[test]
    fn test_quarter_turn_maps_back_to_full_source() {
        // Frame is 500x1000, a 0.5 aspect viewport covers all of it
        let state = CropState {
            rotation_deg: 90.0,
            ..Default::default()
        };
        let rect = crop_rectangle(1000, 500, &state, 0.5).unwrap();
        assert_eq!(rect, CropRect::full(1000, 500));
    }

    #[test]
    fn test_quarter_turn_pan_direction() {
        // After a clockwise quarter turn, the frame's top edge is the
        // source's left edge. Moving the image down reveals the frame top,
        // so the crop moves toward the source's left.
        let state = CropState {
            zoom: 2.0,
            pan_y: 100.0,
            rotation_deg: 90.0,
            ..Default::default()
        };
        let rect = crop_rectangle(1000, 500, &state, 0.5).unwrap();
        assert_eq!(rect, CropRect::new(200, 125, 500, 250));
    }

    #[test]
    fn test_arbitrary_rotation_stays_in_bounds() {
        let state = CropState {
            rotation_deg: 30.0,
            ..Default::default()
        };
        let rect = crop_rectangle(800, 600, &state, 4.0 / 3.0).unwrap();
        assert!(rect.fits_within(800, 600));
        assert!(!rect.is_empty());
    }

    #[test]
    fn test_invalid_zoom() {
        let state = CropState {
            zoom: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            crop_rectangle(100, 100, &state, 1.0),
            Err(TransformError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_invalid_aspect() {
        assert!(crop_rectangle(100, 100, &CropState::default(), f64::NAN).is_err());
        assert!(crop_rectangle(100, 100, &CropState::default(), -1.0).is_err());
    }

    #[test]
    fn test_crop_rect_edges() {
        let rect = CropRect::new(10, 20, 30, 40);
        assert_eq!(rect.right(), 40);
        assert_eq!(rect.bottom(), 60);
        assert!(rect.fits_within(40, 60));
        assert!(!rect.fits_within(39, 60));
    }

    #[test]
    fn test_viewport_matches_rectangle_without_rotation() {
        let state = CropState {
            zoom: 2.0,
            pan_x: 100.0,
            ..Default::default()
        };
        assert_eq!(
            crop_viewport(1000, 500, &state, 2.0).unwrap(),
            crop_rectangle(1000, 500, &state, 2.0).unwrap()
        );
    }

    #[test]
    fn test_viewport_is_in_frame_coordinates() {
        // A quarter turn makes the frame 500x1000; a 1:2 viewport fills it
        let state = CropState {
            rotation_deg: 90.0,
            ..Default::default()
        };
        let rect = crop_viewport(1000, 500, &state, 0.5).unwrap();
        assert_eq!(rect, CropRect::full(500, 1000));
    }

    #[test]
    fn test_viewport_zoom_centers_in_frame() {
        let state = CropState {
            zoom: 2.0,
            rotation_deg: 90.0,
            ..Default::default()
        };
        let rect = crop_viewport(1000, 500, &state, 0.5).unwrap();
        assert_eq!(rect, CropRect::new(125, 250, 250, 500));
    }

    #[test]
    fn test_crop_state_serde_names() {
        let state: CropState =
            serde_json::from_str(r#"{"zoom":1.5,"panX":1,"panY":2,"rotationDeg":90}"#).unwrap();
        assert_eq!(state.zoom, 1.5);
        assert_eq!(state.pan_y, 2.0);
        assert_eq!(state.rotation_deg, 90.0);
    }
}
