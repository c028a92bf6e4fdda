//! "Contain" resize geometry.
//!
//! The source is scaled so it fits entirely inside the requested box without
//! cropping and is centered; whatever is left over becomes padding. Asking for
//! only one side derives the other from the source aspect ratio, in which case
//! there is never any padding.

use crate::error::{Result, TransformError};

/// Placement of a scaled image on its output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitGeometry {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub draw_width: u32,
    pub draw_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl FitGeometry {
    /// True when part of the canvas is not covered by the drawn image.
    pub fn has_padding(&self) -> bool {
        self.draw_width != self.canvas_width || self.draw_height != self.canvas_height
    }

    /// True when the drawn image has exactly the source dimensions.
    pub fn is_identity(&self, source_width: u32, source_height: u32) -> bool {
        !self.has_padding()
            && self.draw_width == source_width
            && self.draw_height == source_height
    }
}

/// Compute the contain-fit of a `source_width x source_height` image.
///
/// # Errors
///
/// Returns `InvalidParameters` if neither target is given, or if any given
/// dimension (source or target) is zero.
///
/// # Example
///
/// ```
/// use pixelsmith_core::geometry::resize_fit;
///
/// let fit = resize_fit(1000, 500, Some(400), Some(400)).unwrap();
/// assert_eq!((fit.draw_width, fit.draw_height), (400, 200));
/// assert_eq!((fit.offset_x, fit.offset_y), (0, 100));
/// ```
pub fn resize_fit(
    source_width: u32,
    source_height: u32,
    target_width: Option<u32>,
    target_height: Option<u32>,
) -> Result<FitGeometry> {
    if source_width == 0 || source_height == 0 {
        return Err(TransformError::invalid(format!(
            "source dimensions must be non-zero, got {source_width}x{source_height}"
        )));
    }
    if target_width == Some(0) || target_height == Some(0) {
        return Err(TransformError::invalid("width and height must be positive"));
    }

    let (sw, sh) = (source_width as f64, source_height as f64);

    let fit = match (target_width, target_height) {
        (None, None) => {
            return Err(TransformError::invalid(
                "resize requires a width, a height, or both",
            ))
        }
        (Some(width), None) => {
            let height = derive_side(width, sh / sw);
            unpadded(width, height)
        }
        (None, Some(height)) => {
            let width = derive_side(height, sw / sh);
            unpadded(width, height)
        }
        (Some(width), Some(height)) => {
            let scale = (width as f64 / sw).min(height as f64 / sh);
            let draw_width = ((sw * scale).round() as u32).clamp(1, width);
            let draw_height = ((sh * scale).round() as u32).clamp(1, height);
            FitGeometry {
                canvas_width: width,
                canvas_height: height,
                draw_width,
                draw_height,
                offset_x: (width - draw_width) / 2,
                offset_y: (height - draw_height) / 2,
            }
        }
    };

    Ok(fit)
}

/// Scale `known` by `ratio`, never collapsing to zero.
fn derive_side(known: u32, ratio: f64) -> u32 {
    ((known as f64 * ratio).round() as u32).max(1)
}

fn unpadded(width: u32, height: u32) -> FitGeometry {
    FitGeometry {
        canvas_width: width,
        canvas_height: height,
        draw_width: width,
        draw_height: height,
        offset_x: 0,
        offset_y: 0,
    }
}
