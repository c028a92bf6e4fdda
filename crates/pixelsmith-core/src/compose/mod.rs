//! Raster compositor.
//!
//! Produces the output pixel buffer from a decoded source and computed
//! geometry. Three drawing operations are supported:
//!
//! - [`resize_draw`]: scale into a contain fit, padding the remainder
//! - [`rotate_flip`]: rotate about the center onto the bounding-box canvas,
//!   with optional mirroring applied before the rotation
//! - [`crop_extract`]: copy an exact sub-rectangle
//!
//! [`flatten`] composites an RGBA result over a solid background for
//! formats that cannot carry alpha.

mod affine;
mod crop;
mod resize;
mod rotate;

pub use affine::{Affine, AffineStep};
pub use crop::{crop_extract, crop_rotated};
pub use resize::{resize_draw, RESIZE_FILTER};
pub use rotate::rotate_flip;

use image::{DynamicImage, Rgb};

use crate::error::{Result, TransformError};
use crate::raster::{PixelLayout, Raster};

pub(crate) fn to_dynamic(source: &Raster) -> Result<DynamicImage> {
    source.to_dynamic().ok_or_else(|| {
        TransformError::invalid(format!(
            "pixel buffer of {} bytes does not match a {}x{} image",
            source.pixels.len(),
            source.width,
            source.height
        ))
    })
}

/// Composite `source` over an opaque `background`, producing RGB.
///
/// RGB sources are returned unchanged.
pub fn flatten(source: &Raster, background: Rgb<u8>) -> Raster {
    if !source.has_alpha() {
        return source.clone();
    }

    let mut pixels = Vec::with_capacity(source.pixel_count() * 3);
    for px in source.pixels.chunks_exact(4) {
        let alpha = px[3] as u32;
        for c in 0..3 {
            let blended = px[c] as u32 * alpha + background[c] as u32 * (255 - alpha);
            pixels.push(((blended + 127) / 255) as u8);
        }
    }

    Raster::new(source.width, source.height, PixelLayout::Rgb8, pixels)
}
