//! Exact sub-rectangle extraction.

use image::Rgba;

use super::rotate::rotate_flip;
use crate::error::{Result, TransformError};
use crate::geometry::{quarter_turns, CropRect};
use crate::raster::Raster;

/// Copy the pixels under `rect` into a new raster of the rectangle's size.
///
/// No resampling happens: every output pixel is a source pixel.
///
/// # Errors
///
/// - `EmptyCrop` if the rectangle has zero width or height
/// - `InvalidParameters` if the rectangle extends past the source
pub fn crop_extract(source: &Raster, rect: &CropRect) -> Result<Raster> {
    if rect.is_empty() {
        return Err(TransformError::EmptyCrop);
    }
    if !rect.fits_within(source.width, source.height) {
        return Err(TransformError::invalid(format!(
            "crop {}x{}+{}+{} exceeds the {}x{} image",
            rect.width, rect.height, rect.x, rect.y, source.width, source.height
        )));
    }

    let channels = source.channels();
    let row_len = rect.width as usize * channels;
    let mut output = Vec::with_capacity(row_len * rect.height as usize);

    // Copy pixel data row by row
    for y in rect.y..rect.y + rect.height {
        let start = (y as usize * source.width as usize + rect.x as usize) * channels;
        output.extend_from_slice(&source.pixels[start..start + row_len]);
    }

    Ok(Raster::new(rect.width, rect.height, source.layout, output))
}

/// Rotate `source` onto its bounding-box canvas, then extract `rect` from
/// that canvas.
///
/// `rect` is in rotated-canvas coordinates, as produced by an interactive
/// cropper that displays the rotated image.
pub fn crop_rotated(
    source: &Raster,
    rect: &CropRect,
    angle_degrees: f64,
    padding: Rgba<u8>,
) -> Result<Raster> {
    if quarter_turns(angle_degrees) == Some(0) {
        return crop_extract(source, rect);
    }
    let rotated = rotate_flip(source, angle_degrees, false, false, padding);
    crop_extract(&rotated, rect)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::raster::PixelLayout;
    use proptest::prelude::*;

    fn image_and_rect() -> impl Strategy<Value = (Raster, CropRect)> {
        (1u32..=40, 1u32..=40)
            .prop_flat_map(|(w, h)| (Just(w), Just(h), 0..w, 0..h))
            .prop_flat_map(|(w, h, x, y)| (Just(w), Just(h), Just(x), Just(y), 1..=w - x, 1..=h - y))
            .prop_map(|(w, h, x, y, cw, ch)| {
                let pixels = (0..w * h * 3).map(|i| (i % 251) as u8).collect();
                (
                    Raster::new(w, h, PixelLayout::Rgb8, pixels),
                    CropRect::new(x, y, cw, ch),
                )
            })
    }

    proptest! {
        /// Property: Every output pixel equals the source pixel it came from.
        #[test]
        fn prop_crop_is_exact_copy((img, rect) in image_and_rect()) {
            let result = crop_extract(&img, &rect).unwrap();

            prop_assert_eq!(result.dimensions(), (rect.width, rect.height));
            for y in 0..rect.height {
                for x in 0..rect.width {
                    prop_assert_eq!(
                        result.rgba_at(x, y),
                        img.rgba_at(rect.x + x, rect.y + y)
                    );
                }
            }
        }
    }
}
