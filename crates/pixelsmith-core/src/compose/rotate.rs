//! Rotation and mirroring onto an expanded canvas.
//!
//! The drawing is expressed as the sequence a canvas export would use:
//!
//! ```text
//! translate(canvas_w / 2, canvas_h / 2)
//! rotate(θ)
//! scale(flip_h ? -1 : 1, flip_v ? -1 : 1)
//! draw(source, -src_w / 2, -src_h / 2)
//! ```
//!
//! and rendered by inverse mapping: every destination pixel center is pushed
//! back through the inverted transform to find where it samples the source.
//!
//! Quarter turns land exactly on pixel centers, so they use nearest sampling
//! and are lossless. Any other angle is sampled bilinearly with premultiplied
//! alpha, and canvas area outside the source takes the padding color.

use image::Rgba;

use super::affine::{Affine, AffineStep};
use crate::geometry::{quarter_turns, rotated_bounding_box};
use crate::raster::{PixelLayout, Raster};

/// Rotate `source` about its center and mirror it, expanding the canvas to
/// the rotated bounding box so nothing is clipped.
///
/// Mirroring is applied in the source's own frame before the rotation.
///
/// # Arguments
///
/// * `source` - Image to draw; never modified
/// * `angle_degrees` - Rotation in degrees (positive = clockwise)
/// * `flip_h`, `flip_v` - Mirror horizontally / vertically
/// * `padding` - Color for canvas area the rotated image does not cover
pub fn rotate_flip(
    source: &Raster,
    angle_degrees: f64,
    flip_h: bool,
    flip_v: bool,
    padding: Rgba<u8>,
) -> Raster {
    let (dst_w, dst_h) = rotated_bounding_box(source.width, source.height, angle_degrees);

    let steps = [
        AffineStep::Translate(dst_w as f64 / 2.0, dst_h as f64 / 2.0),
        AffineStep::Rotate(angle_degrees.to_radians()),
        AffineStep::Scale(
            if flip_h { -1.0 } else { 1.0 },
            if flip_v { -1.0 } else { 1.0 },
        ),
    ];
    // Rotation and unit scales are never singular
    let inverse = Affine::from_steps(&steps)
        .inverse()
        .unwrap_or(Affine::IDENTITY);

    if quarter_turns(angle_degrees).is_some() {
        remap_nearest(source, dst_w, dst_h, &inverse)
    } else {
        remap_bilinear(source, dst_w, dst_h, &inverse, padding)
    }
}

/// Source position sampled by the destination pixel at `(x, y)`.
#[inline]
fn source_point(source: &Raster, inverse: &Affine, x: u32, y: u32) -> (f64, f64) {
    let (u, v) = inverse.apply(x as f64 + 0.5, y as f64 + 0.5);
    (
        u + source.width as f64 / 2.0,
        v + source.height as f64 / 2.0,
    )
}

/// Lossless remap for quarter turns: every destination pixel maps onto
/// exactly one source pixel, so the layout is preserved.
fn remap_nearest(source: &Raster, dst_w: u32, dst_h: u32, inverse: &Affine) -> Raster {
    let channels = source.channels();
    let mut output = vec![0u8; dst_w as usize * dst_h as usize * channels];

    for y in 0..dst_h {
        for x in 0..dst_w {
            let (u, v) = source_point(source, inverse, x, y);
            let sx = (u.floor() as i64).clamp(0, source.width as i64 - 1) as usize;
            let sy = (v.floor() as i64).clamp(0, source.height as i64 - 1) as usize;

            let src_idx = (sy * source.width as usize + sx) * channels;
            let dst_idx = (y as usize * dst_w as usize + x as usize) * channels;
            output[dst_idx..dst_idx + channels]
                .copy_from_slice(&source.pixels[src_idx..src_idx + channels]);
        }
    }

    Raster::new(dst_w, dst_h, source.layout, output)
}

fn remap_bilinear(
    source: &Raster,
    dst_w: u32,
    dst_h: u32,
    inverse: &Affine,
    padding: Rgba<u8>,
) -> Raster {
    let mut output = vec![0u8; dst_w as usize * dst_h as usize * 4];

    for y in 0..dst_h {
        for x in 0..dst_w {
            let (u, v) = source_point(source, inverse, x, y);
            let pixel = sample_bilinear(source, u - 0.5, v - 0.5, padding);

            let dst_idx = (y as usize * dst_w as usize + x as usize) * 4;
            output[dst_idx..dst_idx + 4].copy_from_slice(&pixel);
        }
    }

    Raster::new(dst_w, dst_h, PixelLayout::Rgba8, output)
}

/// Read a tap as premultiplied RGBA, falling back to the padding color.
#[inline]
fn tap(source: &Raster, x: i64, y: i64, padding: Rgba<u8>) -> [f64; 4] {
    let [r, g, b, a] = if x < 0 || y < 0 || x >= source.width as i64 || y >= source.height as i64
    {
        padding.0
    } else {
        source.rgba_at(x as u32, y as u32)
    };
    let alpha = a as f64 / 255.0;
    [r as f64 * alpha, g as f64 * alpha, b as f64 * alpha, a as f64]
}

/// Sample a pixel using bilinear interpolation.
///
/// `(x, y)` is in pixel-index space (pixel `i` is centered on `i`). Taps are
/// blended premultiplied so transparent padding does not darken edges.
fn sample_bilinear(source: &Raster, x: f64, y: f64, padding: Rgba<u8>) -> [u8; 4] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let p00 = tap(source, x0, y0, padding);
    let p10 = tap(source, x0 + 1, y0, padding);
    let p01 = tap(source, x0, y0 + 1, padding);
    let p11 = tap(source, x0 + 1, y0 + 1, padding);

    let mut acc = [0.0f64; 4];
    for i in 0..4 {
        acc[i] = p00[i] * (1.0 - fx) * (1.0 - fy)
            + p10[i] * fx * (1.0 - fy)
            + p01[i] * (1.0 - fx) * fy
            + p11[i] * fx * fy;
    }

    let alpha = acc[3];
    if alpha <= 0.0 {
        return [0, 0, 0, 0];
    }
    let unpremultiply = 255.0 / alpha;
    [
        (acc[0] * unpremultiply).clamp(0.0, 255.0).round() as u8,
        (acc[1] * unpremultiply).clamp(0.0, 255.0).round() as u8,
        (acc[2] * unpremultiply).clamp(0.0, 255.0).round() as u8,
        alpha.clamp(0.0, 255.0).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    /// Create a test image where every pixel is unique.
    fn test_image(width: u32, height: u32) -> Raster {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(x as u8);
                pixels.push(y as u8);
                pixels.push(((x * 7 + y * 13) % 256) as u8);
            }
        }
        Raster::new(width, height, PixelLayout::Rgb8, pixels)
    }

    /// A smooth gradient survives resampling with small error.
    fn gradient_image(width: u32, height: u32) -> Raster {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push((x * 2) as u8);
                pixels.push((y * 2) as u8);
                pixels.push(128);
            }
        }
        Raster::new(width, height, PixelLayout::Rgb8, pixels)
    }

    fn rgb_at(raster: &Raster, x: u32, y: u32) -> [u8; 3] {
        let [r, g, b, _] = raster.rgba_at(x, y);
        [r, g, b]
    }

    #[test]
    fn test_no_rotation_is_copy() {
        let img = test_image(20, 10);
        let result = rotate_flip(&img, 0.0, false, false, CLEAR);
        assert_eq!(result, img);
    }

    #[test]
    fn test_quarter_turn_clockwise() {
        let img = test_image(4, 2);
        let result = rotate_flip(&img, 90.0, false, false, CLEAR);

        assert_eq!(result.dimensions(), (2, 4));
        assert_eq!(result.layout, PixelLayout::Rgb8);
        // Clockwise: the source's bottom-left corner becomes the top-left
        assert_eq!(rgb_at(&result, 0, 0), rgb_at(&img, 0, 1));
        // and the source's top-left corner becomes the top-right
        assert_eq!(rgb_at(&result, 1, 0), rgb_at(&img, 0, 0));
    }

    #[test]
    fn test_half_turn() {
        let img = test_image(5, 3);
        let result = rotate_flip(&img, 180.0, false, false, CLEAR);

        assert_eq!(result.dimensions(), (5, 3));
        assert_eq!(rgb_at(&result, 0, 0), rgb_at(&img, 4, 2));
        assert_eq!(rgb_at(&result, 4, 2), rgb_at(&img, 0, 0));
    }

    #[test]
    fn test_flip_horizontal() {
        let img = test_image(5, 3);
        let result = rotate_flip(&img, 0.0, true, false, CLEAR);

        assert_eq!(rgb_at(&result, 0, 1), rgb_at(&img, 4, 1));
        assert_eq!(rgb_at(&result, 4, 2), rgb_at(&img, 0, 2));
    }

    #[test]
    fn test_flip_vertical() {
        let img = test_image(5, 3);
        let result = rotate_flip(&img, 0.0, false, true, CLEAR);

        assert_eq!(rgb_at(&result, 2, 0), rgb_at(&img, 2, 2));
    }

    #[test]
    fn test_both_flips_equal_half_turn() {
        let img = test_image(6, 4);
        let flipped = rotate_flip(&img, 0.0, true, true, CLEAR);
        let turned = rotate_flip(&img, 180.0, false, false, CLEAR);
        assert_eq!(flipped, turned);
    }

    #[test]
    fn test_flip_is_applied_before_rotation() {
        let img = test_image(4, 2);
        let result = rotate_flip(&img, 90.0, true, false, CLEAR);

        // Mirror first: (3, 1) moves to (0, 1), then the clockwise turn
        // brings the source's bottom-left to the top-left.
        assert_eq!(rgb_at(&result, 0, 0), rgb_at(&img, 3, 1));
    }

    #[test]
    fn test_four_quarter_turns_restore_original() {
        let img = test_image(7, 3);
        let mut result = img.clone();
        for _ in 0..4 {
            result = rotate_flip(&result, 90.0, false, false, CLEAR);
        }
        assert_eq!(result, img);
    }

    #[test]
    fn test_rotation_expands_canvas() {
        let img = test_image(100, 100);
        let result = rotate_flip(&img, 45.0, false, false, CLEAR);

        assert_eq!(result.dimensions(), (142, 142));
        assert_eq!(result.layout, PixelLayout::Rgba8);
    }

    #[test]
    fn test_corners_are_padding() {
        let img = test_image(50, 50);

        let clear = rotate_flip(&img, 45.0, false, false, CLEAR);
        assert_eq!(clear.rgba_at(0, 0)[3], 0);

        let black = rotate_flip(&img, 45.0, false, false, Rgba([0, 0, 0, 255]));
        assert_eq!(black.rgba_at(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_center_is_opaque() {
        let img = test_image(50, 50);
        let result = rotate_flip(&img, 30.0, false, false, CLEAR);
        assert_eq!(result.rgba_at(result.width / 2, result.height / 2)[3], 255);
    }

    #[test]
    fn test_rotate_and_back_is_equivalent() {
        let img = gradient_image(60, 40);
        let there = rotate_flip(&img, 30.0, false, false, CLEAR);
        let back = rotate_flip(&there, -30.0, false, false, CLEAR);

        // The original sits centered on the larger canvas
        let off_x = (back.width - img.width) as f64 / 2.0;
        let off_y = (back.height - img.height) as f64 / 2.0;

        // Compare the interior, away from resampled edges
        for y in 8..img.height - 8 {
            for x in 8..img.width - 8 {
                let expected = img.rgba_at(x, y);
                let bx = (x as f64 + off_x).round() as u32;
                let by = (y as f64 + off_y).round() as u32;
                let actual = back.rgba_at(bx, by);
                for c in 0..3 {
                    assert!(
                        expected[c].abs_diff(actual[c]) <= 6,
                        "pixel ({}, {}) channel {}: {} vs {}",
                        x,
                        y,
                        c,
                        expected[c],
                        actual[c]
                    );
                }
                assert_eq!(actual[3], 255);
            }
        }
    }

    #[test]
    fn test_alpha_source_keeps_transparency() {
        let img = Raster::filled(10, 10, Rgba([255, 0, 0, 0]));
        let result = rotate_flip(&img, 20.0, false, false, CLEAR);
        assert!(result.pixels.chunks_exact(4).all(|px| px[3] == 0));
    }

    #[test]
    fn test_1x1_image_rotation() {
        let img = Raster::new(1, 1, PixelLayout::Rgb8, vec![128, 128, 128]);
        let result = rotate_flip(&img, 45.0, false, false, CLEAR);
        assert!(result.width >= 1);
        assert!(result.height >= 1);
        assert!(result.is_consistent());
    }

    #[test]
    fn test_source_is_not_mutated() {
        let img = test_image(10, 10);
        let before = img.clone();
        let _ = rotate_flip(&img, 33.0, true, true, CLEAR);
        assert_eq!(img, before);
    }
}
