//! Raster to container encoding.
//!
//! JPEG, PNG and AVIF go through the `image` crate's encoders; WebP goes
//! through libwebp via the `webp` crate, since `image` only writes lossless
//! WebP. The `quality` knob means something different for each one:
//!
//! | Format | Meaning of quality                                   |
//! |--------|------------------------------------------------------|
//! | JPEG   | lossy quantization level                             |
//! | PNG    | compression effort band (fast / default / best)      |
//! | WebP   | lossy VP8 quality                                    |
//! | AVIF   | lossy AV1 quality at a fixed encoder speed           |

use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use std::io::Cursor;
use thiserror::Error;

use super::format::OutputFormat;
use crate::error::TransformError;
use crate::raster::{PixelLayout, Raster};

/// AVIF encoder speed (1 = slowest/best, 10 = fastest).
pub const AVIF_SPEED: u8 = 6;

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// An RGBA raster was handed to a format without alpha
    #[error("{0} cannot store an alpha channel; flatten the image first")]
    AlphaNotFlattened(OutputFormat),

    /// The underlying codec failed
    #[error("{format} encoding failed: {message}")]
    EncodingFailed {
        format: OutputFormat,
        message: String,
    },
}

impl From<EncodeError> for TransformError {
    fn from(err: EncodeError) -> Self {
        TransformError::EncodeFailed(err.to_string())
    }
}

/// Encode a raster to the given format.
///
/// # Arguments
///
/// * `raster` - RGB or RGBA pixel data
/// * `format` - Target container
/// * `quality` - 1-100; values outside the range are clamped, not rejected
///
/// # Returns
///
/// The encoded bytes, or an error if the raster is malformed or the codec
/// fails. JPEG rejects RGBA rasters.
///
/// # Example
///
/// ```ignore
/// use pixelsmith_core::encode::{encode, OutputFormat};
///
/// let png = encode(&raster, OutputFormat::Png, 80)?;
/// assert_eq!(&png[1..4], b"PNG");
/// ```
pub fn encode(raster: &Raster, format: OutputFormat, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = raster.dimensions();
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = raster.pixel_count() * raster.channels();
    if raster.pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: raster.pixels.len(),
        });
    }

    let quality = quality.clamp(1, 100);
    let color_type = match raster.layout {
        PixelLayout::Rgb8 => ExtendedColorType::Rgb8,
        PixelLayout::Rgba8 => ExtendedColorType::Rgba8,
    };

    let mut buffer = Cursor::new(Vec::new());
    let result = match format {
        OutputFormat::Jpeg => {
            if raster.has_alpha() {
                return Err(EncodeError::AlphaNotFlattened(format));
            }
            JpegEncoder::new_with_quality(&mut buffer, quality).write_image(
                &raster.pixels,
                width,
                height,
                color_type,
            )
        }
        OutputFormat::Png => PngEncoder::new_with_quality(
            &mut buffer,
            png_compression(quality),
            FilterType::Adaptive,
        )
        .write_image(&raster.pixels, width, height, color_type),
        OutputFormat::WebP => return encode_webp(raster, quality),
        OutputFormat::Avif => AvifEncoder::new_with_speed_quality(&mut buffer, AVIF_SPEED, quality)
            .write_image(&raster.pixels, width, height, color_type),
    };

    result.map_err(|e| EncodeError::EncodingFailed {
        format,
        message: e.to_string(),
    })?;

    Ok(buffer.into_inner())
}

/// Compression effort band for a PNG quality value.
pub fn png_compression(quality: u8) -> CompressionType {
    match quality {
        0..=33 => CompressionType::Fast,
        34..=66 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Lossy WebP; alpha, when present, is kept losslessly by libwebp.
fn encode_webp(raster: &Raster, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let encoder = match raster.layout {
        PixelLayout::Rgb8 => webp::Encoder::from_rgb(&raster.pixels, raster.width, raster.height),
        PixelLayout::Rgba8 => webp::Encoder::from_rgba(&raster.pixels, raster.width, raster.height),
    };
    let memory = encoder
        .encode_simple(false, quality as f32)
        .map_err(|e| EncodeError::EncodingFailed {
            format: OutputFormat::WebP,
            message: format!("{:?}", e),
        })?;
    Ok(memory.to_vec())
}
