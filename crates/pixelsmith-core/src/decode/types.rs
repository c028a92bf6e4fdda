//! Core types for source decoding.

use image::ImageFormat;
use thiserror::Error;

use crate::encode::OutputFormat;
use crate::error::TransformError;
use crate::raster::Raster;

/// Error types for source decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No bytes were supplied.
    #[error("Image payload is empty")]
    Empty,

    /// The container format is not recognized or supported.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),
}

impl From<DecodeError> for TransformError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Empty => TransformError::invalid(err.to_string()),
            DecodeError::InvalidFormat | DecodeError::CorruptedFile(_) => {
                TransformError::DecodeFailed(err.to_string())
            }
        }
    }
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// A decoded, upright source image.
///
/// Pixels are normalized to 8 bits per channel; the bit depth the container
/// stored is kept as metadata only.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Upright pixel data (EXIF orientation already applied).
    pub raster: Raster,
    /// Container format detected from the magic bytes.
    pub format: ImageFormat,
    /// Bits per channel in the source file.
    pub bit_depth: u8,
    /// Orientation tag found in the file, if any.
    pub orientation: Orientation,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.raster.width
    }

    pub fn height(&self) -> u32 {
        self.raster.height
    }

    /// MIME type of the source container.
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Output format that writes this source's container back, if encodable.
    pub fn output_format(&self) -> Option<OutputFormat> {
        OutputFormat::from_image_format(self.format)
    }
}
