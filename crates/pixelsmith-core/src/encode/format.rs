//! Output format identifiers.

use std::fmt;
use std::str::FromStr;

use image::{ImageFormat, Rgba};
use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// An encodable output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy, no alpha.
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
    /// Lossless, alpha preserved.
    Png,
    /// Lossy VP8, alpha preserved.
    WebP,
    /// Lossy AV1, alpha preserved.
    Avif,
}

impl OutputFormat {
    /// Lowercase name as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    /// MIME type for the `Content-Type` header.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Avif => "image/avif",
        }
    }

    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }

    /// Fill color for canvas area not covered by the image.
    ///
    /// Transparent for formats with alpha, opaque black otherwise.
    pub fn padding_color(self) -> Rgba<u8> {
        if self.supports_alpha() {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([0, 0, 0, 255])
        }
    }

    /// Map a decoded container format to the output format that re-encodes it.
    ///
    /// Returns `None` for containers that cannot be written back.
    pub fn from_image_format(format: ImageFormat) -> Option<OutputFormat> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            ImageFormat::Avif => Some(OutputFormat::Avif),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            _ => Err(TransformError::UnsupportedFormat(s.trim().to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
