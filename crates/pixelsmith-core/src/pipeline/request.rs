//! Transform request value objects.

use serde::{Deserialize, Serialize};

use super::Limits;
use crate::encode::OutputFormat;
use crate::error::{Result, TransformError};
use crate::geometry::CropRect;

/// Quality used when a request does not name one.
pub const DEFAULT_QUALITY: u8 = 80;

/// Clamp any integer quality into `1..=100`.
pub fn clamp_quality(value: i64) -> u8 {
    value.clamp(1, 100) as u8
}

/// Target box for a contain resize. At least one side must be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A crop rectangle in the coordinates of the (possibly rotated) source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropParams {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Rotation applied to the source before the rectangle is taken.
    #[serde(default)]
    pub rotation_deg: f64,
}

impl CropParams {
    pub fn rect(&self) -> CropRect {
        CropRect::new(self.x, self.y, self.width, self.height)
    }
}

/// Rotation about the center with optional mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateFlipParams {
    #[serde(default)]
    pub rotation_deg: f64,
    #[serde(default)]
    pub flip_h: bool,
    #[serde(default)]
    pub flip_v: bool,
}

/// Output container and quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_quality")]
    pub quality: u8,
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            quality: DEFAULT_QUALITY,
        }
    }
}

/// The single geometric operation a request resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    /// Re-encode only (format conversion or compression).
    Passthrough,
    Resize(ResizeParams),
    Crop(CropParams),
    RotateFlip(RotateFlipParams),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Passthrough => "passthrough",
            Operation::Resize(_) => "resize",
            Operation::Crop(_) => "crop",
            Operation::RotateFlip(_) => "rotate_flip",
        }
    }
}

/// Everything needed to turn one source image into one output image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    #[serde(default)]
    pub resize: Option<ResizeParams>,
    #[serde(default)]
    pub crop: Option<CropParams>,
    #[serde(default)]
    pub rotate_flip: Option<RotateFlipParams>,
    #[serde(default)]
    pub output: OutputSpec,
}

impl TransformRequest {
    pub fn builder() -> TransformRequestBuilder {
        TransformRequestBuilder::default()
    }

    /// Check the request against `limits` and resolve its operation.
    ///
    /// Only parameters are checked here; geometry against the actual source
    /// dimensions is checked once the source is decoded.
    pub fn validate(&self, limits: &Limits) -> Result<Operation> {
        let named = [
            self.resize.is_some(),
            self.crop.is_some(),
            self.rotate_flip.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if named > 1 {
            return Err(TransformError::invalid(
                "only one of resize, crop or rotateFlip may be given",
            ));
        }

        if let Some(resize) = self.resize {
            if resize.width.is_none() && resize.height.is_none() {
                return Err(TransformError::invalid("resize needs a width or a height"));
            }
            for (name, side) in [("width", resize.width), ("height", resize.height)] {
                match side {
                    Some(0) => {
                        return Err(TransformError::invalid(format!("{} must be positive", name)))
                    }
                    Some(v) if v > limits.max_dimension => {
                        return Err(TransformError::invalid(format!(
                            "{} {} exceeds the maximum of {}",
                            name, v, limits.max_dimension
                        )))
                    }
                    _ => {}
                }
            }
            return Ok(Operation::Resize(resize));
        }

        if let Some(crop) = self.crop {
            if !crop.rotation_deg.is_finite() {
                return Err(TransformError::invalid("crop rotation must be finite"));
            }
            if crop.rect().is_empty() {
                return Err(TransformError::EmptyCrop);
            }
            return Ok(Operation::Crop(crop));
        }

        if let Some(rotate) = self.rotate_flip {
            if !rotate.rotation_deg.is_finite() {
                return Err(TransformError::invalid("rotation must be finite"));
            }
            return Ok(Operation::RotateFlip(rotate));
        }

        Ok(Operation::Passthrough)
    }
}

/// Incremental construction of a [`TransformRequest`].
///
/// Setting more than one operation is allowed here and rejected by
/// [`TransformRequest::validate`].
#[derive(Debug, Clone, Default)]
pub struct TransformRequestBuilder {
    request: TransformRequest,
}

impl TransformRequestBuilder {
    pub fn resize(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.request.resize = Some(ResizeParams { width, height });
        self
    }

    pub fn crop(mut self, rect: CropRect, rotation_deg: f64) -> Self {
        self.request.crop = Some(CropParams {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            rotation_deg,
        });
        self
    }

    pub fn rotate_flip(mut self, rotation_deg: f64, flip_h: bool, flip_v: bool) -> Self {
        self.request.rotate_flip = Some(RotateFlipParams {
            rotation_deg,
            flip_h,
            flip_v,
        });
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.request.output.format = format;
        self
    }

    /// Quality is clamped into `1..=100`.
    pub fn quality(mut self, quality: i64) -> Self {
        self.request.output.quality = clamp_quality(quality);
        self
    }

    pub fn build(self) -> TransformRequest {
        self.request
    }
}
