//! Transform orchestrator.
//!
//! Runs one request through the stages
//! `Received -> Validated -> GeometryComputed -> Composited -> Encoded -> Done`,
//! failing fast into `Failed(kind)` on the first error. All validation that
//! does not need pixels happens before the source is decoded.
//!
//! # Example
//!
//! ```ignore
//! use pixelsmith_core::pipeline::{Limits, TransformPipeline, TransformRequest};
//!
//! let pipeline = TransformPipeline::new(Limits::default());
//! let request = TransformRequest::builder().resize(Some(500), None).build();
//! let output = pipeline.process(Some(&bytes), &request)?;
//! ```

mod request;
mod stage;

pub use request::{
    clamp_quality, CropParams, Operation, OutputSpec, ResizeParams, RotateFlipParams,
    TransformRequest, TransformRequestBuilder, DEFAULT_QUALITY,
};
pub use stage::{Stage, StageTracker};

use image::{Rgb, Rgba};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compose::{crop_extract, flatten, resize_draw, rotate_flip};
use crate::decode::{decode_source, SourceImage};
use crate::encode::{encode, OutputFormat};
use crate::error::{Result, TransformError};
use crate::geometry::{quarter_turns, resize_fit, rotated_bounding_box, CropRect, FitGeometry};
use crate::raster::Raster;

/// Default upload limit: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default largest accepted target dimension.
pub const DEFAULT_MAX_DIMENSION: u32 = 10_000;

/// Request limits enforced before any pixel work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_upload_bytes: usize,
    pub max_dimension: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Numeric drawing parameters derived from a request and the source size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// Pixels pass through untouched.
    Identity,
    /// Contain-fit resize.
    Fit(FitGeometry),
    /// Extract `rect`, taken from the source rotated by `rotation_deg`.
    Crop { rect: CropRect, rotation_deg: f64 },
    /// Rotate about the center onto a bounding-box canvas.
    RotateFlip {
        canvas_width: u32,
        canvas_height: u32,
        rotation_rad: f64,
        flip_h: bool,
        flip_v: bool,
    },
}

impl Geometry {
    /// Derive geometry for `operation` against a `width` x `height` source.
    ///
    /// # Errors
    ///
    /// Besides the per-operation errors, a resize whose canvas (including a
    /// side derived from the source aspect ratio) exceeds
    /// `limits.max_dimension` is `InvalidParameters`.
    pub fn compute(
        width: u32,
        height: u32,
        operation: &Operation,
        limits: &Limits,
    ) -> Result<Geometry> {
        match operation {
            Operation::Passthrough => Ok(Geometry::Identity),
            Operation::Resize(params) => {
                let fit = resize_fit(width, height, params.width, params.height)?;
                if fit.canvas_width > limits.max_dimension
                    || fit.canvas_height > limits.max_dimension
                {
                    return Err(TransformError::invalid(format!(
                        "resizing {}x{} gives a {}x{} image, above the maximum dimension {}",
                        width, height, fit.canvas_width, fit.canvas_height, limits.max_dimension
                    )));
                }
                if fit.is_identity(width, height) {
                    Ok(Geometry::Identity)
                } else {
                    Ok(Geometry::Fit(fit))
                }
            }
            Operation::Crop(params) => {
                let rect = params.rect();
                if rect.is_empty() {
                    return Err(TransformError::EmptyCrop);
                }
                let (frame_w, frame_h) = rotated_bounding_box(width, height, params.rotation_deg);
                if !rect.fits_within(frame_w, frame_h) {
                    return Err(TransformError::invalid(format!(
                        "crop {}x{}+{}+{} exceeds the {}x{} image",
                        rect.width, rect.height, rect.x, rect.y, frame_w, frame_h
                    )));
                }
                Ok(Geometry::Crop {
                    rect,
                    rotation_deg: params.rotation_deg,
                })
            }
            Operation::RotateFlip(params) => {
                if quarter_turns(params.rotation_deg) == Some(0) && !params.flip_h && !params.flip_v
                {
                    return Ok(Geometry::Identity);
                }
                let (canvas_width, canvas_height) =
                    rotated_bounding_box(width, height, params.rotation_deg);
                Ok(Geometry::RotateFlip {
                    canvas_width,
                    canvas_height,
                    rotation_rad: params.rotation_deg.to_radians(),
                    flip_h: params.flip_h,
                    flip_v: params.flip_v,
                })
            }
        }
    }

    /// Output dimensions for this geometry on a `width` x `height` source.
    pub fn output_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match self {
            Geometry::Identity => (width, height),
            Geometry::Fit(fit) => (fit.canvas_width, fit.canvas_height),
            Geometry::Crop { rect, .. } => (rect.width, rect.height),
            Geometry::RotateFlip {
                canvas_width,
                canvas_height,
                ..
            } => (*canvas_width, *canvas_height),
        }
    }
}

/// Draw `source` according to `geometry`. Never mutates the source.
pub fn composite(source: &Raster, geometry: &Geometry, padding: Rgba<u8>) -> Result<Raster> {
    match geometry {
        Geometry::Identity => Ok(source.clone()),
        Geometry::Fit(fit) => resize_draw(source, fit, padding),
        Geometry::Crop { rect, rotation_deg } => {
            if quarter_turns(*rotation_deg) == Some(0) {
                crop_extract(source, rect)
            } else {
                let rotated = rotate_flip(source, *rotation_deg, false, false, padding);
                crop_extract(&rotated, rect)
            }
        }
        Geometry::RotateFlip {
            rotation_rad,
            flip_h,
            flip_v,
            ..
        } => Ok(rotate_flip(
            source,
            rotation_rad.to_degrees(),
            *flip_h,
            *flip_v,
            padding,
        )),
    }
}

/// An encoded result.
#[derive(Debug, Clone)]
pub struct OutputImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl OutputImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Stateless request processor; one instance can serve any number of requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformPipeline {
    limits: Limits,
}

impl TransformPipeline {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Process an uploaded payload.
    ///
    /// # Errors
    ///
    /// - `InvalidParameters` if `payload` is missing or empty, or the request is malformed
    /// - `PayloadTooLarge` if `payload` exceeds the upload limit
    /// - `DecodeFailed`, `EmptyCrop`, `EncodeFailed` from the later stages
    pub fn process(&self, payload: Option<&[u8]>, request: &TransformRequest) -> Result<OutputImage> {
        let mut tracker = StageTracker::new();
        let result = self.run(&mut tracker, request, |limits| {
            let bytes = check_payload(payload, limits)?;
            Ok(Input::Bytes(bytes))
        });
        finish(&mut tracker, result)
    }

    /// Process an already decoded source.
    pub fn process_source(
        &self,
        source: &SourceImage,
        request: &TransformRequest,
    ) -> Result<OutputImage> {
        let mut tracker = StageTracker::new();
        let result = self.run(&mut tracker, request, |_| Ok(Input::Decoded(source)));
        finish(&mut tracker, result)
    }

    fn run<'a>(
        &self,
        tracker: &mut StageTracker,
        request: &TransformRequest,
        input: impl FnOnce(&Limits) -> Result<Input<'a>>,
    ) -> Result<OutputImage> {
        let input = input(&self.limits)?;
        let operation = request.validate(&self.limits)?;
        tracker.advance(Stage::Validated)?;

        let decoded;
        let source = match input {
            Input::Bytes(bytes) => {
                decoded = decode_source(bytes)?;
                &decoded
            }
            Input::Decoded(source) => source,
        };

        let geometry = Geometry::compute(source.width(), source.height(), &operation, &self.limits)?;
        debug!(operation = operation.name(), geometry = ?geometry, "geometry computed");
        tracker.advance(Stage::GeometryComputed)?;

        let format = request.output.format;
        let mut raster = composite(&source.raster, &geometry, format.padding_color())?;
        if !format.supports_alpha() && raster.has_alpha() {
            raster = flatten(&raster, Rgb([0, 0, 0]));
        }
        tracker.advance(Stage::Composited)?;

        let bytes = encode(&raster, format, request.output.quality)?;
        tracker.advance(Stage::Encoded)?;

        info!(
            operation = operation.name(),
            format = %format,
            quality = request.output.quality,
            width = raster.width,
            height = raster.height,
            bytes = bytes.len(),
            "transform complete"
        );

        Ok(OutputImage {
            bytes,
            format,
            width: raster.width,
            height: raster.height,
        })
    }
}

enum Input<'a> {
    Bytes(&'a [u8]),
    Decoded(&'a SourceImage),
}

fn check_payload<'a>(payload: Option<&'a [u8]>, limits: &Limits) -> Result<&'a [u8]> {
    let bytes = payload.ok_or_else(|| TransformError::invalid("No image file provided"))?;
    if bytes.is_empty() {
        return Err(TransformError::invalid("Image file is empty"));
    }
    if bytes.len() > limits.max_upload_bytes {
        return Err(TransformError::PayloadTooLarge {
            size: bytes.len(),
            limit: limits.max_upload_bytes,
        });
    }
    Ok(bytes)
}

fn finish(tracker: &mut StageTracker, result: Result<OutputImage>) -> Result<OutputImage> {
    match result {
        Ok(output) => {
            tracker.advance(Stage::Done)?;
            Ok(output)
        }
        Err(err) => {
            tracker.fail(err.kind());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelLayout;
    use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn decode_output(output: &OutputImage) -> DynamicImage {
        image::load_from_memory(&output.bytes).unwrap()
    }

    #[test]
    fn test_resize_width_only() {
        let pipeline = TransformPipeline::default();
        let request = TransformRequest::builder()
            .resize(Some(500), None)
            .format(OutputFormat::Png)
            .build();

        let output = pipeline.process(Some(&png_bytes(1000, 500)), &request).unwrap();
        assert_eq!((output.width, output.height), (500, 250));
        assert_eq!(output.mime_type(), "image/png");

        let decoded = decode_output(&output);
        assert_eq!((decoded.width(), decoded.height()), (500, 250));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_resize_box_pads_transparent_png() {
        let pipeline = TransformPipeline::default();
        let request = TransformRequest::builder()
            .resize(Some(400), Some(400))
            .format(OutputFormat::Png)
            .build();

        let output = pipeline.process(Some(&png_bytes(1000, 500)), &request).unwrap();
        let decoded = decode_output(&output).to_rgba8();

        assert_eq!(decoded.dimensions(), (400, 400));
        assert_eq!(decoded.get_pixel(200, 50).0[3], 0);
        assert_eq!(decoded.get_pixel(200, 200).0[3], 255);
    }

    #[test]
    fn test_resize_box_pads_black_jpeg() {
        let pipeline = TransformPipeline::default();
        let request = TransformRequest::builder()
            .resize(Some(400), Some(400))
            .format(OutputFormat::Jpeg)
            .build();

        let output = pipeline.process(Some(&png_bytes(1000, 500)), &request).unwrap();
        assert_eq!(output.mime_type(), "image/jpeg");

        let decoded = decode_output(&output).to_rgb8();
        let corner = decoded.get_pixel(5, 5).0;
        assert!(corner.iter().all(|&c| c < 16), "corner {:?}", corner);
    }

    #[test]
    fn test_rotate_45_expands_canvas() {
        let pipeline = TransformPipeline::default();
        let request = TransformRequest::builder()
            .rotate_flip(45.0, false, false)
            .format(OutputFormat::Png)
            .build();

        let output = pipeline.process(Some(&png_bytes(800, 600)), &request).unwrap();
        assert_eq!((output.width, output.height), (990, 990));
    }

    #[test]
    fn test_crop_extracts_exact_pixels() {
        let pipeline = TransformPipeline::default();
        let request = TransformRequest::builder()
            .crop(CropRect::new(10, 20, 30, 40), 0.0)
            .format(OutputFormat::Png)
            .build();

        let output = pipeline.process(Some(&png_bytes(100, 100)), &request).unwrap();
        let decoded = decode_output(&output).to_rgb8();

        assert_eq!(decoded.dimensions(), (30, 40));
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 128]);
        assert_eq!(decoded.get_pixel(29, 39).0, [39, 59, 128]);
    }

    #[test]
    fn test_crop_outside_source() {
        let pipeline = TransformPipeline::default();
        let request = TransformRequest::builder()
            .crop(CropRect::new(90, 90, 20, 20), 0.0)
            .build();

        let result = pipeline.process(Some(&png_bytes(100, 100)), &request);
        assert!(matches!(result, Err(TransformError::InvalidParameters(_))));
    }

    #[test]
    fn test_passthrough_converts_format() {
        let pipeline = TransformPipeline::default();
        let request = TransformRequest::builder().format(OutputFormat::WebP).build();

        let output = pipeline.process(Some(&png_bytes(20, 10)), &request).unwrap();
        assert_eq!(&output.bytes[8..12], b"WEBP");
        assert_eq!((output.width, output.height), (20, 10));
    }

    #[test]
    fn test_transparent_source_flattened_for_jpeg() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 0]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();

        let pipeline = TransformPipeline::default();
        let request = TransformRequest::default();
        let output = pipeline.process(Some(bytes.get_ref()), &request).unwrap();

        let decoded = decode_output(&output).to_rgb8();
        assert!(decoded.get_pixel(4, 4).0.iter().all(|&c| c < 16));
    }

    #[test]
    fn test_missing_payload() {
        let pipeline = TransformPipeline::default();
        let result = pipeline.process(None, &TransformRequest::default());
        assert!(matches!(result, Err(TransformError::InvalidParameters(ref m)) if m == "No image file provided"));
    }

    #[test]
    fn test_empty_payload() {
        let pipeline = TransformPipeline::default();
        let result = pipeline.process(Some(&[]), &TransformRequest::default());
        assert!(matches!(result, Err(TransformError::InvalidParameters(_))));
    }

    #[test]
    fn test_payload_too_large() {
        let pipeline = TransformPipeline::new(Limits {
            max_upload_bytes: 16,
            ..Limits::default()
        });
        let result = pipeline.process(Some(&[0u8; 17]), &TransformRequest::default());
        assert!(matches!(
            result,
            Err(TransformError::PayloadTooLarge { size: 17, limit: 16 })
        ));
    }

    #[test]
    fn test_corrupt_payload() {
        let pipeline = TransformPipeline::default();
        let result = pipeline.process(Some(b"GIF89a but not really"), &TransformRequest::default());
        assert!(matches!(result, Err(TransformError::DecodeFailed(_))));
    }

    #[test]
    fn test_validation_precedes_decode() {
        // Garbage bytes with an invalid request report the request problem
        let pipeline = TransformPipeline::default();
        let request = TransformRequest::builder().resize(Some(0), None).build();
        let result = pipeline.process(Some(b"garbage"), &request);
        assert!(matches!(result, Err(TransformError::InvalidParameters(_))));
    }

    #[test]
    fn test_derived_side_respects_max_dimension() {
        // A thin source stretched to the width limit would need a huge height
        let op = Operation::Resize(ResizeParams {
            width: Some(10_000),
            height: None,
        });
        let result = Geometry::compute(2, 4000, &op, &Limits::default());
        assert!(matches!(result, Err(TransformError::InvalidParameters(_))));

        let op = Operation::Resize(ResizeParams {
            width: None,
            height: Some(5000),
        });
        let limits = Limits {
            max_dimension: 5000,
            ..Limits::default()
        };
        assert!(Geometry::compute(4000, 2, &op, &limits).is_err());

        // At the limit is fine
        let op = Operation::Resize(ResizeParams {
            width: Some(5000),
            height: None,
        });
        let geometry = Geometry::compute(2, 2, &op, &limits).unwrap();
        assert_eq!(geometry.output_dimensions(2, 2), (5000, 5000));
    }

    #[test]
    fn test_oversized_derived_side_rejected_before_compositing() {
        let source = SourceImage {
            raster: Raster::new(2, 400, PixelLayout::Rgb8, vec![7; 2 * 400 * 3]),
            format: ImageFormat::Png,
            bit_depth: 8,
            orientation: Default::default(),
        };
        let request = TransformRequest::builder().resize(Some(1000), None).build();
        let pipeline = TransformPipeline::new(Limits {
            max_dimension: 1000,
            ..Limits::default()
        });

        let result = pipeline.process_source(&source, &request);
        assert!(matches!(result, Err(TransformError::InvalidParameters(_))));
    }

    #[test]
    fn test_geometry_identity_cases() {
        let op = Operation::Resize(ResizeParams {
            width: Some(100),
            height: None,
        });
        assert_eq!(Geometry::compute(100, 50, &op, &Limits::default()).unwrap(), Geometry::Identity);

        let op = Operation::RotateFlip(RotateFlipParams {
            rotation_deg: 360.0,
            flip_h: false,
            flip_v: false,
        });
        assert_eq!(Geometry::compute(100, 50, &op, &Limits::default()).unwrap(), Geometry::Identity);
    }

    #[test]
    fn test_geometry_crop_uses_rotated_frame() {
        let op = Operation::Crop(CropParams {
            x: 0,
            y: 0,
            width: 50,
            height: 100,
            rotation_deg: 90.0,
        });
        let geometry = Geometry::compute(100, 50, &op, &Limits::default()).unwrap();
        assert_eq!(geometry.output_dimensions(100, 50), (50, 100));
    }

    #[test]
    fn test_process_source_flip() {
        let source = SourceImage {
            raster: Raster::new(2, 1, PixelLayout::Rgb8, vec![1, 1, 1, 2, 2, 2]),
            format: ImageFormat::Png,
            bit_depth: 8,
            orientation: Default::default(),
        };
        let request = TransformRequest::builder()
            .rotate_flip(0.0, true, false)
            .format(OutputFormat::Png)
            .build();

        let output = TransformPipeline::default()
            .process_source(&source, &request)
            .unwrap();
        let decoded = decode_output(&output).to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [2, 2, 2]);
        assert_eq!(decoded.get_pixel(1, 0).0, [1, 1, 1]);
    }
}
