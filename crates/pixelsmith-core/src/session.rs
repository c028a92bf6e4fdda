//! Interactive edit session and client-side export.
//!
//! An [`EditSession`] holds one decoded image plus the editor state
//! (rotation, mirroring, crop viewport) and turns that state into previews
//! and named, encoded files. Every preview is recomputed from the source, so
//! a preview always reflects the current state.

use tracing::debug;

use crate::compose::crop_rotated;
use crate::decode::{decode_source, SourceImage};
use crate::encode::{encode, OutputFormat};
use crate::error::{Result, TransformError};
use crate::geometry::{crop_viewport, normalize_degrees, CropRect, CropState};
use crate::pipeline::{
    composite, Geometry, Operation, RotateFlipParams, TransformPipeline, TransformRequest,
};
use crate::raster::Raster;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 3.0;

/// Crop aspect selected when a session starts.
pub const DEFAULT_CROP_ASPECT: f64 = 16.0 / 9.0;

/// Quality for exports that keep the original lossy format.
pub const EXPORT_QUALITY: u8 = 92;

/// The user-facing operation an exported file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportOperation {
    Resize,
    Convert,
    Compress,
    RemoveBackground,
    Crop,
    RotateFlip,
}

impl ExportOperation {
    pub fn prefix(self) -> &'static str {
        match self {
            ExportOperation::Resize => "resized-",
            ExportOperation::Convert => "converted-",
            ExportOperation::Compress => "compressed-",
            ExportOperation::RemoveBackground => "nobg-",
            ExportOperation::Crop => "cropped-",
            ExportOperation::RotateFlip => "edited-",
        }
    }

    /// Download name for a file produced from `original_name`.
    ///
    /// Conversions and background removal replace everything after the
    /// first `.` with the new extension; background removal is always PNG.
    /// The other operations keep the name, except that an extension naming a
    /// different container (a GIF source re-encoded as PNG, say) is swapped
    /// for `format`'s.
    pub fn export_filename(self, original_name: &str, format: OutputFormat) -> String {
        match self {
            ExportOperation::Convert => {
                format!("{}{}.{}", self.prefix(), stem(original_name), format.extension())
            }
            ExportOperation::RemoveBackground => {
                format!("{}{}.png", self.prefix(), stem(original_name))
            }
            _ => format!("{}{}", self.prefix(), matching_extension(original_name, format)),
        }
    }
}

fn matching_extension(name: &str, format: OutputFormat) -> String {
    match name.rsplit_once('.') {
        Some((base, ext)) if ext.parse::<OutputFormat>().ok() != Some(format) => {
            format!("{}.{}", base, format.extension())
        }
        _ => name.to_string(),
    }
}

fn stem(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// An encoded file ready for download.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Editor state for one image.
#[derive(Debug, Clone)]
pub struct EditSession {
    original_name: String,
    source: SourceImage,
    pipeline: TransformPipeline,
    rotation_deg: f64,
    flip_h: bool,
    flip_v: bool,
    crop: CropState,
    aspect: Option<f64>,
}

impl EditSession {
    /// Decode `bytes` and start a session with neutral edit state.
    pub fn new(original_name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let source = decode_source(bytes)?;
        Ok(Self::from_source(original_name, source))
    }

    pub fn from_source(original_name: impl Into<String>, source: SourceImage) -> Self {
        Self {
            original_name: original_name.into(),
            source,
            pipeline: TransformPipeline::default(),
            rotation_deg: 0.0,
            flip_h: false,
            flip_v: false,
            crop: CropState::default(),
            aspect: Some(DEFAULT_CROP_ASPECT),
        }
    }

    pub fn with_pipeline(mut self, pipeline: TransformPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    /// Format exports are written in when they keep the original format.
    ///
    /// Containers that cannot be re-encoded (GIF, BMP, TIFF) export as PNG.
    pub fn original_format(&self) -> OutputFormat {
        self.source.output_format().unwrap_or(OutputFormat::Png)
    }

    // Rotate/flip state

    pub fn rotation(&self) -> f64 {
        self.rotation_deg
    }

    pub fn set_rotation(&mut self, degrees: f64) -> Result<()> {
        if !degrees.is_finite() {
            return Err(TransformError::invalid("rotation must be finite"));
        }
        self.rotation_deg = normalize_degrees(degrees);
        Ok(())
    }

    /// Rotate a quarter turn counter-clockwise.
    pub fn rotate_left(&mut self) {
        self.rotation_deg = normalize_degrees(self.rotation_deg - 90.0);
    }

    /// Rotate a quarter turn clockwise.
    pub fn rotate_right(&mut self) {
        self.rotation_deg = normalize_degrees(self.rotation_deg + 90.0);
    }

    pub fn flips(&self) -> (bool, bool) {
        (self.flip_h, self.flip_v)
    }

    pub fn toggle_flip_h(&mut self) {
        self.flip_h = !self.flip_h;
    }

    pub fn toggle_flip_v(&mut self) {
        self.flip_v = !self.flip_v;
    }

    // Crop state

    pub fn crop_state(&self) -> &CropState {
        &self.crop
    }

    /// Set the crop zoom, clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn set_crop_zoom(&mut self, zoom: f64) -> Result<()> {
        if !zoom.is_finite() {
            return Err(TransformError::invalid("zoom must be finite"));
        }
        self.crop.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        Ok(())
    }

    pub fn set_crop_pan(&mut self, pan_x: f64, pan_y: f64) -> Result<()> {
        if !(pan_x.is_finite() && pan_y.is_finite()) {
            return Err(TransformError::invalid("pan must be finite"));
        }
        self.crop.pan_x = pan_x;
        self.crop.pan_y = pan_y;
        Ok(())
    }

    pub fn set_crop_rotation(&mut self, degrees: f64) -> Result<()> {
        if !degrees.is_finite() {
            return Err(TransformError::invalid("rotation must be finite"));
        }
        self.crop.rotation_deg = normalize_degrees(degrees);
        Ok(())
    }

    /// Select a crop aspect (width / height); `None` follows the source.
    pub fn set_aspect(&mut self, aspect: Option<f64>) -> Result<()> {
        if let Some(value) = aspect {
            if !(value.is_finite() && value > 0.0) {
                return Err(TransformError::invalid(format!(
                    "aspect must be a positive number, got {value}"
                )));
            }
        }
        self.aspect = aspect;
        Ok(())
    }

    /// Aspect actually used for the crop viewport.
    pub fn effective_aspect(&self) -> f64 {
        self.aspect
            .unwrap_or(self.source.width() as f64 / self.source.height() as f64)
    }

    /// Visible crop area in rotated-frame pixels.
    pub fn crop_rect(&self) -> Result<CropRect> {
        crop_viewport(
            self.source.width(),
            self.source.height(),
            &self.crop,
            self.effective_aspect(),
        )
    }

    // Previews

    /// Rotated and mirrored raster for the current state.
    pub fn preview(&self) -> Result<Raster> {
        let operation = Operation::RotateFlip(self.rotate_flip_params());
        let geometry = Geometry::compute(
            self.source.width(),
            self.source.height(),
            &operation,
            self.pipeline.limits(),
        )?;
        composite(
            &self.source.raster,
            &geometry,
            self.original_format().padding_color(),
        )
    }

    /// Cropped raster for the current crop state.
    pub fn crop_preview(&self) -> Result<Raster> {
        let rect = self.crop_rect()?;
        crop_rotated(
            &self.source.raster,
            &rect,
            self.crop.rotation_deg,
            self.original_format().padding_color(),
        )
    }

    // Exports

    /// Encode the rotate/flip result as `edited-<name>` in the original format.
    pub fn export_rotate_flip(&self) -> Result<ExportedFile> {
        let params = self.rotate_flip_params();
        let request = TransformRequest::builder()
            .rotate_flip(params.rotation_deg, params.flip_h, params.flip_v)
            .format(self.original_format())
            .quality(EXPORT_QUALITY as i64)
            .build();
        self.export(ExportOperation::RotateFlip, &request)
    }

    /// Encode the crop result as `cropped-<name>` in the original format.
    pub fn export_crop(&self) -> Result<ExportedFile> {
        let rect = self.crop_rect()?;
        let request = TransformRequest::builder()
            .crop(rect, self.crop.rotation_deg)
            .format(self.original_format())
            .quality(EXPORT_QUALITY as i64)
            .build();
        self.export(ExportOperation::Crop, &request)
    }

    /// Name and encode a background-removal result as `nobg-<stem>.png`.
    pub fn export_background_removed(&self, cutout: &Raster) -> Result<ExportedFile> {
        let format = OutputFormat::Png;
        let bytes = encode(cutout, format, EXPORT_QUALITY)?;
        Ok(ExportedFile {
            filename: ExportOperation::RemoveBackground.export_filename(&self.original_name, format),
            mime_type: format.mime_type(),
            bytes,
            width: cutout.width,
            height: cutout.height,
        })
    }

    /// Request resizing into the original format.
    pub fn resize_request(&self, width: Option<u32>, height: Option<u32>) -> TransformRequest {
        TransformRequest::builder()
            .resize(width, height)
            .format(self.original_format())
            .build()
    }

    /// Request recompression in the original format.
    pub fn compress_request(&self, quality: i64) -> TransformRequest {
        TransformRequest::builder()
            .format(self.original_format())
            .quality(quality)
            .build()
    }

    /// Request conversion to another format.
    pub fn convert_request(&self, format: OutputFormat) -> TransformRequest {
        TransformRequest::builder().format(format).build()
    }

    /// Run `request` against the session's source and name the result.
    pub fn export(
        &self,
        operation: ExportOperation,
        request: &TransformRequest,
    ) -> Result<ExportedFile> {
        let output = self.pipeline.process_source(&self.source, request)?;
        let filename = operation.export_filename(&self.original_name, output.format);
        debug!(%filename, bytes = output.bytes.len(), "export ready");

        Ok(ExportedFile {
            filename,
            mime_type: output.mime_type(),
            width: output.width,
            height: output.height,
            bytes: output.bytes,
        })
    }

    fn rotate_flip_params(&self) -> RotateFlipParams {
        RotateFlipParams {
            rotation_deg: self.rotation_deg,
            flip_h: self.flip_h,
            flip_v: self.flip_v,
        }
    }
}
