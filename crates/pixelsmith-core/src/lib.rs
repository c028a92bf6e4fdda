//! Pixelsmith Core - Image transformation pipeline
//!
//! This crate turns a (source image, transform parameters) pair into a
//! correctly shaped, correctly encoded output image: contain-fit resizing,
//! rotation with mirroring, crop extraction under zoom and rotation, and
//! quality-controlled re-encoding to JPEG, PNG, WebP or AVIF.
//!
//! The pieces, leaves first:
//!
//! - [`geometry`]: pure math for fits, rotated bounds and crop rectangles
//! - [`compose`]: pixel operations driven by that geometry
//! - [`encode`]: raster to container bytes
//! - [`decode`]: container bytes to an upright raster
//! - [`pipeline`]: validation and sequencing of one request
//! - [`background`]: lifecycle around an external background remover
//! - [`session`]: interactive edit state and named exports

pub mod background;
pub mod compose;
pub mod decode;
pub mod encode;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod raster;
pub mod session;

pub use background::{
    BackgroundRemovalSession, BackgroundRemover, Progress, ProgressReporter, RemovalOutcome,
};
pub use decode::{decode_source, SourceImage};
pub use encode::{encode, OutputFormat};
pub use error::{ErrorKind, Result, TransformError};
pub use geometry::{
    crop_rectangle, resize_fit, rotated_bounding_box, CropRect, CropState, FitGeometry,
};
pub use pipeline::{Limits, OutputImage, TransformPipeline, TransformRequest};
pub use raster::{PixelLayout, Raster};
pub use session::{EditSession, ExportOperation, ExportedFile};
