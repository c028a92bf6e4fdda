//! Format encoder.
//!
//! This module provides functionality for:
//! - Parsing and describing output formats (JPEG, PNG, WebP, AVIF)
//! - Encoding a [`Raster`](crate::Raster) with a clamped 1-100 quality
//!
//! Encoding is stateless and side-effect free. Alpha handling is the
//! compositor's job: JPEG refuses RGBA input instead of silently dropping it.
//!
//! # Examples
//!
//! ```ignore
//! use pixelsmith_core::encode::{encode, OutputFormat};
//!
//! let format: OutputFormat = "jpg".parse()?;
//! let bytes = encode(&raster, format, 85)?;
//! assert_eq!(format.mime_type(), "image/jpeg");
//! ```

mod codec;
mod format;

pub use codec::{encode, png_compression, EncodeError, AVIF_SPEED};
pub use format::OutputFormat;
