//! Source decoding.
//!
//! Turns uploaded bytes into an upright, 8-bit [`SourceImage`]:
//! - Container detection from magic bytes
//! - Decoding via the `image` crate (JPEG, PNG, WebP, GIF, BMP, TIFF)
//! - EXIF orientation correction via `kamadak-exif`

mod source;
mod types;

pub use source::{decode_source, extract_orientation};
pub use types::{DecodeError, Orientation, SourceImage};
