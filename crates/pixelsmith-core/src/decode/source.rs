//! Source decoding with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use super::{DecodeError, Orientation, SourceImage};
use crate::raster::Raster;

/// Decode uploaded bytes into an upright [`SourceImage`].
///
/// # Arguments
///
/// * `bytes` - Raw file bytes in any container the `image` crate reads
///
/// # Errors
///
/// Returns `DecodeError::Empty` for a zero-length payload.
/// Returns `DecodeError::InvalidFormat` if the magic bytes match no known container.
/// Returns `DecodeError::CorruptedFile` if the container is recognized but broken.
pub fn decode_source(bytes: &[u8]) -> Result<SourceImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let format = image::guess_format(bytes).map_err(|_| DecodeError::InvalidFormat)?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let color = img.color();
    let bit_depth = (color.bits_per_pixel() / color.channel_count() as u16) as u8;

    let orientation = extract_orientation(bytes);
    let img = apply_orientation(img, orientation);

    debug!(
        format = ?format,
        width = img.width(),
        height = img.height(),
        bit_depth,
        orientation = ?orientation,
        "decoded source"
    );

    Ok(SourceImage {
        raster: Raster::from_dynamic(img),
        format,
        bit_depth,
        orientation,
    })
}

/// Extract EXIF orientation from file bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
pub fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);

    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

/// Apply EXIF orientation transformation to an image.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
