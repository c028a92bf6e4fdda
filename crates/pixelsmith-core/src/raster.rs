//! Decoded pixel buffers.
//!
//! A [`Raster`] is the unit of work for the compositor and the encoder. It is
//! always 8 bits per channel, either RGB or RGBA, in row-major order.

use image::{DynamicImage, Rgba, RgbImage, RgbaImage};

/// Channel layout of a [`Raster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// Three bytes per pixel, no alpha.
    Rgb8,
    /// Four bytes per pixel, straight (non-premultiplied) alpha.
    Rgba8,
}

impl PixelLayout {
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }

    #[inline]
    pub fn has_alpha(self) -> bool {
        matches!(self, PixelLayout::Rgba8)
    }
}

/// A decoded image with 8-bit RGB or RGBA pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Channel layout of `pixels`.
    pub layout: PixelLayout,
    /// Pixel data in row-major order.
    /// Length should be width * height * layout.channels().
    pub pixels: Vec<u8>,
}

impl Raster {
    /// Create a new Raster with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, layout: PixelLayout, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * layout.channels(),
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            layout,
            pixels,
        }
    }

    /// Create an RGBA raster where every pixel is `color`.
    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self::from_rgba_image(RgbaImage::from_pixel(width, height, color))
    }

    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, PixelLayout::Rgb8, img.into_raw())
    }

    pub fn from_rgba_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, PixelLayout::Rgba8, img.into_raw())
    }

    /// Normalize any decoded image to 8-bit RGB, or RGBA when it carries alpha.
    pub fn from_dynamic(img: DynamicImage) -> Self {
        if img.color().has_alpha() {
            Self::from_rgba_image(img.into_rgba8())
        } else {
            Self::from_rgb_image(img.into_rgb8())
        }
    }

    /// Convert to a `DynamicImage` for use with the `image` crate.
    ///
    /// Returns `None` if the pixel buffer does not match the dimensions.
    pub fn to_dynamic(&self) -> Option<DynamicImage> {
        match self.layout {
            PixelLayout::Rgb8 => RgbImage::from_raw(self.width, self.height, self.pixels.clone())
                .map(DynamicImage::ImageRgb8),
            PixelLayout::Rgba8 => {
                RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
                    .map(DynamicImage::ImageRgba8)
            }
        }
    }

    /// Convert into an RGBA raster, adding an opaque alpha channel if needed.
    pub fn into_rgba(self) -> Self {
        match self.layout {
            PixelLayout::Rgba8 => self,
            PixelLayout::Rgb8 => {
                let mut pixels = Vec::with_capacity(self.pixel_count() * 4);
                for px in self.pixels.chunks_exact(3) {
                    pixels.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
                Self::new(self.width, self.height, PixelLayout::Rgba8, pixels)
            }
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.layout.has_alpha()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// True when the buffer length matches the dimensions and layout.
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.pixel_count() * self.channels()
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// Read a pixel as RGBA; RGB pixels are reported fully opaque.
    ///
    /// Panics if the coordinates are out of bounds.
    #[inline]
    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        let channels = self.channels();
        let idx = (y as usize * self.width as usize + x as usize) * channels;
        let px = &self.pixels[idx..idx + channels];
        match self.layout {
            PixelLayout::Rgb8 => [px[0], px[1], px[2], 255],
            PixelLayout::Rgba8 => [px[0], px[1], px[2], px[3]],
        }
    }
}
