//! Image codec adapter.
//!
//! Turns compressed image bytes (PNG, JPEG) into [`RasterImage`]s and back.
//! Everything else in the crate works on decoded RGBA rasters.

use crate::error::{Error, Result};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// A decoded image: row-major RGBA samples, 4 bytes per pixel.
///
/// The pixel buffer always holds exactly `width * height * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    inner: RgbaImage,
}

impl RasterImage {
    /// Builds a raster from raw RGBA samples.
    ///
    /// Returns `None` if `pixels.len() != width * height * 4`.
    #[must_use]
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, pixels).map(|inner| Self { inner })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    /// The RGBA sample buffer.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.inner.as_raw()
    }

    /// Returns the top-left `width x height` region.
    ///
    /// Both extents are clamped to the raster's own size.
    #[must_use]
    pub fn crop_top_left(&self, width: u32, height: u32) -> Self {
        let width = width.min(self.width());
        let height = height.min(self.height());
        if (width, height) == self.dimensions() {
            return self.clone();
        }
        let inner = image::imageops::crop_imm(&self.inner, 0, 0, width, height).to_image();
        Self { inner }
    }

    pub(crate) fn as_rgba(&self) -> &RgbaImage {
        &self.inner
    }
}

impl From<RgbaImage> for RasterImage {
    fn from(inner: RgbaImage) -> Self {
        Self { inner }
    }
}

/// Decodes a compressed image buffer into an RGBA raster.
///
/// The format is sniffed from the buffer contents.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the bytes are not a supported image.
pub fn decode(bytes: &[u8]) -> Result<RasterImage> {
    let decoded = image::load_from_memory(bytes).map_err(|source| Error::Decode { source })?;
    Ok(RasterImage {
        inner: decoded.to_rgba8(),
    })
}

/// Encodes a raster as PNG.
///
/// # Errors
///
/// Returns [`Error::Encode`] if encoding fails.
pub fn encode_png(raster: &RasterImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    raster
        .inner
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|source| Error::Encode { source })?;
    Ok(buf)
}
