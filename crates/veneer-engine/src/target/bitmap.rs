use anyhow::Result;

use crate::driver::TextureId;

/// Texel formats the driver accepts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single-channel coverage (glyph atlases, masks).
    A8Unorm,
    /// Premultiplied BGRA, stored as-is.
    #[default]
    Bgra8Unorm,
    /// Premultiplied BGRA with sRGB-encoded color channels.
    Bgra8UnormSrgb,
}

impl PixelFormat {
    #[inline]
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::A8Unorm => 1,
            PixelFormat::Bgra8Unorm | PixelFormat::Bgra8UnormSrgb => 4,
        }
    }
}

/// CPU-side pixel data for texture uploads.
///
/// Rows are top-first; `row_bytes` may exceed `width * bytes_per_pixel`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub row_bytes: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Zero-filled, tightly packed bitmap.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let row_bytes = width * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            row_bytes,
            pixels: vec![0; (row_bytes * height) as usize],
        }
    }

    /// Wraps existing pixels, checking that they cover every row.
    pub fn from_pixels(
        width: u32,
        height: u32,
        format: PixelFormat,
        row_bytes: u32,
        pixels: Vec<u8>,
    ) -> Result<Self> {
        let min_row = width * format.bytes_per_pixel();
        anyhow::ensure!(
            row_bytes >= min_row,
            "row_bytes {row_bytes} is shorter than a {width}px {format:?} row"
        );
        let needed = row_bytes as usize * height.saturating_sub(1) as usize + min_row as usize;
        anyhow::ensure!(
            height == 0 || pixels.len() >= needed,
            "bitmap has {} bytes, {needed} needed for {width}x{height}",
            pixels.len()
        );
        Ok(Self { width, height, format, row_bytes, pixels })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Row stride in pixels (GL `UNPACK_ROW_LENGTH`).
    #[inline]
    pub fn row_pixels(&self) -> u32 {
        self.row_bytes / self.format.bytes_per_pixel()
    }
}

/// Description of a color-only render buffer backed by a texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderBufferDesc {
    pub texture_id: TextureId,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_tightly_packed() {
        let b = Bitmap::new(3, 2, PixelFormat::Bgra8Unorm);
        assert_eq!(b.row_bytes, 12);
        assert_eq!(b.pixels.len(), 24);
        assert_eq!(b.row_pixels(), 3);
    }

    #[test]
    fn from_pixels_rejects_short_buffers() {
        assert!(Bitmap::from_pixels(4, 4, PixelFormat::A8Unorm, 4, vec![0; 15]).is_err());
        assert!(Bitmap::from_pixels(4, 4, PixelFormat::A8Unorm, 3, vec![0; 64]).is_err());
        // last row needs no trailing stride padding
        assert!(Bitmap::from_pixels(4, 2, PixelFormat::A8Unorm, 8, vec![0; 12]).is_ok());
    }
}
