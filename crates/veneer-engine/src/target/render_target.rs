use crate::coords::{Rect, Vec2};
use crate::driver::{RenderBufferId, RenderTargetId, TextureId};

use super::PixelFormat;

/// Rounds `value` up to a multiple of `alignment` (treated as at least 1).
#[inline]
pub fn align_up(value: u32, alignment: u32) -> u32 {
    let alignment = alignment.max(1);
    value.div_ceil(alignment) * alignment
}

/// Texture size and UV rectangle for a logical viewport.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderTargetLayout {
    pub texture_width: u32,
    pub texture_height: u32,
    pub uv_coords: Rect,
}

impl RenderTargetLayout {
    /// Pads `width` x `height` to `alignment` and derives the UV rect that
    /// covers exactly the logical viewport.
    pub fn new(width: u32, height: u32, alignment: u32) -> Self {
        let texture_width = align_up(width, alignment);
        let texture_height = align_up(height, alignment);
        let uv = |logical: u32, physical: u32| {
            if physical == 0 { 0.0 } else { logical as f32 / physical as f32 }
        };
        Self {
            texture_width,
            texture_height,
            uv_coords: Rect::new(0.0, 0.0, uv(width, texture_width), uv(height, texture_height)),
        }
    }
}

/// Offscreen surface description handed back to the paint pipeline.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderTarget {
    pub id: RenderTargetId,
    /// Logical viewport size in device pixels.
    pub width: u32,
    pub height: u32,
    pub texture_id: TextureId,
    /// Allocated texture size (padded).
    pub texture_width: u32,
    pub texture_height: u32,
    pub texture_format: PixelFormat,
    pub render_buffer_id: RenderBufferId,
    /// Maps the logical viewport onto the padded texture.
    pub uv_coords: Rect,
}

impl RenderTarget {
    /// Target with null ids; returned when allocation fails.
    pub fn empty() -> Self {
        Self {
            id: RenderTargetId::default(),
            width: 0,
            height: 0,
            texture_id: TextureId::default(),
            texture_width: 0,
            texture_height: 0,
            texture_format: PixelFormat::Bgra8Unorm,
            render_buffer_id: RenderBufferId::default(),
            uv_coords: Rect::default(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Texture coordinate of logical viewport point `(x, y)`.
    pub fn uv_at(&self, x: f32, y: f32) -> Vec2 {
        if self.is_empty() {
            return Vec2::zero();
        }
        let uv = self.uv_coords;
        Vec2::new(
            uv.left + x / self.width as f32 * uv.width(),
            uv.top + y / self.height as f32 * uv.height(),
        )
    }

    /// Inverse of [`uv_at`](Self::uv_at): texture coordinate back to the
    /// logical point it samples.
    pub fn logical_at(&self, u: f32, v: f32) -> Vec2 {
        if self.is_empty() {
            return Vec2::zero();
        }
        let uv = self.uv_coords;
        Vec2::new(
            (u - uv.left) / uv.width() * self.width as f32,
            (v - uv.top) / uv.height() * self.height as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    fn target(width: u32, height: u32, alignment: u32) -> RenderTarget {
        let layout = RenderTargetLayout::new(width, height, alignment);
        RenderTarget {
            id: SlotMap::<RenderTargetId, ()>::with_key().insert(()),
            width,
            height,
            texture_width: layout.texture_width,
            texture_height: layout.texture_height,
            uv_coords: layout.uv_coords,
            ..RenderTarget::empty()
        }
    }

    #[test]
    fn align_up_rounds_to_multiple() {
        assert_eq!(align_up(301, 4), 304);
        assert_eq!(align_up(304, 4), 304);
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(7, 0), 7);
    }

    #[test]
    fn padded_target_uv_excludes_padding() {
        let t = target(301, 301, 4);
        assert_eq!((t.texture_width, t.texture_height), (304, 304));
        assert_eq!(t.uv_coords, Rect::new(0.0, 0.0, 301.0 / 304.0, 301.0 / 304.0));
    }

    #[test]
    fn uv_corners_map_to_viewport_corners() {
        for (w, h, align) in [(301, 301, 4), (640, 480, 1), (17, 1000, 64), (1, 1, 256)] {
            let t = target(w, h, align);
            assert_eq!(t.uv_at(0.0, 0.0), Vec2::new(t.uv_coords.left, t.uv_coords.top));
            assert_eq!(
                t.uv_at(w as f32, h as f32),
                Vec2::new(t.uv_coords.right, t.uv_coords.bottom)
            );

            let origin = t.logical_at(t.uv_coords.left, t.uv_coords.top);
            let far = t.logical_at(t.uv_coords.right, t.uv_coords.bottom);
            assert_eq!(origin, Vec2::zero());
            assert!((far.x - w as f32).abs() < 1e-3 && (far.y - h as f32).abs() < 1e-3);
        }
    }

    #[test]
    fn unpadded_target_spans_full_texture() {
        let t = target(256, 128, 1);
        assert_eq!(t.uv_coords, Rect::new(0.0, 0.0, 1.0, 1.0));
    }
}
