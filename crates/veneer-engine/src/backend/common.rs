//! Helpers shared by both backends.

use crate::driver::{GpuDriver, Key, RenderTargetId};
use crate::geometry::GpuState;
use crate::target::{PixelFormat, RenderBufferDesc, RenderTarget, RenderTargetLayout};

/// Texel format of every render-target texture.
pub(crate) const RENDER_TARGET_FORMAT: PixelFormat = PixelFormat::Bgra8Unorm;

// ── render targets ────────────────────────────────────────────────────────

/// Creates the padded texture and render buffer behind a render target.
///
/// The returned target has a null `id`; the caller registers it. On failure
/// nothing is left allocated.
pub(crate) fn allocate_render_target(
    driver: &mut (impl GpuDriver + ?Sized),
    width: u32,
    height: u32,
) -> Option<RenderTarget> {
    let layout = RenderTargetLayout::new(width, height, driver.render_target_alignment());
    let texture_id = driver.create_texture(
        layout.texture_width,
        layout.texture_height,
        RENDER_TARGET_FORMAT,
        None,
    );
    if texture_id.is_null() {
        return None;
    }

    let render_buffer_id = driver.create_render_buffer(&RenderBufferDesc { texture_id, width, height });
    if render_buffer_id.is_null() {
        driver.destroy_texture(texture_id);
        return None;
    }

    Some(RenderTarget {
        id: RenderTargetId::null(),
        width,
        height,
        texture_id,
        texture_width: layout.texture_width,
        texture_height: layout.texture_height,
        texture_format: RENDER_TARGET_FORMAT,
        render_buffer_id,
        uv_coords: layout.uv_coords,
    })
}

// ── scissor rect ──────────────────────────────────────────────────────────

/// Device-space scissor `(x, y, w, h)` for a draw into a `width` x `height`
/// buffer, top-left origin.
///
/// Returns `None` when nothing would be drawn (the caller skips the draw).
/// `state.scissor = None` means the whole buffer.
pub(super) fn scissor_rect(state: &GpuState, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    match state.scissor {
        None => Some((0, 0, width, height)),
        Some(rect) => rect.clamp_to_target(width, height),
    }
}

/// Converts a top-left-origin scissor to GL window coordinates.
///
/// Offscreen targets are rendered Y-flipped, so their rows already run
/// top-down and only the window surface needs converting.
pub(super) fn gl_scissor(
    (x, y, w, h): (u32, u32, u32, u32),
    buffer_height: u32,
    flipped: bool,
) -> (i32, i32, i32, i32) {
    let y = if flipped { y } else { buffer_height.saturating_sub(y + h) };
    (x as i32, y as i32, w as i32, h as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::IntRect;

    #[test]
    fn no_scissor_covers_buffer() {
        let state = GpuState::default();
        assert_eq!(scissor_rect(&state, 64, 32), Some((0, 0, 64, 32)));
        assert_eq!(scissor_rect(&state, 0, 32), None);
    }

    #[test]
    fn scissor_is_clamped_to_buffer() {
        let mut state = GpuState::default();
        state.scissor = Some(IntRect::from_xywh(-10, 20, 50, 100));
        assert_eq!(scissor_rect(&state, 64, 64), Some((0, 20, 40, 44)));

        state.scissor = Some(IntRect::from_xywh(100, 0, 10, 10));
        assert_eq!(scissor_rect(&state, 64, 64), None);
    }

    #[test]
    fn gl_scissor_flips_only_the_surface() {
        assert_eq!(gl_scissor((0, 10, 20, 30), 100, true), (0, 10, 20, 30));
        assert_eq!(gl_scissor((0, 10, 20, 30), 100, false), (0, 60, 20, 30));
    }
}
