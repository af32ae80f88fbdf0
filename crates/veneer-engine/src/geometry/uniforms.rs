use bytemuck::{Pod, Zeroable};

use crate::math::Matrix4x4;

use super::{ClipEntry, GpuState, MAX_CLIPS};

/// Per-draw constant block (768 bytes, std140-compatible).
///
/// Field order and sizes are shared with `shaders/*.wgsl` and
/// `shaders/*.glsl`; `_pad` is the only padding and it is explicit.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    /// (time seconds, viewport width, viewport height, device scale)
    pub state: [f32; 4],
    /// Paint space to NDC.
    pub transform: Matrix4x4,
    /// `GpuState::uniform_scalar` packed into two vec4s.
    pub scalar4: [[f32; 4]; 2],
    pub vector: [[f32; 4]; 8],
    /// Number of active entries in `clip`, always `<= MAX_CLIPS`.
    pub clip_size: u32,
    pub _pad: [u32; 3],
    pub clip: [Matrix4x4; MAX_CLIPS],
}

/// Size of one uniform block; a multiple of 256 so consecutive blocks can be
/// bound with dynamic offsets without extra alignment.
pub const UNIFORMS_SIZE: usize = std::mem::size_of::<Uniforms>();

impl Uniforms {
    /// Builds the block for one draw.
    ///
    /// `flip_y` selects the projection for backends whose offscreen targets
    /// are stored bottom-up (GL framebuffers).
    pub fn from_state(state: &GpuState, time: f32, scale: f32, flip_y: bool) -> Self {
        let projection = Matrix4x4::orthographic(
            state.viewport_width as f32,
            state.viewport_height as f32,
            flip_y,
        );

        let s = &state.uniform_scalar;
        let mut uniforms = Self {
            state: [
                time,
                state.viewport_width as f32,
                state.viewport_height as f32,
                scale,
            ],
            transform: projection * state.transform.to_matrix4x4(),
            scalar4: [[s[0], s[1], s[2], s[3]], [s[4], s[5], s[6], s[7]]],
            vector: state.uniform_vector,
            clip_size: 0,
            _pad: [0; 3],
            clip: [Matrix4x4::identity(); MAX_CLIPS],
        };
        uniforms.set_clips(state.clips.as_slice());
        uniforms
    }

    /// Writes `clips` into the fixed array, clamping to `MAX_CLIPS`.
    ///
    /// Extra clips are dropped with a warning.
    pub fn set_clips(&mut self, clips: &[ClipEntry]) {
        if clips.len() > MAX_CLIPS {
            log::warn!(
                "{} clips requested; clamping to {MAX_CLIPS}",
                clips.len()
            );
        }
        let n = clips.len().min(MAX_CLIPS);
        for (slot, clip) in self.clip.iter_mut().zip(&clips[..n]) {
            *slot = clip.to_matrix4x4();
        }
        self.clip_size = n as u32;
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
