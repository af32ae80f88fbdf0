use crate::coords::IntRect;
use crate::driver::{RenderBufferId, TextureId};
use crate::math::Matrix;

use super::{ClipStack, VertexFormat};

/// Shader program selected for a draw.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ShaderType {
    /// General primitive shader over `Vertex` geometry.
    #[default]
    Fill,
    /// Path coverage shader over `PathVertex` geometry.
    FillPath,
}

impl ShaderType {
    /// Vertex format the shader consumes.
    #[inline]
    pub fn vertex_format(self) -> VertexFormat {
        match self {
            ShaderType::Fill => VertexFormat::Fill,
            ShaderType::FillPath => VertexFormat::Path,
        }
    }
}

/// Composite mode for a draw.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Overwrite the destination.
    Replace,
    /// Premultiplied source-over.
    #[default]
    SourceOver,
}

/// Number of texture slots a draw can bind.
pub const TEXTURE_SLOTS: usize = 3;

/// Complete descriptor for one draw call.
///
/// Nothing is inherited from earlier draws: every field the backend needs
/// is here.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuState {
    /// Destination buffer.
    pub render_buffer: RenderBufferId,
    /// Size of the destination viewport in device pixels.
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Paint-space to device-space transform.
    pub transform: Matrix,
    pub shader: ShaderType,
    pub textures: [Option<TextureId>; TEXTURE_SLOTS],
    pub uniform_scalar: [f32; 8],
    pub uniform_vector: [[f32; 4]; 8],
    pub clips: ClipStack,
    pub blend: BlendMode,
    /// Device-space scissor; `None` draws to the whole viewport.
    pub scissor: Option<IntRect>,
}

impl Default for GpuState {
    fn default() -> Self {
        Self {
            render_buffer: RenderBufferId::default(),
            viewport_width: 0,
            viewport_height: 0,
            transform: Matrix::identity(),
            shader: ShaderType::Fill,
            textures: [None; TEXTURE_SLOTS],
            uniform_scalar: [0.0; 8],
            uniform_vector: [[0.0; 4]; 8],
            clips: ClipStack::new(),
            blend: BlendMode::SourceOver,
            scissor: None,
        }
    }
}

impl GpuState {
    /// State targeting `render_buffer` with a `width` x `height` viewport.
    pub fn for_target(render_buffer: RenderBufferId, width: u32, height: u32) -> Self {
        Self {
            render_buffer,
            viewport_width: width,
            viewport_height: height,
            ..Self::default()
        }
    }

    /// Bound textures in slot order, skipping empty slots.
    pub fn bound_textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.textures.iter().flatten().copied()
    }
}
