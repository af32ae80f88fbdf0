//! Geometry and uniform data layer.
//!
//! Every struct here that reaches the GPU is `#[repr(C)]` + `Pod` and is
//! uploaded byte-for-byte by both backends.

mod clip;
mod state;
mod uniforms;
mod vertex;

pub use clip::{ClipEntry, ClipStack, MAX_CLIPS};
pub use state::{BlendMode, GpuState, ShaderType, TEXTURE_SLOTS};
pub use uniforms::{Uniforms, UNIFORMS_SIZE};
pub use vertex::{
    AttributeKind, FillType, PathVertex, Vertex, VertexAttribute, VertexData, VertexFormat,
};
