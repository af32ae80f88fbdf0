//! wgpu backend.

mod context;
mod init;
mod pipeline;
mod resources;
mod surface;
mod uniform_ring;

pub use context::WgpuContext;
pub use init::WgpuInit;
pub use resources::{WgpuGeometry, WgpuRenderBuffer, WgpuTexture};
pub use surface::SurfaceErrorAction;
