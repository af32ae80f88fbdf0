//! OpenGL 3.3 core backend through `glow`.
//!
//! The host owns the GL context and its window surface (glutin, SDL, ...)
//! and hands the backend a loaded [`glow::Context`] plus a [`GlSurface`]
//! for presentation. The context must be current on the calling thread for
//! the lifetime of the [`GlContext`].

mod context;
mod program;
mod resources;

pub use context::GlContext;
pub use resources::{GlGeometry, GlRenderBuffer, GlTexture};

/// Presentation hooks supplied by the host windowing layer.
pub trait GlSurface {
    /// Shows the back buffer. May block on vsync.
    fn swap_buffers(&self) -> anyhow::Result<()>;

    /// Requests vsync on or off. Hosts that cannot change it ignore the call.
    fn set_swap_interval(&self, vsync: bool) -> anyhow::Result<()> {
        let _ = vsync;
        Ok(())
    }
}

/// Construction parameters for [`GlContext`].
#[derive(Debug, Clone)]
pub struct GlInit {
    pub vsync: bool,

    /// Render-target textures are padded to a multiple of this.
    pub render_target_alignment: u32,
}

impl Default for GlInit {
    fn default() -> Self {
        Self { vsync: true, render_target_alignment: 1 }
    }
}
