//! Offscreen surface descriptions.
//!
//! A `RenderTarget` separates the logical viewport the paint pipeline draws
//! into from the padded texture that backs it. Anything sampling the
//! target goes through `RenderTarget::uv_coords`.

mod bitmap;
mod render_target;

pub use bitmap::{Bitmap, PixelFormat, RenderBufferDesc};
pub use render_target::{align_up, RenderTarget, RenderTargetLayout};
