//! Coordinate types shared by the driver, backends and overlay.
//!
//! Device space:
//! - physical pixels
//! - origin top-left, +X right, +Y down
//!
//! Backends map device space to NDC through the `Uniforms::transform`
//! projection; nothing above the backend deals in NDC.

mod rect;
mod vec2;

pub use rect::{IntRect, Rect};
pub use vec2::Vec2;
