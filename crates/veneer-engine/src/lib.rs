//! Veneer engine crate.
//!
//! Backend-agnostic GPU command layer for a paint pipeline: the `GpuDriver`
//! protocol, its shared vertex/uniform layouts, a wgpu and an OpenGL
//! backend, and the overlay compositor that puts rendered views on screen.

pub mod logging;
pub mod coords;
pub mod math;
pub mod paint;
pub mod geometry;
pub mod target;
pub mod driver;
pub mod backend;
pub mod overlay;
