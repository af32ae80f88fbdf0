//! Backend contexts.
//!
//! A context owns the native device objects for one window, implements
//! [`GpuDriver`] on top of a [`DriverCore`](crate::driver::DriverCore) and
//! drives the frame cycle:
//!
//! `begin_drawing` -> queue commands -> `end_drawing` (flush to native calls)
//! -> `present_frame`.
//!
//! - `wgpu`: explicit command buffers and render passes
//! - `gl`: OpenGL 3.3 core through `glow`, immediate state

mod clock;
pub(crate) mod common;
mod lifecycle;

pub mod gl;
pub mod wgpu;

pub use clock::{FrameClock, FrameTime};
pub use lifecycle::{FrameBegin, FrameLifecycle, FrameState};

use anyhow::Result;

use crate::driver::GpuDriver;

/// Frame control for a backend context.
pub trait GpuContext: GpuDriver {
    /// Starts a frame: drains released handles, frees retired resources and
    /// acquires the surface.
    ///
    /// Returns `Err` when the surface is lost for good; the context should
    /// then be dropped.
    fn begin_drawing(&mut self) -> Result<FrameBegin>;

    /// Executes every queued command in submission order.
    fn end_drawing(&mut self);

    /// Shows the recorded frame. May block on vsync.
    fn present_frame(&mut self);

    /// Drops the current frame and its queued commands without presenting.
    fn abandon_frame(&mut self);

    /// New surface size in device pixels. Only valid between frames.
    fn resize(&mut self, width: u32, height: u32);

    /// New device scale. Only valid between frames; takes effect at the
    /// next `resize`.
    fn set_scale(&mut self, scale: f64);

    fn scale(&self) -> f64;

    fn state(&self) -> FrameState;

    /// Contract violations reported by this context.
    fn violation_count(&self) -> u64;
}
