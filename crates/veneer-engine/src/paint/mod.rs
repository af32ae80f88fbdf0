//! Color model for vertex data.
//!
//! Colors travel to the GPU as packed premultiplied RGBA8 inside `Vertex`
//! and `PathVertex`; `Color` is the float form callers build them from.

pub mod color;

pub use color::Color;
