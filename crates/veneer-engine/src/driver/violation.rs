//! Contract violations: caller bugs against the driver protocol.

use std::ops::Range;

use thiserror::Error;

use crate::backend::FrameState;
use crate::geometry::{ShaderType, VertexFormat};
use crate::target::PixelFormat;

use super::AnyResource;

/// A call the driver refused because it breaks the driver contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractViolation {
    /// The id was never issued by this driver (or is the null id).
    #[error("{0:?} is not a live resource")]
    UnknownId(AnyResource),

    /// The id was destroyed and may no longer be referenced by new calls.
    #[error("{0:?} was already destroyed")]
    DestroyedId(AnyResource),

    /// `begin_synchronize` inside an open bracket.
    #[error("begin_synchronize called while a synchronize bracket is open")]
    NestedSynchronize,

    /// `end_synchronize` with no open bracket.
    #[error("end_synchronize called without begin_synchronize")]
    UnbalancedSynchronize,

    /// The frame ended with a synchronize bracket still open.
    #[error("end_drawing called while a synchronize bracket is open")]
    OpenSynchronize,

    /// A command was submitted outside a synchronize bracket.
    #[error("{0} submitted outside begin_synchronize/end_synchronize")]
    OutsideSynchronize(&'static str),

    /// A frame lifecycle call arrived in the wrong state.
    #[error("{op} is not valid while the frame is {state:?}")]
    FrameOrder { op: &'static str, state: FrameState },

    /// A draw asked for indices past the end of its geometry.
    #[error("draw of indices {range:?} exceeds the {count} indices of the geometry")]
    IndexRange { range: Range<u32>, count: u32 },

    /// Geometry vertex format does not match the shader of the draw.
    #[error("{shader:?} draws {expected:?} vertices but the geometry holds {actual:?}")]
    VertexFormat {
        shader: ShaderType,
        expected: VertexFormat,
        actual: VertexFormat,
    },

    /// Geometry update changed the vertex format of an existing geometry.
    #[error("geometry update changes vertex format from {from:?} to {to:?}")]
    GeometryFormatChange { from: VertexFormat, to: VertexFormat },

    /// Index data references a vertex that does not exist.
    #[error("index {index} is out of range for {vertices} vertices")]
    IndexOutOfBounds { index: u32, vertices: u32 },

    /// Pixel data does not match the texture it is written to.
    #[error("{width}x{height} {format:?} pixels do not fit a {expected_width}x{expected_height} {expected_format:?} texture")]
    TextureMismatch {
        width: u32,
        height: u32,
        format: PixelFormat,
        expected_width: u32,
        expected_height: u32,
        expected_format: PixelFormat,
    },

    /// Initial texture data has the wrong length.
    #[error("texture data has {actual} bytes, {expected} expected")]
    TextureDataLength { actual: usize, expected: usize },

    /// The surface render buffer belongs to the context and cannot be destroyed.
    #[error("the surface render buffer cannot be destroyed")]
    SurfaceDestroy,
}

/// Logs `violation`; panics when debug assertions are enabled.
///
/// Release builds turn the offending call into a no-op. Callers keep their
/// own count (see `DriverCore::violation_count`).
#[track_caller]
pub fn report_violation(violation: &ContractViolation) {
    log::error!("contract violation: {violation}");
    if cfg!(debug_assertions) {
        panic!("contract violation: {violation}");
    }
}
