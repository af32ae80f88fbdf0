//! Backend-agnostic GPU driver protocol.
//!
//! `GpuDriver` is the surface the paint pipeline and the overlay talk to.
//! `DriverCore` holds the bookkeeping both backends share: typed id tables,
//! the synchronize bracket, the command list and contract checks.

mod command;
mod driver_core;
mod handle;
mod ids;
mod interface;
mod table;
mod violation;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{Command, CommandList};
pub use driver_core::{DriverCore, Garbage, GeometryEntry, RenderBufferEntry, TextureEntry};
pub use handle::{Owned, ReleaseQueue};
pub use ids::{AnyResource, GeometryId, RenderBufferId, RenderTargetId, TextureId};
pub use interface::{FaceWinding, GpuDriver};
pub use table::{Lookup, ResourceTable};
pub use violation::{report_violation, ContractViolation};

pub use slotmap::Key;
