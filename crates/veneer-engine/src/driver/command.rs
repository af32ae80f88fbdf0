use std::ops::Range;

use crate::geometry::GpuState;

use super::{GeometryId, RenderBufferId};

/// One queued driver command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ClearRenderBuffer {
        render_buffer: RenderBufferId,
        color: [f32; 4],
    },
    DrawGeometry {
        geometry: GeometryId,
        indices: Range<u32>,
        state: Box<GpuState>,
    },
}

impl Command {
    /// Destination of the command.
    pub fn render_buffer(&self) -> RenderBufferId {
        match self {
            Command::ClearRenderBuffer { render_buffer, .. } => *render_buffer,
            Command::DrawGeometry { state, .. } => state.render_buffer,
        }
    }
}

/// Commands in submission order, waiting for the backend to flush them.
#[derive(Debug, Default)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Runs of consecutive commands with the same destination.
    ///
    /// Explicit-submission backends open one render pass per run.
    pub fn passes(&self) -> impl Iterator<Item = &[Command]> {
        self.commands
            .chunk_by(|a, b| a.render_buffer() == b.render_buffer())
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Moves the queued commands out, leaving the list empty.
    pub fn take(&mut self) -> CommandList {
        CommandList {
            commands: std::mem::take(&mut self.commands),
        }
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
