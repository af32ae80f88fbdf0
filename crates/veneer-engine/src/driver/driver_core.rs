use std::ops::Range;

use slotmap::Key;

use crate::geometry::{GpuState, VertexData, VertexFormat};
use crate::target::{Bitmap, PixelFormat, RenderBufferDesc, RenderTarget};

use super::table::{Lookup, ResourceTable};
use super::{
    report_violation, AnyResource, Command, CommandList, ContractViolation, GeometryId,
    ReleaseQueue, RenderBufferId, RenderTargetId, TextureId,
};

/// Geometry bookkeeping plus the backend's native buffers.
#[derive(Debug)]
pub struct GeometryEntry<G> {
    pub format: VertexFormat,
    pub vertex_count: u32,
    pub index_count: u32,
    pub native: G,
}

#[derive(Debug)]
pub struct TextureEntry<T> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub native: T,
}

#[derive(Debug)]
pub struct RenderBufferEntry<B> {
    pub desc: RenderBufferDesc,
    pub native: B,
}

/// Native objects removed from the tables, ready for the backend to free.
#[derive(Debug)]
pub struct Garbage<G, T, B> {
    pub geometries: Vec<G>,
    pub textures: Vec<T>,
    pub render_buffers: Vec<B>,
}

impl<G, T, B> Garbage<G, T, B> {
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty() && self.textures.is_empty() && self.render_buffers.is_empty()
    }
}

/// Backend-independent half of a driver.
///
/// Owns the resource tables, the synchronize bracket and the command list,
/// and validates every call before a backend sees it. Backends supply the
/// native object types and turn queued commands into native calls.
pub struct DriverCore<G, T, B> {
    geometries: ResourceTable<GeometryId, GeometryEntry<G>>,
    textures: ResourceTable<TextureId, TextureEntry<T>>,
    render_buffers: ResourceTable<RenderBufferId, RenderBufferEntry<B>>,
    render_targets: ResourceTable<RenderTargetId, RenderTarget>,
    commands: CommandList,
    synchronizing: bool,
    violations: u64,
    releases: ReleaseQueue,
    surface: RenderBufferId,
}

impl<G, T, B> Default for DriverCore<G, T, B> {
    fn default() -> Self {
        Self {
            geometries: ResourceTable::new(),
            textures: ResourceTable::new(),
            render_buffers: ResourceTable::new(),
            render_targets: ResourceTable::new(),
            commands: CommandList::new(),
            synchronizing: false,
            violations: 0,
            releases: ReleaseQueue::new(),
            surface: RenderBufferId::default(),
        }
    }
}

impl<G, T, B> DriverCore<G, T, B> {
    pub fn new() -> Self {
        Self::default()
    }

    // ── violations ────────────────────────────────────────────────────────

    /// Counts and reports a violation. Panics under debug assertions.
    #[track_caller]
    pub fn violation(&mut self, violation: ContractViolation) {
        self.violations += 1;
        report_violation(&violation);
    }

    /// Violations seen so far (only observable in release builds, where
    /// they do not panic).
    #[inline]
    pub fn violation_count(&self) -> u64 {
        self.violations
    }

    // ── synchronize bracket ───────────────────────────────────────────────

    pub fn begin_synchronize(&mut self) {
        if self.synchronizing {
            self.violation(ContractViolation::NestedSynchronize);
            return;
        }
        self.synchronizing = true;
    }

    pub fn end_synchronize(&mut self) {
        if !self.synchronizing {
            self.violation(ContractViolation::UnbalancedSynchronize);
            return;
        }
        self.synchronizing = false;
    }

    #[inline]
    pub fn is_synchronizing(&self) -> bool {
        self.synchronizing
    }

    // ── geometry ──────────────────────────────────────────────────────────

    /// Validates index data for a new or updated geometry.
    pub fn check_indices(&mut self, vertices: &VertexData<'_>, indices: &[u32]) -> bool {
        let count = vertices.len() as u32;
        if let Some(&index) = indices.iter().find(|&&i| i >= count) {
            self.violation(ContractViolation::IndexOutOfBounds { index, vertices: count });
            return false;
        }
        true
    }

    pub fn insert_geometry(&mut self, vertices: &VertexData<'_>, indices: &[u32], native: G) -> GeometryId {
        self.geometries.insert(GeometryEntry {
            format: vertices.format(),
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
            native,
        })
    }

    /// Live geometry for `update_geometry`, after checking the new data.
    pub fn geometry_for_update(
        &mut self,
        id: GeometryId,
        vertices: &VertexData<'_>,
        indices: &[u32],
    ) -> Option<&mut GeometryEntry<G>> {
        let from = match self.geometries.lookup(id) {
            Lookup::Live(entry) => entry.format,
            Lookup::Retired(_) => {
                self.violation(ContractViolation::DestroyedId(id.into()));
                return None;
            }
            Lookup::Missing => {
                self.violation(ContractViolation::UnknownId(id.into()));
                return None;
            }
        };
        if from != vertices.format() {
            self.violation(ContractViolation::GeometryFormatChange { from, to: vertices.format() });
            return None;
        }
        if !self.check_indices(vertices, indices) {
            return None;
        }
        let entry = self.geometries.get_live_mut(id)?;
        entry.vertex_count = vertices.len() as u32;
        entry.index_count = indices.len() as u32;
        Some(entry)
    }

    /// Geometry for executing a queued command (live or retired).
    #[inline]
    pub fn geometry(&self, id: GeometryId) -> Option<&GeometryEntry<G>> {
        self.geometries.get(id)
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    // ── textures ──────────────────────────────────────────────────────────

    /// Checks initial texture data against the texture size.
    pub fn check_texture_data(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Option<&[u8]>,
    ) -> bool {
        let Some(pixels) = pixels else { return true };
        let expected = width as usize * height as usize * format.bytes_per_pixel() as usize;
        if pixels.len() != expected {
            self.violation(ContractViolation::TextureDataLength { actual: pixels.len(), expected });
            return false;
        }
        true
    }

    pub fn insert_texture(&mut self, width: u32, height: u32, format: PixelFormat, native: T) -> TextureId {
        self.textures.insert(TextureEntry { width, height, format, native })
    }

    /// Live texture for `update_texture`, after checking `bitmap` fits it.
    pub fn texture_for_update(&mut self, id: TextureId, bitmap: &Bitmap) -> Option<&TextureEntry<T>> {
        let (width, height, format) = match self.textures.lookup(id) {
            Lookup::Live(entry) => (entry.width, entry.height, entry.format),
            Lookup::Retired(_) => {
                self.violation(ContractViolation::DestroyedId(id.into()));
                return None;
            }
            Lookup::Missing => {
                self.violation(ContractViolation::UnknownId(id.into()));
                return None;
            }
        };
        if bitmap.width != width || bitmap.height != height || bitmap.format != format {
            self.violation(ContractViolation::TextureMismatch {
                width: bitmap.width,
                height: bitmap.height,
                format: bitmap.format,
                expected_width: width,
                expected_height: height,
                expected_format: format,
            });
            return None;
        }
        self.textures.get_live(id)
    }

    #[inline]
    pub fn texture(&self, id: TextureId) -> Option<&TextureEntry<T>> {
        self.textures.get(id)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // ── render buffers ────────────────────────────────────────────────────

    /// Checks that `desc` names a live texture of at least its size.
    pub fn check_render_buffer_desc(&mut self, desc: &RenderBufferDesc) -> Option<&TextureEntry<T>> {
        let (width, height, format) = match self.textures.lookup(desc.texture_id) {
            Lookup::Live(entry) => (entry.width, entry.height, entry.format),
            Lookup::Retired(_) => {
                self.violation(ContractViolation::DestroyedId(desc.texture_id.into()));
                return None;
            }
            Lookup::Missing => {
                self.violation(ContractViolation::UnknownId(desc.texture_id.into()));
                return None;
            }
        };
        if desc.width > width || desc.height > height {
            self.violation(ContractViolation::TextureMismatch {
                width: desc.width,
                height: desc.height,
                format,
                expected_width: width,
                expected_height: height,
                expected_format: format,
            });
            return None;
        }
        self.textures.get_live(desc.texture_id)
    }

    pub fn insert_render_buffer(&mut self, desc: RenderBufferDesc, native: B) -> RenderBufferId {
        self.render_buffers.insert(RenderBufferEntry { desc, native })
    }

    /// Registers the window surface. It cannot be destroyed through the driver.
    pub fn insert_surface(&mut self, width: u32, height: u32, native: B) -> RenderBufferId {
        let desc = RenderBufferDesc { texture_id: TextureId::default(), width, height };
        self.surface = self.render_buffers.insert(RenderBufferEntry { desc, native });
        self.surface
    }

    #[inline]
    pub fn surface(&self) -> RenderBufferId {
        self.surface
    }

    /// Mutable surface entry, for backends that resize it.
    pub fn surface_entry_mut(&mut self) -> Option<&mut RenderBufferEntry<B>> {
        self.render_buffers.get_live_mut(self.surface)
    }

    #[inline]
    pub fn render_buffer(&self, id: RenderBufferId) -> Option<&RenderBufferEntry<B>> {
        self.render_buffers.get(id)
    }

    pub fn render_buffer_count(&self) -> usize {
        self.render_buffers.len()
    }

    // ── render targets ────────────────────────────────────────────────────

    pub fn insert_render_target(&mut self, target: RenderTarget) -> RenderTargetId {
        self.render_targets.insert(target)
    }

    /// Writes the issued id back into the stored descriptor.
    pub fn set_render_target_id(&mut self, id: RenderTargetId) {
        if let Some(target) = self.render_targets.get_live_mut(id) {
            target.id = id;
        }
    }

    #[inline]
    pub fn render_target(&self, id: RenderTargetId) -> Option<&RenderTarget> {
        self.render_targets.get_live(id)
    }

    pub fn render_target_count(&self) -> usize {
        self.render_targets.len()
    }

    /// Live render targets, for backends that reallocate them.
    pub fn render_targets(&self) -> impl Iterator<Item = (RenderTargetId, &RenderTarget)> {
        self.render_targets.iter_live()
    }

    // ── destruction ───────────────────────────────────────────────────────

    /// Retires `id`. The native object is freed by a later [`sweep`](Self::sweep).
    pub fn destroy(&mut self, id: AnyResource) {
        let retired = match id {
            AnyResource::Geometry(id) => self.geometries.retire(id),
            AnyResource::Texture(id) => self.textures.retire(id),
            AnyResource::RenderBuffer(id) => {
                if id == self.surface && !id.is_null() {
                    self.violation(ContractViolation::SurfaceDestroy);
                    return;
                }
                self.render_buffers.retire(id)
            }
            AnyResource::RenderTarget(id) => match self.render_targets.get_live(id).copied() {
                Some(target) => {
                    self.render_targets.retire(id);
                    self.render_buffers.retire(target.render_buffer_id);
                    self.textures.retire(target.texture_id);
                    true
                }
                None => false,
            },
        };
        if !retired {
            let violation = if self.exists(id) {
                ContractViolation::DestroyedId(id)
            } else {
                ContractViolation::UnknownId(id)
            };
            self.violation(violation);
        }
    }

    fn exists(&self, id: AnyResource) -> bool {
        match id {
            AnyResource::Geometry(id) => self.geometries.get(id).is_some(),
            AnyResource::Texture(id) => self.textures.get(id).is_some(),
            AnyResource::RenderBuffer(id) => self.render_buffers.get(id).is_some(),
            AnyResource::RenderTarget(id) => {
                !matches!(self.render_targets.lookup(id), Lookup::Missing)
            }
        }
    }

    /// Shared queue that [`Owned`](super::Owned) handles release into.
    pub fn release_queue(&self) -> ReleaseQueue {
        self.releases.clone()
    }

    /// Destroys every id released by dropped handles.
    pub fn drain_releases(&mut self) {
        for id in self.releases.drain() {
            log::trace!("releasing {id:?}");
            self.destroy(id);
        }
    }

    /// Removes retired entries and returns their native objects.
    ///
    /// Does nothing while commands are queued, since they may still
    /// reference retired ids.
    pub fn sweep(&mut self) -> Garbage<G, T, B> {
        if !self.commands.is_empty() {
            return Garbage { geometries: Vec::new(), textures: Vec::new(), render_buffers: Vec::new() };
        }
        self.render_targets.sweep();
        Garbage {
            geometries: self.geometries.sweep().into_iter().map(|e| e.native).collect(),
            textures: self.textures.sweep().into_iter().map(|e| e.native).collect(),
            render_buffers: self.render_buffers.sweep().into_iter().map(|e| e.native).collect(),
        }
    }

    /// Empties every table (context teardown). Pending commands are dropped.
    pub fn drain_all(&mut self) -> Garbage<G, T, B> {
        self.commands.clear();
        self.releases.drain();
        self.render_targets.drain();
        self.surface = RenderBufferId::default();
        Garbage {
            geometries: self.geometries.drain().into_iter().map(|e| e.native).collect(),
            textures: self.textures.drain().into_iter().map(|e| e.native).collect(),
            render_buffers: self.render_buffers.drain().into_iter().map(|e| e.native).collect(),
        }
    }

    // ── commands ──────────────────────────────────────────────────────────

    pub fn queue_clear(&mut self, render_buffer: RenderBufferId, color: [f32; 4]) {
        if !self.synchronizing {
            self.violation(ContractViolation::OutsideSynchronize("clear_render_buffer"));
            return;
        }
        if !self.check_live_render_buffer(render_buffer) {
            return;
        }
        self.commands.push(Command::ClearRenderBuffer { render_buffer, color });
    }

    /// Validates and queues one draw. Empty index ranges are dropped.
    pub fn queue_draw(&mut self, geometry: GeometryId, indices: Range<u32>, state: &GpuState) {
        if !self.synchronizing {
            self.violation(ContractViolation::OutsideSynchronize("draw_geometry"));
            return;
        }

        let (format, count) = match self.geometries.lookup(geometry) {
            Lookup::Live(entry) => (entry.format, entry.index_count),
            Lookup::Retired(_) => {
                self.violation(ContractViolation::DestroyedId(geometry.into()));
                return;
            }
            Lookup::Missing => {
                self.violation(ContractViolation::UnknownId(geometry.into()));
                return;
            }
        };

        if indices.start > indices.end || indices.end > count {
            self.violation(ContractViolation::IndexRange { range: indices, count });
            return;
        }

        let expected = state.shader.vertex_format();
        if format != expected {
            self.violation(ContractViolation::VertexFormat {
                shader: state.shader,
                expected,
                actual: format,
            });
            return;
        }

        if !self.check_live_render_buffer(state.render_buffer) {
            return;
        }
        for texture in state.bound_textures() {
            match self.textures.lookup(texture) {
                Lookup::Live(_) => {}
                Lookup::Retired(_) => {
                    self.violation(ContractViolation::DestroyedId(texture.into()));
                    return;
                }
                Lookup::Missing => {
                    self.violation(ContractViolation::UnknownId(texture.into()));
                    return;
                }
            }
        }

        if indices.is_empty() || state.viewport_width == 0 || state.viewport_height == 0 {
            return;
        }

        self.commands.push(Command::DrawGeometry {
            geometry,
            indices,
            state: Box::new(state.clone()),
        });
    }

    fn check_live_render_buffer(&mut self, id: RenderBufferId) -> bool {
        match self.render_buffers.lookup(id) {
            Lookup::Live(_) => true,
            Lookup::Retired(_) => {
                self.violation(ContractViolation::DestroyedId(id.into()));
                false
            }
            Lookup::Missing => {
                self.violation(ContractViolation::UnknownId(id.into()));
                false
            }
        }
    }

    #[inline]
    pub fn commands(&self) -> &CommandList {
        &self.commands
    }

    /// Moves the queued commands out for execution.
    pub fn take_commands(&mut self) -> CommandList {
        self.commands.take()
    }

    /// Commands for `end_drawing`. An open bracket is reported and closed;
    /// its commands still execute.
    pub fn finish_commands(&mut self) -> CommandList {
        if self.synchronizing {
            self.violation(ContractViolation::OpenSynchronize);
            self.synchronizing = false;
        }
        self.commands.take()
    }

    /// Drops queued commands and closes an open bracket (abandoned frame).
    pub fn discard_commands(&mut self) {
        if !self.commands.is_empty() {
            log::debug!("discarding {} queued commands", self.commands.len());
        }
        self.commands.clear();
        self.synchronizing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Owned;
    use crate::geometry::{PathVertex, ShaderType, Vertex};

    type Core = DriverCore<(), (), ()>;

    fn quad() -> [Vertex; 4] {
        [Vertex::default(); 4]
    }

    fn setup() -> (Core, GeometryId, GpuState) {
        let mut core = Core::new();
        let surface = core.insert_surface(100, 100, ());
        let verts = quad();
        let data = VertexData::Fill(&verts);
        let id = core.insert_geometry(&data, &[0, 1, 2, 0, 2, 3], ());
        (core, id, GpuState::for_target(surface, 100, 100))
    }

    // ── commands ──────────────────────────────────────────────────────────

    #[test]
    fn draws_queue_in_submission_order() {
        let (mut core, id, state) = setup();
        core.begin_synchronize();
        core.queue_clear(state.render_buffer, [0.0, 0.0, 0.0, 1.0]);
        core.queue_draw(id, 0..6, &state);
        core.queue_draw(id, 3..6, &state);
        core.end_synchronize();

        let commands: Vec<_> = core.take_commands().iter().cloned().collect();
        assert_eq!(commands.len(), 3);
        assert!(matches!(commands[0], Command::ClearRenderBuffer { .. }));
        assert!(matches!(&commands[2], Command::DrawGeometry { indices, .. } if *indices == (3..6)));
        assert_eq!(core.violation_count(), 0);
    }

    #[test]
    fn empty_draws_are_skipped() {
        let (mut core, id, mut state) = setup();
        core.begin_synchronize();
        core.queue_draw(id, 2..2, &state);
        state.viewport_width = 0;
        core.queue_draw(id, 0..6, &state);
        core.end_synchronize();
        assert!(core.commands().is_empty());
        assert_eq!(core.violation_count(), 0);
    }

    // ── retire then free ──────────────────────────────────────────────────

    #[test]
    fn destroyed_geometry_survives_until_commands_flush() {
        let (mut core, id, state) = setup();
        core.begin_synchronize();
        core.queue_draw(id, 0..6, &state);
        core.destroy(id.into());
        core.end_synchronize();

        // Still referenced by the queued draw.
        assert!(core.sweep().is_empty());
        assert!(core.geometry(id).is_some());

        let flushed = core.take_commands();
        assert_eq!(flushed.len(), 1);
        assert_eq!(core.sweep().geometries.len(), 1);
        assert!(core.geometry(id).is_none());
    }

    #[test]
    fn render_target_destroy_retires_its_parts() {
        let mut core = Core::new();
        let texture = core.insert_texture(8, 8, PixelFormat::Bgra8Unorm, ());
        let rb = core.insert_render_buffer(RenderBufferDesc { texture_id: texture, width: 8, height: 8 }, ());
        let id = core.insert_render_target(RenderTarget {
            width: 8,
            height: 8,
            texture_id: texture,
            render_buffer_id: rb,
            ..RenderTarget::empty()
        });
        core.set_render_target_id(id);
        assert_eq!(core.render_target(id).map(|t| t.id), Some(id));

        core.destroy(id.into());
        let garbage = core.sweep();
        assert_eq!(garbage.textures.len(), 1);
        assert_eq!(garbage.render_buffers.len(), 1);
        assert_eq!(core.render_target_count(), 0);
    }

    #[test]
    fn released_handles_are_destroyed_exactly_once() {
        let (mut core, id, _) = setup();
        let queue = core.release_queue();
        drop(Owned::new(id, queue.clone()));
        assert_eq!(queue.len(), 1);

        core.drain_releases();
        core.drain_releases();
        assert_eq!(core.sweep().geometries.len(), 1);
        assert_eq!(core.violation_count(), 0);
    }

    // ── violations ────────────────────────────────────────────────────────

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "already destroyed"))]
    fn drawing_destroyed_geometry_is_a_violation() {
        let (mut core, id, state) = setup();
        core.destroy(id.into());
        core.begin_synchronize();
        core.queue_draw(id, 0..6, &state);
        assert_eq!(core.violation_count(), 1);
        assert!(core.commands().is_empty());
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "synchronize bracket is open"))]
    fn nested_synchronize_is_a_violation() {
        let mut core = Core::new();
        core.begin_synchronize();
        core.begin_synchronize();
        assert_eq!(core.violation_count(), 1);
        assert!(core.is_synchronizing());
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "end_drawing called while"))]
    fn finishing_inside_a_bracket_still_flushes() {
        let (mut core, id, state) = setup();
        core.begin_synchronize();
        core.queue_draw(id, 0..6, &state);
        let commands = core.finish_commands();
        assert_eq!(commands.len(), 1);
        assert!(!core.is_synchronizing());
        assert_eq!(core.violation_count(), 1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "outside begin_synchronize"))]
    fn draw_outside_bracket_is_a_violation() {
        let (mut core, id, state) = setup();
        core.queue_draw(id, 0..6, &state);
        assert_eq!(core.violation_count(), 1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "exceeds the 6 indices"))]
    fn draw_past_index_count_is_a_violation() {
        let (mut core, id, state) = setup();
        core.begin_synchronize();
        core.queue_draw(id, 0..7, &state);
        assert_eq!(core.violation_count(), 1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "FillPath draws Path vertices"))]
    fn shader_vertex_format_mismatch_is_a_violation() {
        let (mut core, id, mut state) = setup();
        state.shader = ShaderType::FillPath;
        core.begin_synchronize();
        core.queue_draw(id, 0..6, &state);
        assert_eq!(core.violation_count(), 1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "cannot be destroyed"))]
    fn surface_cannot_be_destroyed() {
        let (mut core, _, state) = setup();
        core.destroy(state.render_buffer.into());
        assert_eq!(core.violation_count(), 1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "out of range for 3 vertices"))]
    fn out_of_range_index_is_a_violation() {
        let mut core = Core::new();
        let verts = [PathVertex::default(); 3];
        assert!(!core.check_indices(&VertexData::Path(&verts), &[0, 1, 3]));
        assert_eq!(core.violation_count(), 1);
    }
}
