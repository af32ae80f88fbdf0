//! In-memory driver for tests that exercise the protocol without a GPU.

use std::ops::Range;

use crate::backend::common::allocate_render_target;
use crate::backend::FrameLifecycle;
use crate::geometry::{GpuState, Vertex, VertexData};
use crate::target::{Bitmap, PixelFormat, RenderBufferDesc, RenderTarget};

use super::{
    Command, DriverCore, FaceWinding, GeometryId, GpuDriver, Key, ReleaseQueue, RenderBufferId,
    RenderTargetId, TextureId,
};

/// Last data uploaded for a geometry.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordedGeometry {
    pub bytes: Vec<u8>,
    pub indices: Vec<u32>,
    /// Number of create/update uploads.
    pub uploads: u32,
}

/// [`GpuDriver`] over a [`DriverCore`] that keeps uploads in memory and
/// hands queued commands back to the test.
pub(crate) struct RecordingDriver {
    pub core: DriverCore<RecordedGeometry, (), ()>,
    winding: FaceWinding,
    alignment: u32,
    size: (u32, u32),
    /// When set, commands are only accepted inside a begun frame.
    frames: Option<FrameLifecycle>,
}

impl RecordingDriver {
    pub fn new(width: u32, height: u32) -> Self {
        let mut core = DriverCore::new();
        core.insert_surface(width, height, ());
        Self {
            core,
            winding: FaceWinding::Clockwise,
            alignment: 4,
            size: (width, height),
            frames: None,
        }
    }

    /// Gates commands on a frame cycle, as the backend contexts do.
    pub fn with_frames(mut self) -> Self {
        let mut frames = FrameLifecycle::new();
        if let Err(violation) = frames.initialize() {
            self.core.violation(violation);
        }
        self.frames = Some(frames);
        self
    }

    pub fn begin_frame(&mut self) {
        if let Some(Err(violation)) = self.frames.as_mut().map(FrameLifecycle::begin) {
            self.core.violation(violation);
        }
    }

    /// Ends and presents the current frame.
    pub fn end_frame(&mut self) {
        let result = self.frames.as_mut().map(|f| f.end().and_then(|()| f.present()));
        if let Some(Err(violation)) = result {
            self.core.violation(violation);
        }
    }

    fn check_drawing(&mut self, op: &'static str) -> bool {
        match self.frames.as_ref().map(|f| f.check_drawing(op)) {
            Some(Err(violation)) => {
                self.core.violation(violation);
                false
            }
            _ => true,
        }
    }

    pub fn with_winding(mut self, winding: FaceWinding) -> Self {
        self.winding = winding;
        self
    }

    pub fn with_alignment(mut self, alignment: u32) -> Self {
        self.alignment = alignment;
        self
    }

    /// Stand-in for `end_drawing`: returns the queued commands, then drains
    /// released handles and frees retired entries.
    pub fn flush(&mut self) -> Vec<Command> {
        let commands: Vec<Command> = self.core.take_commands().iter().cloned().collect();
        self.core.drain_releases();
        let _ = self.core.sweep();
        commands
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&RecordedGeometry> {
        self.core.geometry(id).map(|entry| &entry.native)
    }

    /// Uploaded fill vertices of `id`.
    pub fn fill_vertices(&self, id: GeometryId) -> Vec<Vertex> {
        self.geometry(id)
            .map(|g| {
                g.bytes
                    .chunks_exact(size_of::<Vertex>())
                    .map(bytemuck::pod_read_unaligned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GpuDriver for RecordingDriver {
    fn begin_synchronize(&mut self) {
        self.core.begin_synchronize();
    }

    fn end_synchronize(&mut self) {
        self.core.end_synchronize();
    }

    fn create_geometry(&mut self, vertices: &VertexData<'_>, indices: &[u32]) -> GeometryId {
        if !self.core.check_indices(vertices, indices) {
            return GeometryId::null();
        }
        let native = RecordedGeometry {
            bytes: vertices.as_bytes().to_vec(),
            indices: indices.to_vec(),
            uploads: 1,
        };
        self.core.insert_geometry(vertices, indices, native)
    }

    fn update_geometry(&mut self, id: GeometryId, vertices: &VertexData<'_>, indices: &[u32]) {
        if let Some(entry) = self.core.geometry_for_update(id, vertices, indices) {
            entry.native.bytes = vertices.as_bytes().to_vec();
            entry.native.indices = indices.to_vec();
            entry.native.uploads += 1;
        }
    }

    fn destroy_geometry(&mut self, id: GeometryId) {
        self.core.destroy(id.into());
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Option<&[u8]>,
    ) -> TextureId {
        if width == 0 || height == 0 || !self.core.check_texture_data(width, height, format, pixels) {
            return TextureId::null();
        }
        self.core.insert_texture(width, height, format, ())
    }

    fn update_texture(&mut self, id: TextureId, bitmap: &Bitmap) {
        let _ = self.core.texture_for_update(id, bitmap);
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.core.destroy(id.into());
    }

    fn create_render_target(&mut self, width: u32, height: u32) -> RenderTarget {
        let Some(mut target) = allocate_render_target(self, width, height) else {
            return RenderTarget::empty();
        };
        target.id = self.core.insert_render_target(target);
        self.core.set_render_target_id(target.id);
        target
    }

    fn destroy_render_target(&mut self, id: RenderTargetId) {
        self.core.destroy(id.into());
    }

    fn create_render_buffer(&mut self, desc: &RenderBufferDesc) -> RenderBufferId {
        if self.core.check_render_buffer_desc(desc).is_none() {
            return RenderBufferId::null();
        }
        self.core.insert_render_buffer(*desc, ())
    }

    fn destroy_render_buffer(&mut self, id: RenderBufferId) {
        self.core.destroy(id.into());
    }

    fn clear_render_buffer(&mut self, id: RenderBufferId, color: [f32; 4]) {
        if self.check_drawing("clear_render_buffer") {
            self.core.queue_clear(id, color);
        }
    }

    fn draw_geometry(&mut self, id: GeometryId, indices: Range<u32>, state: &GpuState) {
        if self.check_drawing("draw_geometry") {
            self.core.queue_draw(id, indices, state);
        }
    }

    fn face_winding(&self) -> FaceWinding {
        self.winding
    }

    fn surface_render_buffer(&self) -> RenderBufferId {
        self.core.surface()
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn render_target_alignment(&self) -> u32 {
        self.alignment
    }

    fn release_queue(&self) -> ReleaseQueue {
        self.core.release_queue()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{FillType, ShaderType};

    fn quad(driver: &mut RecordingDriver) -> GeometryId {
        let verts = [Vertex::new([0.0, 0.0], [255; 4], [0.0, 0.0], [0.0, 0.0], FillType::Solid); 4];
        let indices = driver.face_winding().quad_indices();
        driver.create_geometry(&VertexData::Fill(&verts), &indices)
    }

    // ── render targets ────────────────────────────────────────────────────

    #[test]
    fn render_target_is_padded_to_alignment() {
        let mut driver = RecordingDriver::new(800, 600).with_alignment(4);
        let target = driver.create_render_target(301, 301);

        assert!(!target.is_empty());
        assert_eq!((target.width, target.height), (301, 301));
        assert_eq!((target.texture_width, target.texture_height), (304, 304));
        assert_eq!(target.uv_coords.width(), 301.0 / 304.0);
        assert_eq!(target.uv_coords.height(), 301.0 / 304.0);
        assert_eq!(driver.core.render_target(target.id), Some(&target));
    }

    #[test]
    fn owned_render_target_releases_all_parts() {
        let mut driver = RecordingDriver::new(800, 600);
        let (handle, target) = driver.create_owned_render_target(64, 32);
        assert_eq!(driver.core.texture_count(), 1);

        drop(handle);
        driver.flush();
        assert_eq!(driver.core.render_target_count(), 0);
        assert_eq!(driver.core.texture_count(), 0);
        assert!(driver.core.render_buffer(target.render_buffer_id).is_none());
        assert_eq!(driver.core.violation_count(), 0);
    }

    #[test]
    fn zero_sized_render_target_is_empty() {
        let mut driver = RecordingDriver::new(800, 600);
        assert!(driver.create_render_target(0, 10).is_empty());
        assert_eq!(driver.core.texture_count(), 0);
    }

    // ── offscreen passes ──────────────────────────────────────────────────

    #[test]
    fn draws_into_a_render_target_then_the_surface() {
        let mut driver = RecordingDriver::new(200, 200);
        let target = driver.create_render_target(100, 100);
        let geometry = quad(&mut driver);

        driver.begin_synchronize();
        driver.clear_render_buffer(target.render_buffer_id, [0.0; 4]);
        driver.draw_geometry(geometry, 0..6, &GpuState::for_target(target.render_buffer_id, 100, 100));
        let mut composite = GpuState::for_target(driver.surface_render_buffer(), 200, 200);
        composite.textures[0] = Some(target.texture_id);
        driver.draw_geometry(geometry, 0..6, &composite);
        driver.end_synchronize();

        let commands = driver.flush();
        let destinations: Vec<_> = commands.iter().map(Command::render_buffer).collect();
        assert_eq!(
            destinations,
            [target.render_buffer_id, target.render_buffer_id, driver.surface_render_buffer()]
        );
    }

    // ── frames ────────────────────────────────────────────────────────────

    #[test]
    fn draws_inside_a_frame_are_accepted() {
        let mut driver = RecordingDriver::new(100, 100).with_frames();
        let geometry = quad(&mut driver);
        let state = GpuState::for_target(driver.surface_render_buffer(), 100, 100);

        driver.begin_frame();
        driver.begin_synchronize();
        driver.clear_render_buffer(driver.surface_render_buffer(), [0.0; 4]);
        driver.draw_geometry(geometry, 0..6, &state);
        driver.end_synchronize();
        driver.end_frame();
        assert_eq!(driver.flush().len(), 2);
        assert_eq!(driver.core.violation_count(), 0);
    }

    #[test]
    #[cfg_attr(
        debug_assertions,
        should_panic(expected = "draw_geometry is not valid while the frame is Ready")
    )]
    fn draws_after_a_skipped_frame_do_not_carry_over() {
        let mut driver = RecordingDriver::new(100, 100).with_frames();
        let stale = quad(&mut driver);
        let state = GpuState::for_target(driver.surface_render_buffer(), 100, 100);

        // no begin_frame: the host draws although the frame was skipped
        driver.begin_synchronize();
        driver.draw_geometry(stale, 0..6, &state);
        driver.end_synchronize();
        driver.destroy_geometry(stale);
        assert!(driver.core.commands().is_empty());
        assert!(driver.flush().is_empty());
        assert!(driver.geometry(stale).is_none());

        driver.begin_frame();
        let fresh = quad(&mut driver);
        driver.begin_synchronize();
        driver.draw_geometry(fresh, 0..6, &state);
        driver.end_synchronize();
        driver.end_frame();
        let commands = driver.flush();
        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], Command::DrawGeometry { geometry, .. } if geometry == fresh));
        assert_eq!(driver.core.violation_count(), 1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "not a live resource"))]
    fn path_geometry_rejects_unknown_ids() {
        let mut driver = RecordingDriver::new(10, 10);
        let mut state = GpuState::for_target(driver.surface_render_buffer(), 10, 10);
        state.shader = ShaderType::FillPath;
        driver.begin_synchronize();
        driver.draw_geometry(GeometryId::null(), 0..3, &state);
        assert_eq!(driver.core.violation_count(), 1);
    }
}
