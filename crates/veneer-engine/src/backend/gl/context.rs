use std::ops::Range;
use std::rc::Rc;

use anyhow::{Context as _, Result, anyhow};
use glow::HasContext;

use crate::backend::common::{allocate_render_target, gl_scissor, scissor_rect};
use crate::backend::{FrameBegin, FrameClock, FrameLifecycle, FrameState, GpuContext};
use crate::driver::{
    Command, CommandList, DriverCore, FaceWinding, GeometryId, GpuDriver, Key, ReleaseQueue,
    RenderBufferId, RenderTargetId, TextureId,
};
use crate::geometry::{BlendMode, GpuState, Uniforms, VertexData};
use crate::target::{Bitmap, PixelFormat, RenderBufferDesc, RenderTarget};

use super::program::{Programs, UNIFORMS_BINDING};
use super::resources::{GlGeometry, GlRenderBuffer, GlTexture};
use super::{GlInit, GlSurface};

/// Destination bound for the draws that follow.
#[derive(Debug, Copy, Clone)]
struct BoundTarget {
    id: RenderBufferId,
    width: u32,
    height: u32,
    /// Offscreen framebuffer, drawn Y-flipped.
    flipped: bool,
}

/// Immediate-mode backend over OpenGL 3.3 core.
///
/// Queued commands are replayed at `end_drawing` as plain GL calls. The
/// GL context must be current on this thread while the `GlContext` lives.
pub struct GlContext {
    gl: Rc<glow::Context>,
    surface: Box<dyn GlSurface>,
    programs: Programs,
    /// Rewritten before every draw.
    ubo: glow::Buffer,
    max_texture_size: u32,

    core: DriverCore<GlGeometry, GlTexture, GlRenderBuffer>,
    lifecycle: FrameLifecycle,
    clock: FrameClock,
    frame_time: f32,
    size: (u32, u32),
    scale: f64,
    scale_stale: bool,
    render_target_alignment: u32,
}

impl GlContext {
    /// Builds the programs and registers the host surface as the default
    /// framebuffer of `width` x `height` device pixels.
    pub fn new(
        gl: Rc<glow::Context>,
        surface: Box<dyn GlSurface>,
        width: u32,
        height: u32,
        scale: f64,
        init: GlInit,
    ) -> Result<Self> {
        let version = gl.version();
        anyhow::ensure!(
            !version.is_embedded && (version.major, version.minor) >= (3, 3),
            "OpenGL 3.3 core required, found {}.{}",
            version.major,
            version.minor
        );
        log::info!("gl context: OpenGL {}.{} {}", version.major, version.minor, version.vendor_info);

        let programs = Programs::new(&gl).context("failed to build GL programs")?;
        let ubo = match unsafe { gl.create_buffer() } {
            Ok(ubo) => ubo,
            Err(err) => {
                programs.delete(&gl);
                return Err(anyhow!(err)).context("failed to create uniform buffer");
            }
        };
        let max_texture_size = unsafe { gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE) }.max(0) as u32;

        if let Err(err) = surface.set_swap_interval(init.vsync) {
            log::warn!("could not set swap interval: {err:#}");
        }

        let mut core = DriverCore::new();
        core.insert_surface(width, height, GlRenderBuffer::Surface);

        let mut lifecycle = FrameLifecycle::new();
        if let Err(violation) = lifecycle.initialize() {
            core.violation(violation);
        }

        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };

        Ok(Self {
            gl,
            surface,
            programs,
            ubo,
            max_texture_size,
            core,
            lifecycle,
            clock: FrameClock::new(),
            frame_time: 0.0,
            size: (width, height),
            scale,
            scale_stale: false,
            render_target_alignment: init.render_target_alignment.max(1),
        })
    }

    /// Shared handle to the GL function table.
    pub fn gl(&self) -> &Rc<glow::Context> {
        &self.gl
    }

    fn collect_garbage(&mut self) {
        let garbage = self.core.sweep();
        if garbage.is_empty() {
            return;
        }
        log::trace!(
            "deleting {} geometries, {} textures, {} framebuffers",
            garbage.geometries.len(),
            garbage.textures.len(),
            garbage.render_buffers.len()
        );
        for geometry in garbage.geometries {
            geometry.delete(&self.gl);
        }
        for render_buffer in garbage.render_buffers {
            render_buffer.delete(&self.gl);
        }
        for texture in garbage.textures {
            texture.delete(&self.gl);
        }
    }

    // ── flush ─────────────────────────────────────────────────────────────

    /// Replays `commands` in order.
    fn execute(&self, commands: &CommandList) {
        if commands.is_empty() {
            return;
        }
        let gl = &self.gl;
        unsafe {
            gl.disable(glow::DEPTH_TEST);
            gl.disable(glow::CULL_FACE);
            // output stays linear, like the wgpu surface view
            gl.disable(glow::FRAMEBUFFER_SRGB);
            gl.enable(glow::SCISSOR_TEST);
            gl.bind_buffer_base(glow::UNIFORM_BUFFER, UNIFORMS_BINDING, Some(self.ubo));
        }

        let mut bound: Option<BoundTarget> = None;
        for command in commands {
            let Some(target) = self.bind_target(command.render_buffer(), &mut bound) else {
                continue;
            };
            match command {
                Command::ClearRenderBuffer { color, .. } => unsafe {
                    gl.disable(glow::SCISSOR_TEST);
                    gl.clear_color(color[0], color[1], color[2], color[3]);
                    gl.clear(glow::COLOR_BUFFER_BIT);
                    gl.enable(glow::SCISSOR_TEST);
                },
                Command::DrawGeometry { geometry, indices, state } => {
                    self.draw(target, *geometry, indices, state);
                }
            }
        }

        unsafe {
            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.disable(glow::SCISSOR_TEST);
        }
    }

    /// Binds the framebuffer for `id` unless it is already bound.
    fn bind_target(&self, id: RenderBufferId, bound: &mut Option<BoundTarget>) -> Option<BoundTarget> {
        if let Some(target) = bound.filter(|t| t.id == id) {
            return Some(target);
        }
        let entry = self.core.render_buffer(id)?;
        let (fbo, width, height, flipped) = match &entry.native {
            GlRenderBuffer::Surface => (None, self.size.0, self.size.1, false),
            GlRenderBuffer::Framebuffer { fbo, width, height } => (Some(*fbo), *width, *height, true),
        };
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, fbo) };
        let target = BoundTarget { id, width, height, flipped };
        *bound = Some(target);
        Some(target)
    }

    fn draw(&self, target: BoundTarget, geometry: GeometryId, indices: &Range<u32>, state: &GpuState) {
        let Some(geometry) = self.core.geometry(geometry) else { return };
        let Some(rect) = scissor_rect(state, target.width, target.height) else { return };
        let gl = &self.gl;

        let uniforms = Uniforms::from_state(state, self.frame_time, self.scale as f32, target.flipped);
        let viewport_width = state.viewport_width.min(target.width);
        let viewport_height = state.viewport_height.min(target.height);
        // GL viewports are bottom-left anchored; flipped targets already
        // store the top row first.
        let viewport_y = if target.flipped { 0 } else { target.height - viewport_height };
        let (sx, sy, sw, sh) = gl_scissor(rect, target.height, target.flipped);

        unsafe {
            gl.bind_buffer(glow::UNIFORM_BUFFER, Some(self.ubo));
            gl.buffer_data_u8_slice(glow::UNIFORM_BUFFER, uniforms.as_bytes(), glow::STREAM_DRAW);
            gl.bind_buffer(glow::UNIFORM_BUFFER, None);

            gl.use_program(Some(self.programs.get(state.shader)));
            for (unit, slot) in state.textures.iter().enumerate() {
                let texture = slot
                    .and_then(|id| self.core.texture(id))
                    .map(|entry| entry.native.texture);
                gl.active_texture(glow::TEXTURE0 + unit as u32);
                gl.bind_texture(glow::TEXTURE_2D, texture);
            }

            match state.blend {
                BlendMode::Replace => gl.disable(glow::BLEND),
                BlendMode::SourceOver => {
                    gl.enable(glow::BLEND);
                    gl.blend_func_separate(
                        glow::ONE,
                        glow::ONE_MINUS_SRC_ALPHA,
                        glow::ONE,
                        glow::ONE_MINUS_SRC_ALPHA,
                    );
                }
            }

            gl.viewport(0, viewport_y as i32, viewport_width as i32, viewport_height as i32);
            gl.scissor(sx, sy, sw, sh);
            gl.bind_vertex_array(Some(geometry.native.vao));
            gl.draw_elements(
                glow::TRIANGLES,
                indices.len() as i32,
                glow::UNSIGNED_INT,
                (indices.start as usize * size_of::<u32>()) as i32,
            );
        }
    }
}

impl Drop for GlContext {
    fn drop(&mut self) {
        let garbage = self.core.drain_all();
        for geometry in garbage.geometries {
            geometry.delete(&self.gl);
        }
        for render_buffer in garbage.render_buffers {
            render_buffer.delete(&self.gl);
        }
        for texture in garbage.textures {
            texture.delete(&self.gl);
        }
        self.programs.delete(&self.gl);
        unsafe { self.gl.delete_buffer(self.ubo) };
    }
}

impl GpuDriver for GlContext {
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
        match GlGeometry::new(&self.gl, vertices.format(), vertices.as_bytes(), indices) {
            Ok(native) => self.core.insert_geometry(vertices, indices, native),
            Err(err) => {
                log::error!("cannot allocate geometry: {err}");
                GeometryId::null()
            }
        }
    }

    fn update_geometry(&mut self, id: GeometryId, vertices: &VertexData<'_>, indices: &[u32]) {
        if let Some(entry) = self.core.geometry_for_update(id, vertices, indices) {
            entry.native.write(&self.gl, vertices.as_bytes(), indices);
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
        let max = self.max_texture_size;
        if width == 0 || height == 0 || width > max || height > max {
            log::error!("cannot allocate a {width}x{height} texture (max {max})");
            return TextureId::null();
        }
        if !self.core.check_texture_data(width, height, format, pixels) {
            return TextureId::null();
        }
        match GlTexture::new(&self.gl, width, height, format, pixels) {
            Ok(native) => self.core.insert_texture(width, height, format, native),
            Err(err) => {
                log::error!("cannot allocate a {width}x{height} texture: {err}");
                TextureId::null()
            }
        }
    }

    fn update_texture(&mut self, id: TextureId, bitmap: &Bitmap) {
        if let Some(entry) = self.core.texture_for_update(id, bitmap) {
            entry.native.write_bitmap(&self.gl, bitmap);
        }
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
        let Some(texture) = self.core.check_render_buffer_desc(desc) else {
            return RenderBufferId::null();
        };
        let (texture, width, height) = (texture.native.texture, texture.width, texture.height);
        match GlRenderBuffer::framebuffer(&self.gl, texture, width, height) {
            Ok(native) => self.core.insert_render_buffer(*desc, native),
            Err(err) => {
                log::error!("cannot create render buffer: {err}");
                RenderBufferId::null()
            }
        }
    }

    fn destroy_render_buffer(&mut self, id: RenderBufferId) {
        self.core.destroy(id.into());
    }

    fn clear_render_buffer(&mut self, id: RenderBufferId, color: [f32; 4]) {
        if let Err(violation) = self.lifecycle.check_drawing("clear_render_buffer") {
            self.core.violation(violation);
            return;
        }
        self.core.queue_clear(id, color);
    }

    fn draw_geometry(&mut self, id: GeometryId, indices: Range<u32>, state: &GpuState) {
        if let Err(violation) = self.lifecycle.check_drawing("draw_geometry") {
            self.core.violation(violation);
            return;
        }
        self.core.queue_draw(id, indices, state);
    }

    fn face_winding(&self) -> FaceWinding {
        FaceWinding::CounterClockwise
    }

    fn surface_render_buffer(&self) -> RenderBufferId {
        self.core.surface()
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn render_target_alignment(&self) -> u32 {
        self.render_target_alignment
    }

    fn release_queue(&self) -> ReleaseQueue {
        self.core.release_queue()
    }
}

impl GpuContext for GlContext {
    fn begin_drawing(&mut self) -> Result<FrameBegin> {
        if let Err(violation) = self.lifecycle.check_between_frames("begin_drawing") {
            self.core.violation(violation);
            return Ok(FrameBegin::Skipped);
        }

        self.core.drain_releases();
        self.collect_garbage();

        if self.size.0 == 0 || self.size.1 == 0 {
            return Ok(FrameBegin::Skipped);
        }

        self.frame_time = self.clock.tick().elapsed;
        if let Err(violation) = self.lifecycle.begin() {
            self.core.violation(violation);
        }
        Ok(FrameBegin::Started)
    }

    fn end_drawing(&mut self) {
        if let Err(violation) = self.lifecycle.end() {
            self.core.violation(violation);
            return;
        }
        let commands = self.core.finish_commands();
        self.execute(&commands);
        drop(commands);
        self.collect_garbage();
    }

    fn present_frame(&mut self) {
        if let Err(violation) = self.lifecycle.present() {
            self.core.violation(violation);
            return;
        }
        if let Err(err) = self.surface.swap_buffers() {
            log::error!("swap_buffers failed: {err:#}");
        }
    }

    fn abandon_frame(&mut self) {
        if let Err(violation) = self.lifecycle.abandon() {
            self.core.violation(violation);
            return;
        }
        self.core.discard_commands();
        self.collect_garbage();
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Err(violation) = self.lifecycle.check_between_frames("resize") {
            self.core.violation(violation);
            return;
        }
        if (width, height) == self.size && !self.scale_stale {
            return;
        }
        self.size = (width, height);
        if let Some(entry) = self.core.surface_entry_mut() {
            entry.desc.width = width;
            entry.desc.height = height;
        }
        self.scale_stale = false;
        log::debug!("surface resized to {width}x{height} at scale {}", self.scale);
    }

    fn set_scale(&mut self, scale: f64) {
        if let Err(violation) = self.lifecycle.check_between_frames("set_scale") {
            self.core.violation(violation);
            return;
        }
        if !(scale.is_finite() && scale > 0.0) {
            log::warn!("ignoring invalid device scale {scale}");
            return;
        }
        if scale != self.scale {
            self.scale = scale;
            self.scale_stale = true;
        }
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    fn state(&self) -> FrameState {
        self.lifecycle.state()
    }

    fn violation_count(&self) -> u64 {
        self.core.violation_count()
    }
}
