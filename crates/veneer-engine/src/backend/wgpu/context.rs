use std::collections::HashMap;
use std::ops::Range;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::backend::common::{allocate_render_target, scissor_rect};
use crate::backend::{FrameBegin, FrameClock, FrameLifecycle, FrameState, GpuContext};
use crate::driver::{
    Command, CommandList, DriverCore, FaceWinding, GeometryId, GpuDriver, Key, ReleaseQueue,
    RenderBufferId, RenderTargetId, TextureId,
};
use crate::geometry::{GpuState, Uniforms, VertexData, TEXTURE_SLOTS};
use crate::target::{Bitmap, PixelFormat, RenderBufferDesc, RenderTarget};

use super::pipeline::{PipelineKey, Pipelines};
use super::resources::{WgpuGeometry, WgpuRenderBuffer, WgpuTexture};
use super::surface::{self, SurfaceErrorAction};
use super::uniform_ring::UniformRing;
use super::WgpuInit;

type TextureSlots = [Option<TextureId>; TEXTURE_SLOTS];

/// Swapchain image held from `begin_drawing` until `present_frame`.
struct SurfaceFrame {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// Explicit-submission backend over wgpu.
///
/// Owns the device objects for one window surface. Queued commands are
/// encoded at `end_drawing` into one command buffer: a render pass per run
/// of commands with the same destination, split again at each clear.
pub struct WgpuContext<'w> {
    /// Surface bound to the window; the window must outlive the context.
    surface: wgpu::Surface<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Linear format the surface is rendered through.
    view_format: wgpu::TextureFormat,
    /// Current drawable size in physical pixels.
    size: PhysicalSize<u32>,

    pipelines: Pipelines,
    uniforms: UniformRing,
    sampler: wgpu::Sampler,
    /// Bound to empty texture slots.
    placeholder: wgpu::TextureView,

    core: DriverCore<WgpuGeometry, WgpuTexture, WgpuRenderBuffer>,
    lifecycle: FrameLifecycle,
    clock: FrameClock,
    frame: Option<SurfaceFrame>,
    frame_time: f32,
    scale: f64,
    /// Set by `set_scale`; the next `resize` reconfigures even at the same size.
    scale_stale: bool,
    render_target_alignment: u32,
}

impl<'w> WgpuContext<'w> {
    /// Creates a context bound to `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: WgpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let WgpuInit {
            prefer_srgb,
            present_mode,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
            render_target_alignment,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("veneer device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps, prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&surface_caps, alpha_mode);
        let view_format = surface::render_view_format(format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: if view_format == format { vec![] } else { vec![view_format] },
            desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        let info = adapter.get_info();
        log::info!("wgpu context on {} ({:?}), surface {format:?}", info.name, info.backend);

        let pipelines = Pipelines::new(&device);
        let uniforms = UniformRing::new(&device, pipelines.uniform_layout());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("veneer sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let placeholder = WgpuTexture::new(&device, 1, 1, PixelFormat::Bgra8Unorm);
        placeholder.write(&queue, &[255; 4], 4);

        let mut core = DriverCore::new();
        core.insert_surface(size.width, size.height, WgpuRenderBuffer::Surface);

        let mut lifecycle = FrameLifecycle::new();
        if let Err(violation) = lifecycle.initialize() {
            core.violation(violation);
        }

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            config,
            view_format,
            size,
            pipelines,
            uniforms,
            sampler,
            placeholder: placeholder.view,
            core,
            lifecycle,
            clock: FrameClock::new(),
            frame: None,
            frame_time: 0.0,
            scale: window.scale_factor(),
            scale_stale: false,
            render_target_alignment: render_target_alignment.max(1),
        })
    }

    /// [`new`](Self::new) driven to completion on the current thread.
    pub fn new_blocking(window: &'w Window, init: WgpuInit) -> Result<Self> {
        pollster::block_on(Self::new(window, init))
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Converts a `SurfaceError` into the action the context takes.
    fn handle_surface_error(&mut self, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        surface::map_surface_error(&self.surface, &self.device, &self.config, self.size, err)
    }

    /// Frees resources retired before the last flush.
    fn collect_garbage(&mut self) {
        let garbage = self.core.sweep();
        if !garbage.is_empty() {
            log::trace!(
                "freeing {} geometries, {} textures, {} render buffers",
                garbage.geometries.len(),
                garbage.textures.len(),
                garbage.render_buffers.len()
            );
        }
        // wgpu objects release on drop
        drop(garbage);
    }

    // ── flush ─────────────────────────────────────────────────────────────

    fn attachment_format(&self, render_buffer: RenderBufferId) -> Option<wgpu::TextureFormat> {
        match &self.core.render_buffer(render_buffer)?.native {
            WgpuRenderBuffer::Surface => Some(self.view_format),
            WgpuRenderBuffer::Texture { format, .. } => Some(*format),
        }
    }

    fn texture_bind_group(&self, slots: &TextureSlots) -> wgpu::BindGroup {
        let views: Vec<&wgpu::TextureView> = slots
            .iter()
            .map(|slot| {
                slot.and_then(|id| self.core.texture(id))
                    .map_or(&self.placeholder, |t| &t.native.view)
            })
            .collect();

        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = views
            .iter()
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: Pipelines::sampler_binding(),
            resource: wgpu::BindingResource::Sampler(&self.sampler),
        });

        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("veneer textures bind group"),
            layout: self.pipelines.texture_layout(),
            entries: &entries,
        })
    }

    /// Encodes and submits `commands`.
    fn execute(&mut self, commands: &CommandList) {
        if commands.is_empty() {
            return;
        }

        let scale = self.scale as f32;
        let blocks: Vec<Uniforms> = commands
            .iter()
            .filter_map(|command| match command {
                Command::DrawGeometry { state, .. } => {
                    Some(Uniforms::from_state(state, self.frame_time, scale, false))
                }
                Command::ClearRenderBuffer { .. } => None,
            })
            .collect();
        self.uniforms
            .upload(&self.device, &self.queue, self.pipelines.uniform_layout(), &blocks);

        let mut bind_groups: HashMap<TextureSlots, wgpu::BindGroup> = HashMap::new();
        for command in commands {
            let Command::DrawGeometry { state, .. } = command else { continue };
            if let Some(format) = self.attachment_format(state.render_buffer) {
                let key = PipelineKey { shader: state.shader, blend: state.blend, format };
                self.pipelines.ensure(&self.device, key);
            }
            if !bind_groups.contains_key(&state.textures) {
                let group = self.texture_bind_group(&state.textures);
                bind_groups.insert(state.textures, group);
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("veneer frame encoder"),
            });

        let mut draw_index = 0;
        for pass in commands.passes() {
            for segment in pass.chunk_by(|_, next| !matches!(next, Command::ClearRenderBuffer { .. })) {
                self.encode_pass(&mut encoder, segment, &bind_groups, &mut draw_index);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Encodes one render pass. `segment` shares a destination and only its
    /// first command may be a clear.
    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        segment: &[Command],
        bind_groups: &HashMap<TextureSlots, wgpu::BindGroup>,
        draw_index: &mut usize,
    ) {
        let draws = segment
            .iter()
            .filter(|c| matches!(c, Command::DrawGeometry { .. }))
            .count();
        let first_draw = *draw_index;
        *draw_index += draws;

        let Some(head) = segment.first() else { return };
        let Some(render_buffer) = self.core.render_buffer(head.render_buffer()) else { return };
        let (view, format, width, height) = match &render_buffer.native {
            WgpuRenderBuffer::Surface => match &self.frame {
                Some(frame) => (&frame.view, self.view_format, self.config.width, self.config.height),
                None => return,
            },
            WgpuRenderBuffer::Texture { view, format, width, height } => (view, *format, *width, *height),
        };

        let load = match head {
            Command::ClearRenderBuffer { color, .. } => wgpu::LoadOp::Clear(wgpu::Color {
                r: color[0] as f64,
                g: color[1] as f64,
                b: color[2] as f64,
                a: color[3] as f64,
            }),
            Command::DrawGeometry { .. } => wgpu::LoadOp::Load,
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("veneer pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let draws = segment.iter().filter_map(|command| match command {
            Command::DrawGeometry { geometry, indices, state } => Some((*geometry, indices, state)),
            Command::ClearRenderBuffer { .. } => None,
        });
        for (offset, (geometry, indices, state)) in draws.enumerate() {
            let Some(geometry) = self.core.geometry(geometry) else { continue };
            let key = PipelineKey { shader: state.shader, blend: state.blend, format };
            let Some(pipeline) = self.pipelines.get(&key) else { continue };
            let Some(textures) = bind_groups.get(&state.textures) else { continue };
            let Some((sx, sy, sw, sh)) = scissor_rect(state, width, height) else { continue };

            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, self.uniforms.bind_group(), &[UniformRing::offset(first_draw + offset)]);
            rpass.set_bind_group(1, textures, &[]);
            rpass.set_viewport(
                0.0,
                0.0,
                state.viewport_width.min(width) as f32,
                state.viewport_height.min(height) as f32,
                0.0,
                1.0,
            );
            rpass.set_scissor_rect(sx, sy, sw, sh);
            rpass.set_vertex_buffer(0, geometry.native.vertices.slice(..));
            rpass.set_index_buffer(geometry.native.indices.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(indices.clone(), 0, 0..1);
        }
    }
}

impl GpuDriver for WgpuContext<'_> {
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
        let native = WgpuGeometry::new(&self.device, vertices.as_bytes(), indices);
        self.core.insert_geometry(vertices, indices, native)
    }

    fn update_geometry(&mut self, id: GeometryId, vertices: &VertexData<'_>, indices: &[u32]) {
        if let Some(entry) = self.core.geometry_for_update(id, vertices, indices) {
            entry
                .native
                .write(&self.device, &self.queue, vertices.as_bytes(), indices);
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
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            log::error!("cannot allocate a {width}x{height} texture (max {max})");
            return TextureId::null();
        }
        if !self.core.check_texture_data(width, height, format, pixels) {
            return TextureId::null();
        }

        let native = WgpuTexture::new(&self.device, width, height, format);
        if let Some(pixels) = pixels {
            native.write(&self.queue, pixels, width * format.bytes_per_pixel());
        }
        self.core.insert_texture(width, height, format, native)
    }

    fn update_texture(&mut self, id: TextureId, bitmap: &Bitmap) {
        if let Some(entry) = self.core.texture_for_update(id, bitmap) {
            entry.native.write_bitmap(&self.queue, bitmap);
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
        let native = WgpuRenderBuffer::Texture {
            view: texture.native.view.clone(),
            format: texture.native.texture.format(),
            width: texture.width,
            height: texture.height,
        };
        self.core.insert_render_buffer(*desc, native)
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
        FaceWinding::Clockwise
    }

    fn surface_render_buffer(&self) -> RenderBufferId {
        self.core.surface()
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.size.width, self.size.height)
    }

    fn render_target_alignment(&self) -> u32 {
        self.render_target_alignment
    }

    fn release_queue(&self) -> ReleaseQueue {
        self.core.release_queue()
    }
}

impl GpuContext for WgpuContext<'_> {
    fn begin_drawing(&mut self) -> Result<FrameBegin> {
        if let Err(violation) = self.lifecycle.check_between_frames("begin_drawing") {
            self.core.violation(violation);
            return Ok(FrameBegin::Skipped);
        }

        self.core.drain_releases();
        self.collect_garbage();

        if self.size.width == 0 || self.size.height == 0 {
            return Ok(FrameBegin::Skipped);
        }

        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                return match self.handle_surface_error(err.clone()) {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        log::debug!("skipping frame: {err}");
                        Ok(FrameBegin::Skipped)
                    }
                    SurfaceErrorAction::Fatal => Err(anyhow::anyhow!("surface lost: {err}")),
                };
            }
        };
        if texture.suboptimal {
            log::debug!("surface texture is suboptimal; reconfigure on next resize");
        }
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor {
                format: Some(self.view_format),
                ..Default::default()
            });
        self.frame = Some(SurfaceFrame { texture, view });
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
        if let Some(frame) = self.frame.take() {
            drop(frame.view);
            frame.texture.present();
        }
    }

    fn abandon_frame(&mut self) {
        if let Err(violation) = self.lifecycle.abandon() {
            self.core.violation(violation);
            return;
        }
        // dropping an unpresented surface texture discards it
        self.frame = None;
        self.core.discard_commands();
        self.collect_garbage();
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Err(violation) = self.lifecycle.check_between_frames("resize") {
            self.core.violation(violation);
            return;
        }
        let new_size = PhysicalSize::new(width, height);
        if new_size == self.size && !self.scale_stale {
            return;
        }
        surface::apply_resize(&self.surface, &self.device, &mut self.config, &mut self.size, new_size);
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
