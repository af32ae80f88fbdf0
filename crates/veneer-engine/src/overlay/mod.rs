//! Overlay compositor.
//!
//! An [`Overlay`] places a rendered view's [`RenderTarget`] on the window
//! surface as one textured quad.

use crate::coords::{IntRect, Rect};
use crate::driver::{FaceWinding, GeometryId, GpuDriver, Owned, TextureId};
use crate::geometry::{BlendMode, FillType, GpuState, ShaderType, Vertex, VertexData};
use crate::paint::Color;
use crate::target::RenderTarget;

/// Positioned quad that blits a render target onto the window surface.
///
/// Bounds are in device pixels. Geometry is rebuilt lazily: moves and
/// resizes only mark the quad dirty, and the next [`draw`](Self::draw)
/// re-uploads it. Dropping the overlay releases its geometry.
pub struct Overlay {
    bounds: IntRect,
    scale: f64,
    geometry: Option<Owned<GeometryId>>,
    vertices: [Vertex; 4],
    indices: [u32; 6],
    state: GpuState,
    needs_update: bool,
    /// Inputs the uploaded quad was built from.
    uv_coords: Rect,
    texture: Option<TextureId>,
    winding: Option<FaceWinding>,
    focused: bool,
    hovered: bool,
}

impl Overlay {
    pub fn new(x: i32, y: i32, width: u32, height: u32, scale: f64) -> Self {
        Self {
            bounds: IntRect::from_xywh(x, y, width, height),
            scale,
            geometry: None,
            vertices: [Vertex::default(); 4],
            indices: [0; 6],
            state: GpuState {
                shader: ShaderType::Fill,
                blend: BlendMode::SourceOver,
                ..GpuState::default()
            },
            needs_update: true,
            uv_coords: Rect::default(),
            texture: None,
            winding: None,
            focused: false,
            hovered: false,
        }
    }

    #[inline]
    pub fn bounds(&self) -> IntRect {
        self.bounds
    }

    /// Device scale of the view the overlay shows. Bounds are already in
    /// device pixels, so the quad does not use it; the view owner reads it
    /// to size its render target.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Current geometry id, null before the first draw.
    pub fn geometry_id(&self) -> GeometryId {
        self.geometry.as_ref().map(Owned::id).unwrap_or_default()
    }

    pub fn move_to(&mut self, x: i32, y: i32) {
        self.bounds = IntRect::from_xywh(x, y, self.bounds.width(), self.bounds.height());
        self.needs_update = true;
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.bounds = self.bounds.translated(dx, dy);
        self.needs_update = true;
    }

    /// Changes the quad size. The owner of the rendered view resizes its
    /// render target to match.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.bounds = IntRect::from_xywh(self.bounds.left, self.bounds.top, width, height);
        self.needs_update = true;
    }

    /// Hit test in device pixels, half-open on the right and bottom edges.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.bounds.contains(x, y)
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Queues the composite draw of `target` onto the window surface.
    ///
    /// Must be called inside the driver's synchronize bracket.
    pub fn draw(&mut self, driver: &mut dyn GpuDriver, target: &RenderTarget) {
        if target.is_empty() {
            log::debug!("overlay at {:?} has no render target to draw", self.bounds);
            return;
        }

        let winding = driver.face_winding();
        let stale = self.needs_update
            || self.uv_coords != target.uv_coords
            || self.texture != Some(target.texture_id)
            || self.winding != Some(winding);
        if stale {
            self.rebuild(target, winding);
            if !self.upload(driver) {
                return;
            }
            self.uv_coords = target.uv_coords;
            self.texture = Some(target.texture_id);
            self.winding = Some(winding);
            self.needs_update = false;
        }

        let (surface_width, surface_height) = driver.surface_size();
        self.state.render_buffer = driver.surface_render_buffer();
        self.state.viewport_width = surface_width;
        self.state.viewport_height = surface_height;
        self.state.textures[0] = Some(target.texture_id);

        let id = self.geometry_id();
        driver.draw_geometry(id, 0..self.indices.len() as u32, &self.state);
    }

    /// Rebuilds the quad vertices: top-left, top-right, bottom-right,
    /// bottom-left.
    fn rebuild(&mut self, target: &RenderTarget, winding: FaceWinding) {
        let b = self.bounds.to_rect();
        let uv = target.uv_coords;
        let color = Color::WHITE.to_rgba8();
        let (w, h) = (b.width(), b.height());

        let corner = |pos: [f32; 2], tex: [f32; 2], obj: [f32; 2]| {
            Vertex::new(pos, color, tex, obj, FillType::Image)
        };
        self.vertices = [
            corner([b.left, b.top], [uv.left, uv.top], [0.0, 0.0]),
            corner([b.right, b.top], [uv.right, uv.top], [w, 0.0]),
            corner([b.right, b.bottom], [uv.right, uv.bottom], [w, h]),
            corner([b.left, b.bottom], [uv.left, uv.bottom], [0.0, h]),
        ];
        self.indices = winding.quad_indices();
    }

    /// Creates the geometry on first use and updates it afterwards.
    fn upload(&mut self, driver: &mut dyn GpuDriver) -> bool {
        let data = VertexData::Fill(&self.vertices);
        if let Some(geometry) = self.geometry.as_ref().filter(|g| !g.is_null()) {
            driver.update_geometry(geometry.id(), &data, &self.indices);
            return true;
        }

        let geometry = driver.create_owned_geometry(&data, &self.indices);
        if geometry.is_null() {
            log::error!("overlay at {:?} could not allocate its quad", self.bounds);
            return false;
        }
        self.geometry = Some(geometry);
        true
    }
}
