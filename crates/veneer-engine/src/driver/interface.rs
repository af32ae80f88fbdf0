use std::ops::Range;

use crate::geometry::{GpuState, VertexData};
use crate::target::{Bitmap, PixelFormat, RenderBufferDesc, RenderTarget};

use super::{GeometryId, Owned, ReleaseQueue, RenderBufferId, RenderTargetId, TextureId};

/// Winding order the backend treats as front-facing in device space.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaceWinding {
    Clockwise,
    CounterClockwise,
}

impl FaceWinding {
    /// Index order for a quad whose vertices are laid out top-left,
    /// top-right, bottom-right, bottom-left.
    pub fn quad_indices(self) -> [u32; 6] {
        match self {
            FaceWinding::Clockwise => [0, 1, 2, 0, 2, 3],
            FaceWinding::CounterClockwise => [0, 2, 1, 0, 3, 2],
        }
    }
}

/// Backend-agnostic command protocol used by the paint pipeline.
///
/// Resource calls take effect immediately. `clear_render_buffer` and
/// `draw_geometry` are only valid inside a `begin_synchronize` /
/// `end_synchronize` bracket; they queue commands that the backend executes
/// in order when the frame is recorded.
///
/// Calls that break the contract (unknown or destroyed ids, draws outside a
/// bracket, nested brackets) panic under debug assertions and are counted
/// no-ops otherwise. Allocation failures return the null id and log.
pub trait GpuDriver {
    fn begin_synchronize(&mut self);
    fn end_synchronize(&mut self);

    fn create_geometry(&mut self, vertices: &VertexData<'_>, indices: &[u32]) -> GeometryId;
    fn update_geometry(&mut self, id: GeometryId, vertices: &VertexData<'_>, indices: &[u32]);
    fn destroy_geometry(&mut self, id: GeometryId);

    /// `pixels`, when given, holds tightly packed rows, top row first.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Option<&[u8]>,
    ) -> TextureId;
    fn update_texture(&mut self, id: TextureId, bitmap: &Bitmap);
    fn destroy_texture(&mut self, id: TextureId);

    /// Allocates a texture padded to [`render_target_alignment`](Self::render_target_alignment)
    /// plus a render buffer over it. Returns [`RenderTarget::empty`] on failure.
    fn create_render_target(&mut self, width: u32, height: u32) -> RenderTarget;
    fn destroy_render_target(&mut self, id: RenderTargetId);

    fn create_render_buffer(&mut self, desc: &RenderBufferDesc) -> RenderBufferId;
    fn destroy_render_buffer(&mut self, id: RenderBufferId);

    fn clear_render_buffer(&mut self, id: RenderBufferId, color: [f32; 4]);
    fn draw_geometry(&mut self, id: GeometryId, indices: Range<u32>, state: &GpuState);

    fn face_winding(&self) -> FaceWinding;
    /// Render buffer that presents to the window.
    fn surface_render_buffer(&self) -> RenderBufferId;
    /// Window surface size in device pixels.
    fn surface_size(&self) -> (u32, u32);
    fn render_target_alignment(&self) -> u32;

    /// Queue that [`Owned`] handles created by this driver release into.
    fn release_queue(&self) -> ReleaseQueue;

    fn create_owned_geometry(&mut self, vertices: &VertexData<'_>, indices: &[u32]) -> Owned<GeometryId> {
        let id = self.create_geometry(vertices, indices);
        Owned::new(id, self.release_queue())
    }

    fn create_owned_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Option<&[u8]>,
    ) -> Owned<TextureId> {
        let id = self.create_texture(width, height, format, pixels);
        Owned::new(id, self.release_queue())
    }

    fn create_owned_render_target(&mut self, width: u32, height: u32) -> (Owned<RenderTargetId>, RenderTarget) {
        let target = self.create_render_target(width, height);
        (Owned::new(target.id, self.release_queue()), target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(points: [[f32; 2]; 4], tri: &[u32]) -> f32 {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| points[i as usize]);
        (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
    }

    #[test]
    fn quad_indices_follow_winding() {
        // y-down device space: positive area is clockwise on screen
        let quad = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        let cw = FaceWinding::Clockwise.quad_indices();
        assert!(cw.chunks(3).all(|t| signed_area(quad, t) > 0.0));

        let ccw = FaceWinding::CounterClockwise.quad_indices();
        assert!(ccw.chunks(3).all(|t| signed_area(quad, t) < 0.0));
    }
}
