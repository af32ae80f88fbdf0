use core::ops::Mul;

use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;

/// Column-major 4x4 float matrix, laid out exactly as WGSL `mat4x4<f32>` and
/// GLSL std140 `mat4`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Matrix4x4 {
    pub cols: [[f32; 4]; 4],
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix4x4 {
    #[inline]
    pub const fn from_cols(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self::from_cols([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Maps device pixels (`0..width`, `0..height`, +Y down) to NDC.
    ///
    /// With `flip_y` the top row lands at NDC `y = -1` instead of `+1`. GL
    /// uses this for offscreen targets so their texel rows end up top-first,
    /// matching uploaded bitmaps and the wgpu backend.
    pub fn orthographic(width: f32, height: f32, flip_y: bool) -> Self {
        let w = width.max(1.0);
        let h = height.max(1.0);
        let (sy, ty) = if flip_y { (2.0 / h, -1.0) } else { (-2.0 / h, 1.0) };
        Self::from_cols([
            [2.0 / w, 0.0, 0.0, 0.0],
            [0.0, sy, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [-1.0, ty, 0.0, 1.0],
        ])
    }

    /// Transforms `(x, y, 0, 1)` and returns the resulting `(x, y)`.
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        let c = &self.cols;
        let x = c[0][0] * p.x + c[1][0] * p.y + c[3][0];
        let y = c[0][1] * p.x + c[1][1] * p.y + c[3][1];
        let w = c[0][3] * p.x + c[1][3] * p.y + c[3][3];
        if w != 0.0 && w != 1.0 {
            Vec2::new(x / w, y / w)
        } else {
            Vec2::new(x, y)
        }
    }
}

impl Mul for Matrix4x4 {
    type Output = Matrix4x4;

    fn mul(self, rhs: Matrix4x4) -> Matrix4x4 {
        let mut out = [[0.0f32; 4]; 4];
        for (col, out_col) in out.iter_mut().enumerate() {
            for (row, cell) in out_col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.cols[k][row] * rhs.cols[col][k]).sum();
            }
        }
        Matrix4x4::from_cols(out)
    }
}
