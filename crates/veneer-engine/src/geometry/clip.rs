use crate::coords::Rect;
use crate::math::{Matrix, Matrix4x4};

/// Maximum nested clips evaluated per draw call.
///
/// Bounds the size of the `Uniforms` block; shaders loop up to this count.
pub const MAX_CLIPS: usize = 8;

/// One clip region: a rounded rect in its own local space, plus the
/// transform from paint space (vertex `pos`) into that local space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClipEntry {
    pub to_local: Matrix,
    pub rect: Rect,
    /// Corner radii: top-left, top-right, bottom-right, bottom-left.
    pub radii: [f32; 4],
}

impl ClipEntry {
    /// Axis-aligned clip in paint space.
    pub fn rect(rect: Rect) -> Self {
        Self { to_local: Matrix::identity(), rect, radii: [0.0; 4] }
    }

    /// Clip to `rect` drawn under `transform`.
    ///
    /// Returns `None` when `transform` is singular: nothing drawn under it
    /// has area, so the caller drops the draw instead of clipping.
    pub fn transformed(rect: Rect, radii: [f32; 4], transform: &Matrix) -> Option<Self> {
        let to_local = transform.inverse()?;
        Some(Self { to_local, rect, radii })
    }

    /// Packs into the shader form:
    /// col0 = (a, b, c, d), col1 = (e, f, 0, 0), col2 = rect (x, y, w, h),
    /// col3 = radii.
    pub fn to_matrix4x4(&self) -> Matrix4x4 {
        let m = &self.to_local;
        Matrix4x4::from_cols([
            [m.a, m.b, m.c, m.d],
            [m.e, m.f, 0.0, 0.0],
            self.rect.to_xywh(),
            self.radii,
        ])
    }
}

/// Fixed-capacity clip stack carried by `GpuState`.
///
/// Pushing past `MAX_CLIPS` drops the clip and logs a warning; the count
/// never exceeds the array.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClipStack {
    entries: [ClipEntry; MAX_CLIPS],
    len: usize,
}

impl Default for ClipStack {
    fn default() -> Self {
        Self {
            entries: [ClipEntry::rect(Rect::default()); MAX_CLIPS],
            len: 0,
        }
    }
}

impl ClipStack {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a stack from `clips`, keeping the first `MAX_CLIPS`.
    pub fn from_slice(clips: &[ClipEntry]) -> Self {
        let mut stack = Self::new();
        for clip in clips {
            stack.push(*clip);
        }
        stack
    }

    /// Returns `false` (and drops `clip`) when the stack is full.
    pub fn push(&mut self, clip: ClipEntry) -> bool {
        if self.len == MAX_CLIPS {
            log::warn!("clip stack full ({MAX_CLIPS}); dropping nested clip");
            return false;
        }
        self.entries[self.len] = clip;
        self.len += 1;
        true
    }

    #[inline]
    pub fn pop(&mut self) -> Option<ClipEntry> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.entries[self.len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[ClipEntry] {
        &self.entries[..self.len]
    }
}
