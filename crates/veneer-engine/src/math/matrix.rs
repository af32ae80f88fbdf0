use std::hash::{Hash, Hasher};

use crate::coords::{Rect, Vec2};

use super::Matrix4x4;

/// Determinant magnitude below which a matrix is treated as singular.
pub const MATRIX_EPSILON: f64 = 1e-6;

/// 2D affine transform in `(a, b, c, d, e, f)` form.
///
/// Maps `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`. The default value is
/// the identity.
///
/// Equality and hashing compare the raw bits of the six components (with
/// `-0.0` folded into `0.0`), so a `Matrix` is usable as a cache key for
/// deduplicating identical transforms across draws.
#[derive(Debug, Copy, Clone)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    #[inline]
    pub const fn translation(x: f32, y: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    #[inline]
    pub const fn scaling(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `degrees`, clockwise on screen (+Y down).
    pub fn rotation(degrees: f32) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Returns `self * rhs`: the transform that applies `rhs` first, then `self`.
    pub fn concat(&self, rhs: &Matrix) -> Matrix {
        Matrix::new(
            self.a * rhs.a + self.c * rhs.b,
            self.b * rhs.a + self.d * rhs.b,
            self.a * rhs.c + self.c * rhs.d,
            self.b * rhs.c + self.d * rhs.d,
            self.a * rhs.e + self.c * rhs.f + self.e,
            self.b * rhs.e + self.d * rhs.f + self.f,
        )
    }

    /// Appends `next` so it is applied after the current transform.
    #[inline]
    pub fn apply(&mut self, next: &Matrix) {
        *self = next.concat(self);
    }

    #[inline]
    pub fn translate(&mut self, x: f32, y: f32) {
        self.apply(&Matrix::translation(x, y));
    }

    #[inline]
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.apply(&Matrix::scaling(sx, sy));
    }

    #[inline]
    pub fn rotate(&mut self, degrees: f32) {
        self.apply(&Matrix::rotation(degrees));
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.a as f64 * self.d as f64 - self.b as f64 * self.c as f64
    }

    /// Returns the inverse, or `None` when `|det| < MATRIX_EPSILON`.
    ///
    /// Singular transforms (zero scale, collapsed axes) are ordinary input;
    /// callers skip whatever needed the inverse.
    pub fn inverse(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det.abs() < MATRIX_EPSILON {
            return None;
        }

        let inv = 1.0 / det;
        let (a, b, c, d, e, f) = (
            self.a as f64,
            self.b as f64,
            self.c as f64,
            self.d as f64,
            self.e as f64,
            self.f as f64,
        );

        Some(Matrix::new(
            (d * inv) as f32,
            (-b * inv) as f32,
            (-c * inv) as f32,
            (a * inv) as f32,
            ((c * f - d * e) * inv) as f32,
            ((b * e - a * f) * inv) as f32,
        ))
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.is_identity_or_translation() && self.e == 0.0 && self.f == 0.0
    }

    #[inline]
    pub fn is_identity_or_translation(&self) -> bool {
        self.a == 1.0 && self.b == 0.0 && self.c == 0.0 && self.d == 1.0
    }

    /// Identity, translation, or a non-negative uniform scale (plus translation).
    ///
    /// Backends use this to map points with a multiply-add instead of a
    /// full matrix product.
    #[inline]
    pub fn is_simple(&self) -> bool {
        self.b == 0.0 && self.c == 0.0 && self.a == self.d && self.a >= 0.0
    }

    #[inline]
    pub fn map_point(&self, p: Vec2) -> Vec2 {
        if self.is_simple() {
            return Vec2::new(p.x * self.a + self.e, p.y * self.a + self.f);
        }
        Vec2::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Axis-aligned bounds of `rect` after transformation.
    pub fn map_rect(&self, rect: Rect) -> Rect {
        let corners = [
            self.map_point(Vec2::new(rect.left, rect.top)),
            self.map_point(Vec2::new(rect.right, rect.top)),
            self.map_point(Vec2::new(rect.right, rect.bottom)),
            self.map_point(Vec2::new(rect.left, rect.bottom)),
        ];
        let mut out = Rect::new(corners[0].x, corners[0].y, corners[0].x, corners[0].y);
        for p in &corners[1..] {
            out.left = out.left.min(p.x);
            out.top = out.top.min(p.y);
            out.right = out.right.max(p.x);
            out.bottom = out.bottom.max(p.y);
        }
        out
    }

    /// Column-major 4x4 form for shader upload.
    pub fn to_matrix4x4(&self) -> Matrix4x4 {
        Matrix4x4::from_cols([
            [self.a, self.b, 0.0, 0.0],
            [self.c, self.d, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [self.e, self.f, 0.0, 1.0],
        ])
    }

    /// Component-wise comparison with an absolute tolerance.
    pub fn approx_eq(&self, other: &Matrix, tolerance: f32) -> bool {
        self.components()
            .iter()
            .zip(other.components().iter())
            .all(|(x, y)| (x - y).abs() <= tolerance)
    }

    #[inline]
    pub fn components(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    #[inline]
    fn key_bits(&self) -> [u32; 6] {
        // `+ 0.0` folds -0.0 into 0.0 so both compare and hash equal.
        self.components().map(|v| (v + 0.0).to_bits())
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.key_bits() == other.key_bits()
    }
}

impl Eq for Matrix {}

impl Hash for Matrix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const TOL: f32 = 1e-4;

    fn samples() -> Vec<Matrix> {
        let mut rotated = Matrix::rotation(33.0);
        rotated.translate(12.5, -40.0);
        let mut skewed = Matrix::new(1.0, 0.3, -0.7, 2.0, 5.0, 9.0);
        skewed.scale(0.5, 3.0);
        vec![
            Matrix::identity(),
            Matrix::translation(10.0, -3.0),
            Matrix::scaling(2.0, 2.0),
            Matrix::scaling(-1.0, 4.0),
            rotated,
            skewed,
        ]
    }

    // ── classification ────────────────────────────────────────────────────

    #[test]
    fn default_is_identity() {
        let m = Matrix::default();
        assert!(m.is_identity());
        assert!(m.is_identity_or_translation());
        assert!(m.is_simple());
    }

    #[test]
    fn translate_is_translation_but_not_identity() {
        let mut m = Matrix::default();
        m.translate(10.0, 0.0);
        assert!(!m.is_identity());
        assert!(m.is_identity_or_translation());
        assert!(m.is_simple());
    }

    #[test]
    fn uniform_scale_is_simple_only_when_non_negative() {
        assert!(Matrix::scaling(3.0, 3.0).is_simple());
        assert!(!Matrix::scaling(-3.0, -3.0).is_simple());
        assert!(!Matrix::scaling(2.0, 3.0).is_simple());
        assert!(!Matrix::rotation(45.0).is_simple());
    }

    // ── inversion ─────────────────────────────────────────────────────────

    #[test]
    fn apply_inverse_reconstructs_identity() {
        for m in samples() {
            let inv = m.inverse().expect("sample matrices are invertible");
            let mut round_trip = m;
            round_trip.apply(&inv);
            assert!(
                round_trip.approx_eq(&Matrix::identity(), TOL),
                "{m:?} * inverse = {round_trip:?}"
            );
        }
    }

    #[test]
    fn inverse_fails_for_singular() {
        assert!(Matrix::scaling(0.0, 1.0).inverse().is_none());
        assert!(Matrix::new(1.0, 2.0, 2.0, 4.0, 3.0, 3.0).inverse().is_none());
    }

    #[test]
    fn inverse_fails_iff_determinant_below_epsilon() {
        let tiny = (MATRIX_EPSILON as f32).sqrt() * 0.5;
        let m = Matrix::scaling(tiny, tiny);
        assert!(m.determinant().abs() < MATRIX_EPSILON);
        assert!(m.inverse().is_none());

        let ok = Matrix::scaling(0.01, 0.01);
        assert!(ok.determinant().abs() >= MATRIX_EPSILON);
        assert!(ok.inverse().is_some());
    }

    // ── mapping ───────────────────────────────────────────────────────────

    #[test]
    fn apply_runs_after_current_transform() {
        let mut m = Matrix::scaling(2.0, 2.0);
        m.translate(5.0, 0.0);
        assert_eq!(m.map_point(Vec2::new(1.0, 1.0)), Vec2::new(7.0, 2.0));
    }

    #[test]
    fn map_rect_returns_bounds() {
        let m = Matrix::rotation(90.0);
        let r = m.map_rect(Rect::new(0.0, 0.0, 10.0, 20.0));
        assert!((r.left - -20.0).abs() < TOL);
        assert!((r.right - 0.0).abs() < TOL);
        assert!((r.top - 0.0).abs() < TOL);
        assert!((r.bottom - 10.0).abs() < TOL);
    }

    #[test]
    fn to_matrix4x4_matches_map_point() {
        let m = samples()[5];
        let p = Vec2::new(3.0, -7.0);
        let expected = m.map_point(p);
        let got = m.to_matrix4x4().transform_point(p);
        assert!((got.x - expected.x).abs() < TOL);
        assert!((got.y - expected.y).abs() < TOL);
    }

    // ── hashing ───────────────────────────────────────────────────────────

    #[test]
    fn equal_transforms_deduplicate() {
        let mut set = HashSet::new();
        set.insert(Matrix::translation(1.0, 2.0));
        set.insert(Matrix::translation(1.0, 2.0));
        set.insert(Matrix::new(1.0, -0.0, 0.0, 1.0, 1.0, 2.0));
        set.insert(Matrix::translation(1.0, 3.0));
        assert_eq!(set.len(), 2);
    }
}
