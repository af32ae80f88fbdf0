use super::Vec2;

/// Floating-point rectangle stored as edges (left, top, right, bottom).
///
/// A rectangle with `right <= left` or `bottom <= top` is empty.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    #[inline]
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    #[inline]
    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    #[inline]
    pub fn width(self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(self) -> f32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn origin(self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Half-open containment: [left, right) x [top, bottom).
    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let r = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if r.is_empty() { None } else { Some(r) }
    }

    /// Smallest rectangle covering both. Empty inputs are ignored.
    pub fn join(self, other: Rect) -> Rect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Packs as `[x, y, width, height]` for shader consumption.
    #[inline]
    pub fn to_xywh(self) -> [f32; 4] {
        [self.left, self.top, self.width(), self.height()]
    }
}

/// Integer rectangle in device pixels, stored as edges.
///
/// Used for scissor rects and overlay bounds.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IntRect {
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Rect of `width` x `height` at `(x, y)`. The size is kept exact: the
    /// origin is pulled back when the far edge would pass `i32::MAX`.
    #[inline]
    pub fn from_xywh(x: i32, y: i32, width: u32, height: u32) -> Self {
        let w = width.min(i32::MAX as u32) as i32;
        let h = height.min(i32::MAX as u32) as i32;
        let x = x.min(i32::MAX - w);
        let y = y.min(i32::MAX - h);
        Self::new(x, y, x + w, y + h)
    }

    #[inline]
    pub fn width(self) -> u32 {
        self.right.saturating_sub(self.left).max(0) as u32
    }

    #[inline]
    pub fn height(self) -> u32 {
        self.bottom.saturating_sub(self.top).max(0) as u32
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Half-open containment: [left, right) x [top, bottom).
    #[inline]
    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Moves the origin by `(dx, dy)`, saturating at the `i32` range. The
    /// size is unchanged.
    #[inline]
    pub fn translated(self, dx: i32, dy: i32) -> Self {
        Self::from_xywh(
            self.left.saturating_add(dx),
            self.top.saturating_add(dy),
            self.width(),
            self.height(),
        )
    }

    pub fn intersect(self, other: IntRect) -> Option<IntRect> {
        let r = IntRect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if r.is_empty() { None } else { Some(r) }
    }

    /// Clamps to a `width` x `height` target and returns `(x, y, w, h)`.
    ///
    /// Returns `None` when nothing of the rect lies on the target; the draw
    /// should then be skipped.
    pub fn clamp_to_target(self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let target = IntRect::new(0, 0, width as i32, height as i32);
        let r = self.intersect(target)?;
        Some((r.left as u32, r.top as u32, r.width(), r.height()))
    }

    #[inline]
    pub fn to_rect(self) -> Rect {
        Rect::new(self.left as f32, self.top as f32, self.right as f32, self.bottom as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Rect ──────────────────────────────────────────────────────────────

    #[test]
    fn rect_from_xywh_sets_edges() {
        let r = Rect::from_xywh(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r, Rect::new(10.0, 20.0, 40.0, 60.0));
        assert_eq!(r.width(), 30.0);
        assert_eq!(r.height(), 40.0);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Vec2::new(0.0, 0.0)));
        assert!(r.contains(Vec2::new(9.99, 9.99)));
        assert!(!r.contains(Vec2::new(10.0, 5.0)));
        assert!(!r.contains(Vec2::new(5.0, 10.0)));
    }

    #[test]
    fn rect_intersect_touching_edges_is_none() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert!(a.intersect(b).is_none());
    }

    #[test]
    fn rect_join_skips_empty() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.join(Rect::default()), a);
        assert_eq!(
            a.join(Rect::new(5.0, -5.0, 20.0, 5.0)),
            Rect::new(0.0, -5.0, 20.0, 10.0)
        );
    }

    // ── IntRect ───────────────────────────────────────────────────────────

    #[test]
    fn int_rect_contains_is_half_open() {
        let r = IntRect::from_xywh(0, 0, 300, 300);
        assert!(r.contains(0, 0));
        assert!(r.contains(299, 299));
        assert!(!r.contains(300, 0));
        assert!(!r.contains(-1, 10));
    }

    #[test]
    fn int_rect_clamp_to_target() {
        let r = IntRect::new(-10, 5, 50, 500);
        assert_eq!(r.clamp_to_target(40, 100), Some((0, 5, 40, 95)));
        assert_eq!(IntRect::new(50, 50, 60, 60).clamp_to_target(40, 40), None);
    }

    #[test]
    fn int_rect_keeps_its_size_near_the_edge_of_the_range() {
        let r = IntRect::from_xywh(i32::MAX - 100, 0, 300, 20);
        assert_eq!((r.width(), r.height()), (300, 20));
        assert_eq!(r.right, i32::MAX);

        let moved = IntRect::from_xywh(0, 0, 300, 20).translated(i32::MAX, i32::MIN);
        assert_eq!((moved.width(), moved.height()), (300, 20));
        assert_eq!((moved.left, moved.top), (i32::MAX - 300, i32::MIN));
    }

    #[test]
    fn int_rect_inverted_has_zero_size() {
        let r = IntRect::new(10, 10, 0, 0);
        assert!(r.is_empty());
        assert_eq!(r.width(), 0);
        assert_eq!(r.height(), 0);
    }
}
