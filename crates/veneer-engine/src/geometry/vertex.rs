//! Vertex formats shared by every backend.
//!
//! Both structs are uploaded verbatim. `Pod` rejects any implicit padding
//! at compile time; the offset tables below are the single description of
//! the layout that the wgpu and GL backends build their attribute bindings
//! from.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

/// Per-vertex fill selector, stored in `Vertex::data[0].x`.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum FillType {
    /// Flat vertex color.
    #[default]
    Solid = 0,
    /// Texture slot 0 sampled at `tex`, tinted by the vertex color.
    /// `data[0].y > 0.5` treats the texture as single-channel coverage
    /// (glyph masks): the vertex color is scaled by its red channel.
    Image = 1,
    /// Two-stop linear gradient: `data[1]` = (x0, y0, x1, y1) in `obj`
    /// space, `data[2]`/`data[3]` = premultiplied stop colors.
    LinearGradient = 2,
    /// Anti-aliased rounded rect: `data[1]` = (width, height, 0, 0) with
    /// `obj` in `0..width x 0..height`, `data[2]` = corner radii
    /// (top-left, top-right, bottom-right, bottom-left).
    RoundedRect = 3,
}

impl FillType {
    #[inline]
    pub fn as_f32(self) -> f32 {
        self as u32 as f32
    }
}

/// Primitive vertex (140 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
    /// Premultiplied RGBA8.
    pub color: [u8; 4],
    pub tex: [f32; 2],
    /// Local shape-space coordinate.
    pub obj: [f32; 2],
    /// Shader parameters; meaning depends on `FillType` in `data[0].x`.
    pub data: [[f32; 4]; 7],
}

impl Vertex {
    pub fn new(pos: [f32; 2], color: [u8; 4], tex: [f32; 2], obj: [f32; 2], fill: FillType) -> Self {
        let mut data = [[0.0; 4]; 7];
        data[0][0] = fill.as_f32();
        Self { pos, color, tex, obj, data }
    }

    #[inline]
    pub fn fill_type(&self) -> f32 {
        self.data[0][0]
    }

    pub const ATTRIBUTES: [VertexAttribute; 11] = [
        VertexAttribute::f32(0, 2, offset_of!(Vertex, pos)),
        VertexAttribute::unorm8(1, 4, offset_of!(Vertex, color)),
        VertexAttribute::f32(2, 2, offset_of!(Vertex, tex)),
        VertexAttribute::f32(3, 2, offset_of!(Vertex, obj)),
        VertexAttribute::f32(4, 4, offset_of!(Vertex, data)),
        VertexAttribute::f32(5, 4, offset_of!(Vertex, data) + 16),
        VertexAttribute::f32(6, 4, offset_of!(Vertex, data) + 32),
        VertexAttribute::f32(7, 4, offset_of!(Vertex, data) + 48),
        VertexAttribute::f32(8, 4, offset_of!(Vertex, data) + 64),
        VertexAttribute::f32(9, 4, offset_of!(Vertex, data) + 80),
        VertexAttribute::f32(10, 4, offset_of!(Vertex, data) + 96),
    ];
}

/// Reduced vertex for anti-aliased path fills (20 bytes).
///
/// `obj.x` is edge coverage: 1 inside the path, 0 on the outer edge of the
/// tessellated fringe.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct PathVertex {
    pub pos: [f32; 2],
    pub color: [u8; 4],
    pub obj: [f32; 2],
}

impl PathVertex {
    pub const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute::f32(0, 2, offset_of!(PathVertex, pos)),
        VertexAttribute::unorm8(1, 4, offset_of!(PathVertex, color)),
        VertexAttribute::f32(2, 2, offset_of!(PathVertex, obj)),
    ];
}

/// Component type of a vertex attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Float32,
    /// Unsigned bytes normalized to `0.0..=1.0`.
    Unorm8,
}

/// Backend-neutral vertex attribute description.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    pub kind: AttributeKind,
    pub offset: usize,
}

impl VertexAttribute {
    const fn f32(location: u32, components: u32, offset: usize) -> Self {
        Self { location, components, kind: AttributeKind::Float32, offset }
    }

    const fn unorm8(location: u32, components: u32, offset: usize) -> Self {
        Self { location, components, kind: AttributeKind::Unorm8, offset }
    }
}

/// Which vertex struct a geometry holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Fill,
    Path,
}

impl VertexFormat {
    #[inline]
    pub fn stride(self) -> usize {
        match self {
            VertexFormat::Fill => size_of::<Vertex>(),
            VertexFormat::Path => size_of::<PathVertex>(),
        }
    }

    #[inline]
    pub fn attributes(self) -> &'static [VertexAttribute] {
        match self {
            VertexFormat::Fill => &Vertex::ATTRIBUTES,
            VertexFormat::Path => &PathVertex::ATTRIBUTES,
        }
    }
}

/// Borrowed vertex data for geometry creation/update.
#[derive(Debug, Copy, Clone)]
pub enum VertexData<'a> {
    Fill(&'a [Vertex]),
    Path(&'a [PathVertex]),
}

impl<'a> VertexData<'a> {
    #[inline]
    pub fn format(&self) -> VertexFormat {
        match self {
            VertexData::Fill(_) => VertexFormat::Fill,
            VertexData::Path(_) => VertexFormat::Path,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            VertexData::Fill(v) => v.len(),
            VertexData::Path(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        match self {
            VertexData::Fill(v) => bytemuck::cast_slice(v),
            VertexData::Path(v) => bytemuck::cast_slice(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── byte layout ───────────────────────────────────────────────────────

    #[test]
    fn vertex_layout_has_no_padding() {
        assert_eq!(size_of::<Vertex>(), 140);
        assert_eq!(offset_of!(Vertex, pos), 0);
        assert_eq!(offset_of!(Vertex, color), 8);
        assert_eq!(offset_of!(Vertex, tex), 12);
        assert_eq!(offset_of!(Vertex, obj), 20);
        assert_eq!(offset_of!(Vertex, data), 28);
    }

    #[test]
    fn path_vertex_layout_has_no_padding() {
        assert_eq!(size_of::<PathVertex>(), 20);
        assert_eq!(offset_of!(PathVertex, color), 8);
        assert_eq!(offset_of!(PathVertex, obj), 12);
    }

    #[test]
    fn attribute_tables_tile_the_stride() {
        for format in [VertexFormat::Fill, VertexFormat::Path] {
            let mut end = 0;
            for attr in format.attributes() {
                assert_eq!(attr.offset, end, "gap before location {}", attr.location);
                let width = match attr.kind {
                    AttributeKind::Float32 => 4,
                    AttributeKind::Unorm8 => 1,
                };
                end = attr.offset + width * attr.components as usize;
            }
            assert_eq!(end, format.stride());
        }
    }

    // ── data ──────────────────────────────────────────────────────────────

    #[test]
    fn new_stores_fill_type_in_first_slot() {
        let v = Vertex::new([0.0; 2], [255; 4], [0.0; 2], [0.0; 2], FillType::Image);
        assert_eq!(v.fill_type(), 1.0);
        assert_eq!(v.data[1], [0.0; 4]);
    }

    #[test]
    fn vertex_data_bytes_match_stride() {
        let verts = [Vertex::default(); 3];
        let data = VertexData::Fill(&verts);
        assert_eq!(data.as_bytes().len(), 3 * data.format().stride());
    }
}
