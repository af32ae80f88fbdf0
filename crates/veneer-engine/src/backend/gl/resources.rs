use glow::HasContext;

use crate::geometry::{AttributeKind, VertexFormat};
use crate::target::{Bitmap, PixelFormat};

/// `(internal format, upload format)` for a pixel format.
pub(super) fn texel_format(format: PixelFormat) -> (i32, u32) {
    match format {
        PixelFormat::A8Unorm => (glow::R8 as i32, glow::RED),
        PixelFormat::Bgra8Unorm => (glow::RGBA8 as i32, glow::BGRA),
        PixelFormat::Bgra8UnormSrgb => (glow::SRGB8_ALPHA8 as i32, glow::BGRA),
    }
}

/// Vertex array with its vertex and index buffers.
#[derive(Debug)]
pub struct GlGeometry {
    pub(super) vao: glow::VertexArray,
    vbo: glow::Buffer,
    ibo: glow::Buffer,
}

impl GlGeometry {
    pub(super) fn new(
        gl: &glow::Context,
        format: VertexFormat,
        vertex_bytes: &[u8],
        indices: &[u32],
    ) -> Result<Self, String> {
        unsafe {
            let vao = gl.create_vertex_array()?;
            let vbo = match gl.create_buffer() {
                Ok(vbo) => vbo,
                Err(err) => {
                    gl.delete_vertex_array(vao);
                    return Err(err);
                }
            };
            let ibo = match gl.create_buffer() {
                Ok(ibo) => ibo,
                Err(err) => {
                    gl.delete_buffer(vbo);
                    gl.delete_vertex_array(vao);
                    return Err(err);
                }
            };

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));

            let stride = format.stride() as i32;
            for attr in format.attributes() {
                let (data_type, normalized) = match attr.kind {
                    AttributeKind::Float32 => (glow::FLOAT, false),
                    AttributeKind::Unorm8 => (glow::UNSIGNED_BYTE, true),
                };
                gl.enable_vertex_attrib_array(attr.location);
                gl.vertex_attrib_pointer_f32(
                    attr.location,
                    attr.components as i32,
                    data_type,
                    normalized,
                    stride,
                    attr.offset as i32,
                );
            }

            let geometry = Self { vao, vbo, ibo };
            geometry.upload(gl, vertex_bytes, indices);
            gl.bind_vertex_array(None);
            Ok(geometry)
        }
    }

    /// Replaces both buffers' contents.
    pub(super) fn write(&self, gl: &glow::Context, vertex_bytes: &[u8], indices: &[u32]) {
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            self.upload(gl, vertex_bytes, indices);
            gl.bind_vertex_array(None);
        }
    }

    /// Expects `self.vao` bound, so the element buffer binding sticks to it.
    fn upload(&self, gl: &glow::Context, vertex_bytes: &[u8], indices: &[u32]) {
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, vertex_bytes, glow::DYNAMIC_DRAW);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(self.ibo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(indices),
                glow::DYNAMIC_DRAW,
            );
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    pub(super) fn delete(self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
            gl.delete_buffer(self.ibo);
        }
    }
}

#[derive(Debug)]
pub struct GlTexture {
    pub(super) texture: glow::Texture,
    format: PixelFormat,
}

impl GlTexture {
    /// Allocates a linear-filtered, edge-clamped texture. `pixels` are
    /// tightly packed rows, top row first.
    pub(super) fn new(
        gl: &glow::Context,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Option<&[u8]>,
    ) -> Result<Self, String> {
        let (internal, upload) = texel_format(format);
        unsafe {
            let texture = gl.create_texture()?;
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal,
                width as i32,
                height as i32,
                0,
                upload,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
            gl.bind_texture(glow::TEXTURE_2D, None);
            Ok(Self { texture, format })
        }
    }

    /// Replaces the whole image. `bitmap` rows may be padded.
    pub(super) fn write_bitmap(&self, gl: &glow::Context, bitmap: &Bitmap) {
        let (_, upload) = texel_format(self.format);
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, bitmap.row_pixels() as i32);
            gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                0,
                0,
                bitmap.width as i32,
                bitmap.height as i32,
                upload,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(&bitmap.pixels)),
            );
            gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);
            gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }

    pub(super) fn delete(self, gl: &glow::Context) {
        unsafe { gl.delete_texture(self.texture) };
    }
}

/// Draw destination of a render buffer.
#[derive(Debug)]
pub enum GlRenderBuffer {
    /// Default framebuffer of the host surface.
    Surface,
    /// Framebuffer object with a texture as its only color attachment.
    /// Rendered Y-flipped so texture rows stay top-first.
    Framebuffer {
        fbo: glow::Framebuffer,
        width: u32,
        height: u32,
    },
}

impl GlRenderBuffer {
    pub(super) fn framebuffer(
        gl: &glow::Context,
        texture: glow::Texture,
        width: u32,
        height: u32,
    ) -> Result<Self, String> {
        unsafe {
            let fbo = gl.create_framebuffer()?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(fbo);
                return Err(format!("framebuffer incomplete (status {status:#x})"));
            }
            Ok(Self::Framebuffer { fbo, width, height })
        }
    }

    pub(super) fn delete(self, gl: &glow::Context) {
        if let Self::Framebuffer { fbo, .. } = self {
            unsafe { gl.delete_framebuffer(fbo) };
        }
    }
}
