use wgpu::util::DeviceExt;

use crate::target::{Bitmap, PixelFormat};

pub(super) fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::A8Unorm => wgpu::TextureFormat::R8Unorm,
        PixelFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        PixelFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
    }
}

/// Vertex + index buffers. Capacities only grow.
#[derive(Debug)]
pub struct WgpuGeometry {
    pub(super) vertices: wgpu::Buffer,
    pub(super) indices: wgpu::Buffer,
}

impl WgpuGeometry {
    pub(super) fn new(device: &wgpu::Device, vertex_bytes: &[u8], indices: &[u32]) -> Self {
        Self {
            vertices: Self::buffer(device, "veneer geometry vbo", vertex_bytes, wgpu::BufferUsages::VERTEX),
            indices: Self::buffer(
                device,
                "veneer geometry ibo",
                bytemuck::cast_slice(indices),
                wgpu::BufferUsages::INDEX,
            ),
        }
    }

    fn buffer(device: &wgpu::Device, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: usage | wgpu::BufferUsages::COPY_DST,
        })
    }

    /// Rewrites both buffers, reallocating the ones that are too small.
    pub(super) fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, vertex_bytes: &[u8], indices: &[u32]) {
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);
        Self::write_one(device, queue, &mut self.vertices, "veneer geometry vbo", vertex_bytes, wgpu::BufferUsages::VERTEX);
        Self::write_one(device, queue, &mut self.indices, "veneer geometry ibo", index_bytes, wgpu::BufferUsages::INDEX);
    }

    fn write_one(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        buffer: &mut wgpu::Buffer,
        label: &str,
        bytes: &[u8],
        usage: wgpu::BufferUsages,
    ) {
        if bytes.is_empty() {
            return;
        }
        if (bytes.len() as u64) > buffer.size() {
            *buffer = Self::buffer(device, label, bytes, usage);
        } else {
            queue.write_buffer(buffer, 0, bytes);
        }
    }
}

#[derive(Debug)]
pub struct WgpuTexture {
    pub(super) texture: wgpu::Texture,
    pub(super) view: wgpu::TextureView,
}

impl WgpuTexture {
    pub(super) fn new(device: &wgpu::Device, width: u32, height: u32, format: PixelFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("veneer texture"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Uploads `rows` (top row first, `row_bytes` apart) to the whole texture.
    pub(super) fn write(&self, queue: &wgpu::Queue, rows: &[u8], row_bytes: u32) {
        let size = self.texture.size();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rows,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row_bytes),
                rows_per_image: Some(size.height),
            },
            size,
        );
    }

    pub(super) fn write_bitmap(&self, queue: &wgpu::Queue, bitmap: &Bitmap) {
        self.write(queue, &bitmap.pixels, bitmap.row_bytes);
    }
}

/// Color attachment of a render buffer.
#[derive(Debug)]
pub enum WgpuRenderBuffer {
    /// The swapchain image acquired for the current frame.
    Surface,
    Texture {
        view: wgpu::TextureView,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_formats_map_to_matching_texel_sizes() {
        for format in [PixelFormat::A8Unorm, PixelFormat::Bgra8Unorm, PixelFormat::Bgra8UnormSrgb] {
            let block = texture_format(format).block_copy_size(None);
            assert_eq!(block, Some(format.bytes_per_pixel()));
        }
    }
}
