use crate::geometry::{Uniforms, UNIFORMS_SIZE};

/// One uniform buffer holding a block per draw of the current flush.
///
/// Draws select their block with a dynamic offset. Blocks are 768 bytes,
/// a multiple of the 256-byte default `min_uniform_buffer_offset_alignment`.
pub(super) struct UniformRing {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: usize,
}

impl UniformRing {
    const MIN_CAPACITY: usize = 64;

    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let (buffer, bind_group) = Self::allocate(device, layout, Self::MIN_CAPACITY);
        Self { buffer, bind_group, capacity: Self::MIN_CAPACITY }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("veneer uniform ring"),
            size: (capacity * UNIFORMS_SIZE) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("veneer uniform ring bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORMS_SIZE as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Uploads `blocks`, growing the buffer if needed.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        blocks: &[Uniforms],
    ) {
        if blocks.is_empty() {
            return;
        }
        if blocks.len() > self.capacity {
            let capacity = blocks.len().next_power_of_two();
            log::debug!("growing uniform ring to {capacity} blocks");
            (self.buffer, self.bind_group) = Self::allocate(device, layout, capacity);
            self.capacity = capacity;
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(blocks));
    }

    #[inline]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Dynamic offset of block `index`.
    #[inline]
    pub fn offset(index: usize) -> u32 {
        (index * UNIFORMS_SIZE) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_respect_default_alignment() {
        let align = wgpu::Limits::default().min_uniform_buffer_offset_alignment;
        for i in 0..4 {
            assert_eq!(UniformRing::offset(i) % align, 0);
        }
        assert_eq!(UniformRing::offset(2), 1536);
    }
}
