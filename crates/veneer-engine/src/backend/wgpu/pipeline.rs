use std::collections::HashMap;

use crate::geometry::{AttributeKind, BlendMode, ShaderType, VertexFormat, UNIFORMS_SIZE};

const COMMON_WGSL: &str = include_str!("../shaders/common.wgsl");
const FILL_WGSL: &str = include_str!("../shaders/fill.wgsl");
const PATH_WGSL: &str = include_str!("../shaders/path.wgsl");

/// Texture slots plus one sampler in bind group 1.
const SAMPLER_BINDING: u32 = crate::geometry::TEXTURE_SLOTS as u32;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub shader: ShaderType,
    pub blend: BlendMode,
    pub format: wgpu::TextureFormat,
}

/// Shader modules, shared layouts and a lazily filled pipeline cache.
pub(super) struct Pipelines {
    fill: wgpu::ShaderModule,
    path: wgpu::ShaderModule,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    layout: wgpu::PipelineLayout,
    cache: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let module = |label: &str, body: &str| {
            let source = [COMMON_WGSL, body].concat();
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        };
        let fill = module("veneer fill shader", FILL_WGSL);
        let path = module("veneer path shader", PATH_WGSL);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("veneer uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UNIFORMS_SIZE as u64),
                },
                count: None,
            }],
        });

        let mut texture_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..SAMPLER_BINDING)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        texture_entries.push(wgpu::BindGroupLayoutEntry {
            binding: SAMPLER_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("veneer textures bgl"),
            entries: &texture_entries,
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("veneer pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        Self {
            fill,
            path,
            uniform_layout,
            texture_layout,
            layout,
            cache: HashMap::new(),
        }
    }

    #[inline]
    pub fn uniform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.uniform_layout
    }

    #[inline]
    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    #[inline]
    pub fn sampler_binding() -> u32 {
        SAMPLER_BINDING
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.cache.get(key)
    }

    /// Builds the pipeline for `key` on first use.
    pub fn ensure(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.cache.contains_key(&key) {
            return;
        }
        log::debug!("creating pipeline {key:?}");

        let format = key.shader.vertex_format();
        let attributes = vertex_attributes(format);
        let module = match key.shader {
            ShaderType::Fill => &self.fill,
            ShaderType::FillPath => &self.path,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("veneer pipeline"),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: format.stride() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: Some(blend_state(key.blend)),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Cw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.cache.insert(key, pipeline);
    }
}

/// wgpu attribute list for one of the shared vertex formats.
pub(super) fn vertex_attributes(format: VertexFormat) -> Vec<wgpu::VertexAttribute> {
    format
        .attributes()
        .iter()
        .map(|attr| wgpu::VertexAttribute {
            format: match (attr.kind, attr.components) {
                (AttributeKind::Unorm8, _) => wgpu::VertexFormat::Unorm8x4,
                (AttributeKind::Float32, 2) => wgpu::VertexFormat::Float32x2,
                (AttributeKind::Float32, _) => wgpu::VertexFormat::Float32x4,
            },
            offset: attr.offset as u64,
            shader_location: attr.location,
        })
        .collect()
}

// ── blend ─────────────────────────────────────────────────────────────────

pub(super) fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Replace => wgpu::BlendState::REPLACE,
        BlendMode::SourceOver => {
            let premul = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            };
            wgpu::BlendState { color: premul, alpha: premul }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_formats_cover_the_stride() {
        for format in [VertexFormat::Fill, VertexFormat::Path] {
            let attrs = vertex_attributes(format);
            let last = attrs.last().expect("formats have attributes");
            assert_eq!(last.offset + last.format.size(), format.stride() as u64);
            assert_eq!(attrs[1].format, wgpu::VertexFormat::Unorm8x4);
        }
    }

    #[test]
    fn source_over_is_premultiplied() {
        let b = blend_state(BlendMode::SourceOver);
        assert_eq!(b.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(b.alpha.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(blend_state(BlendMode::Replace), wgpu::BlendState::REPLACE);
    }
}
