use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        model::{self, Material, Shading, Vertex},
        texture::Texture,
        transform::TransformRaw,
    },
    pipelines::{DepthMode, mk_render_pipeline},
};

const MODE_MATCAP: u32 = 0;
const MODE_TEXTURED: u32 = 1;
const MODE_COLOR: u32 = 2;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    color: [f32; 4],
    mode: u32,
    _padding: [u32; 3],
}

impl MaterialUniform {
    pub fn new(material: &Material) -> Self {
        let mode = match material.shading {
            Shading::Matcap(_) => MODE_MATCAP,
            Shading::Textured(_) => MODE_TEXTURED,
            Shading::Color => MODE_COLOR,
        };
        Self {
            color: material.base_color,
            mode,
            _padding: [0; 3],
        }
    }
}

/// A material's uniform buffer and bind group (group 1 of the mesh pipeline).
#[derive(Debug)]
pub struct GpuMaterial {
    #[allow(unused)]
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

impl GpuMaterial {
    /// `texture` is the material's own texture, or a white placeholder for flat colours.
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        material: &Material,
        texture: &Texture,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&material.name),
            contents: bytemuck::cast_slice(&[MaterialUniform::new(material)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
            label: Some("material_bind_group"),
        });
        Self { buffer, bind_group }
    }
}

#[derive(Debug)]
pub struct MeshPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub material_layout: wgpu::BindGroupLayout,
}

impl MeshPipeline {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let material_layout = material_layout(device);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[camera_bind_group_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let shader = wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("mesh.wgsl").into()),
        };

        // text side walls and glTF meshes are not reliably wound, draw both faces
        let pipeline = mk_render_pipeline(
            device,
            "Mesh Pipeline",
            &layout,
            config.format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            Some((Texture::DEPTH_FORMAT, DepthMode::OPAQUE)),
            None,
            &[model::ModelVertex::desc(), TransformRaw::desc()],
            shader,
        );

        Self {
            pipeline,
            material_layout,
        }
    }
}
