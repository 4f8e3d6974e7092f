//! Render pipelines.
//!
//! - `mesh` draws scene nodes: matcap, textured or flat-coloured materials
//! - `overlay` draws the letter overlay as flat quads on top of the scene

pub mod mesh;
pub mod overlay;

/// Depth behaviour of a pipeline.
#[derive(Clone, Copy, Debug)]
pub struct DepthMode {
    pub write: bool,
    pub compare: wgpu::CompareFunction,
}

impl DepthMode {
    pub const OPAQUE: Self = Self {
        write: true,
        compare: wgpu::CompareFunction::Less,
    };
    /// Drawn over everything, leaves the depth buffer alone.
    pub const ON_TOP: Self = Self {
        write: false,
        compare: wgpu::CompareFunction::Always,
    };
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth: Option<(wgpu::TextureFormat, DepthMode)>,
    cull_mode: Option<wgpu::Face>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth.map(|(format, mode)| wgpu::DepthStencilState {
            format,
            depth_write_enabled: mode.write,
            depth_compare: mode.compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
