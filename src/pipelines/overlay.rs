use crate::{
    data_structures::{model::Vertex, texture::Texture},
    overlay::{OverlayQuad, Rect},
    pipelines::{DepthMode, mk_render_pipeline},
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex for OverlayVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<OverlayVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Two triangles per quad, in clip space, for a viewport of `width` x `height`
/// logical pixels.
pub fn quad_vertices(quads: &[OverlayQuad], width: f32, height: f32) -> Vec<OverlayVertex> {
    let to_clip = |x: f32, y: f32| [x / width * 2.0 - 1.0, 1.0 - y / height * 2.0];
    quads
        .iter()
        .flat_map(|&OverlayQuad { rect, color }| {
            let Rect {
                x,
                y,
                width: w,
                height: h,
            } = rect;
            let (tl, tr, bl, br) = (
                to_clip(x, y),
                to_clip(x + w, y),
                to_clip(x, y + h),
                to_clip(x + w, y + h),
            );
            [bl, br, tr, bl, tr, tl].map(|position| OverlayVertex { position, color })
        })
        .collect()
}

pub fn mk_overlay_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Overlay Pipeline Layout"),
        bind_group_layouts: &[],
        push_constant_ranges: &[],
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Overlay Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("overlay.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        "Overlay Pipeline",
        &layout,
        config.format,
        Some(wgpu::BlendState::ALPHA_BLENDING),
        Some((Texture::DEPTH_FORMAT, DepthMode::ON_TOP)),
        None,
        &[OverlayVertex::desc()],
        shader,
    )
}
