//! Drawing a [`Scene`] to the window.
//!
//! The renderer walks the committed scene graph once per frame. Meshes,
//! materials and textures are uploaded the first time a traversal reaches
//! them and cached by id; entries no longer referenced by any drawable node
//! are dropped after the frame. Every drawable node becomes one instance in a
//! shared instance buffer carrying its world transform, so each draw call is
//! `instances i..i+1` of the node's mesh.
//!
//! The overlay is drawn last with depth testing off, so it always sits on top
//! of the 3D content.

use std::{
    collections::{HashMap, HashSet},
    iter,
};

use wgpu::util::DeviceExt;

use crate::{
    context::Context,
    data_structures::{
        model::{Material, Mesh, TextureData},
        texture::Texture,
        transform::TransformRaw,
    },
    pipelines::{
        mesh::GpuMaterial,
        overlay::{OverlayVertex, quad_vertices},
    },
    scene::Scene,
};

/// Anything a [`Scene`] can be drawn to. The frame scheduler only talks to this.
pub trait RenderTarget {
    fn render(&mut self, scene: &Scene) -> Result<(), wgpu::SurfaceError>;
}

#[derive(Debug)]
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_elements: u32,
}

impl GpuMesh {
    fn new(device: &wgpu::Device, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", mesh.name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_elements: mesh.indices.len() as u32,
        }
    }
}

/// A vertex buffer that is rewritten every frame and only ever grows.
#[derive(Debug)]
struct StreamBuffer {
    label: &'static str,
    buffer: Option<wgpu::Buffer>,
}

impl StreamBuffer {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            buffer: None,
        }
    }

    fn write(&mut self, ctx: &Context, bytes: &[u8]) -> Option<&wgpu::Buffer> {
        if bytes.is_empty() {
            return None;
        }
        let needed = bytes.len() as wgpu::BufferAddress;
        if self.buffer.as_ref().is_none_or(|b| b.size() < needed) {
            let size = needed.next_power_of_two().max(256);
            log::debug!("{}: growing to {size} bytes", self.label);
            self.buffer = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        let buffer = self.buffer.as_ref()?;
        ctx.queue.write_buffer(buffer, 0, bytes);
        Some(buffer)
    }
}

struct Draw {
    mesh: u64,
    material: u64,
}

#[derive(Debug)]
pub struct Renderer {
    ctx: Context,
    meshes: HashMap<u64, GpuMesh>,
    materials: HashMap<u64, GpuMaterial>,
    textures: HashMap<u64, Texture>,
    /// Bound in place of a texture by flat-coloured materials.
    placeholder: Texture,
    instances: StreamBuffer,
    overlay: StreamBuffer,
    last_draw_count: usize,
}

impl Renderer {
    pub fn new(ctx: Context) -> Self {
        let placeholder =
            Texture::from_data(&ctx.device, &ctx.queue, &TextureData::solid("placeholder", [255; 4]));
        Self {
            ctx,
            meshes: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            placeholder,
            instances: StreamBuffer::new("Instance Buffer"),
            overlay: StreamBuffer::new("Overlay Vertex Buffer"),
            last_draw_count: 0,
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    /// Meshes drawn by the last frame.
    pub fn last_draw_count(&self) -> usize {
        self.last_draw_count
    }

    fn upload_material(&mut self, material: &Material) {
        if self.materials.contains_key(&material.id()) {
            return;
        }
        let texture: &Texture = match material.texture() {
            Some(data) => self
                .textures
                .entry(data.id())
                .or_insert_with(|| Texture::from_data(&self.ctx.device, &self.ctx.queue, data)),
            None => &self.placeholder,
        };
        let gpu = GpuMaterial::new(
            &self.ctx.device,
            &self.ctx.mesh_pipeline.material_layout,
            material,
            texture,
        );
        self.materials.insert(material.id(), gpu);
    }

    fn evict_unused(&mut self, draws: &[Draw], used_textures: &HashSet<u64>) {
        let meshes: HashSet<u64> = draws.iter().map(|d| d.mesh).collect();
        let materials: HashSet<u64> = draws.iter().map(|d| d.material).collect();
        self.meshes.retain(|id, _| meshes.contains(id));
        self.materials.retain(|id, _| materials.contains(id));
        self.textures.retain(|id, _| used_textures.contains(id));
    }
}

impl RenderTarget for Renderer {
    fn render(&mut self, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
        if !self.ctx.is_surface_configured() {
            return Ok(());
        }

        self.ctx
            .camera
            .write(&self.ctx.queue, &scene.camera_world_matrix(), &scene.projection);

        let mut draws = Vec::new();
        let mut instances: Vec<TransformRaw> = Vec::new();
        let mut used_textures = HashSet::new();
        for visit in scene.graph().traverse().filter(|v| v.is_drawable()) {
            let Some(renderable) = &visit.node.renderable else {
                continue;
            };
            if renderable.mesh.indices.is_empty() {
                continue;
            }
            self.meshes
                .entry(renderable.mesh.id())
                .or_insert_with(|| GpuMesh::new(&self.ctx.device, &renderable.mesh));
            self.upload_material(&renderable.material);
            if let Some(texture) = renderable.material.texture() {
                used_textures.insert(texture.id());
            }
            draws.push(Draw {
                mesh: renderable.mesh.id(),
                material: renderable.material.id(),
            });
            instances.push(TransformRaw::from_matrix(visit.world));
        }

        let overlay_vertices: Vec<OverlayVertex> = if scene.overlay_enabled {
            let viewport = scene.viewport();
            quad_vertices(
                &scene.overlay.quads(),
                viewport.width.max(1) as f32,
                viewport.height.max(1) as f32,
            )
        } else {
            Vec::new()
        };

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.instances
            .write(&self.ctx, bytemuck::cast_slice(&instances));
        self.overlay
            .write(&self.ctx, bytemuck::cast_slice(&overlay_vertices));

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let [r, g, b, a] = scene.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(instance_buffer) = &self.instances.buffer {
                if !draws.is_empty() {
                    render_pass.set_pipeline(&self.ctx.mesh_pipeline.pipeline);
                    render_pass.set_bind_group(0, &self.ctx.camera.bind_group, &[]);
                    render_pass.set_vertex_buffer(1, instance_buffer.slice(..));
                    for (i, draw) in draws.iter().enumerate() {
                        let (Some(mesh), Some(material)) =
                            (self.meshes.get(&draw.mesh), self.materials.get(&draw.material))
                        else {
                            continue;
                        };
                        let i = i as u32;
                        render_pass.set_bind_group(1, &material.bind_group, &[]);
                        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        render_pass
                            .set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..mesh.num_elements, 0, i..i + 1);
                    }
                }
            }

            if let (Some(buffer), false) = (&self.overlay.buffer, overlay_vertices.is_empty()) {
                render_pass.set_pipeline(&self.ctx.overlay_pipeline);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..overlay_vertices.len() as u32, 0..1);
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();

        self.last_draw_count = draws.len();
        self.evict_unused(&draws, &used_textures);
        Ok(())
    }
}
