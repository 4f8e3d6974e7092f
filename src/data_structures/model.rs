//! Renderable payloads: meshes, materials and texture data.
//!
//! Everything in here is plain CPU data so that scene construction and the
//! per-tick update pipeline work without a GPU. The renderer uploads meshes,
//! textures and materials lazily the first time a traversal hands them over,
//! keyed by their ids.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: cgmath::Point3<f32>,
    pub max: cgmath::Point3<f32>,
}

impl Aabb {
    /// Bounds of a set of vertices, `None` when there are none.
    pub fn from_vertices(vertices: &[ModelVertex]) -> Option<Self> {
        let first = vertices.first()?;
        let mut min = first.position;
        let mut max = first.position;
        for v in vertices.iter().skip(1) {
            for axis in 0..3 {
                min[axis] = min[axis].min(v.position[axis]);
                max[axis] = max[axis].max(v.position[axis]);
            }
        }
        Some(Self {
            min: min.into(),
            max: max.into(),
        })
    }

    pub fn center(&self) -> cgmath::Point3<f32> {
        cgmath::Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    pub fn size(&self) -> cgmath::Vector3<f32> {
        self.max - self.min
    }

    /// Grow the box to contain `p`.
    pub fn including(self, p: cgmath::Point3<f32>) -> Self {
        Self {
            min: cgmath::Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: cgmath::Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    pub fn corners(&self) -> [cgmath::Point3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            cgmath::Point3::new(a.x, a.y, a.z),
            cgmath::Point3::new(b.x, a.y, a.z),
            cgmath::Point3::new(a.x, b.y, a.z),
            cgmath::Point3::new(b.x, b.y, a.z),
            cgmath::Point3::new(a.x, a.y, b.z),
            cgmath::Point3::new(b.x, a.y, b.z),
            cgmath::Point3::new(a.x, b.y, b.z),
            cgmath::Point3::new(b.x, b.y, b.z),
        ]
    }
}

/// Triangle mesh kept on the CPU until the renderer first sees it.
#[derive(Debug)]
pub struct Mesh {
    id: u64,
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, vertices: Vec<ModelVertex>, indices: Vec<u32>) -> Self {
        Self {
            id: next_id(),
            name: name.into(),
            vertices,
            indices,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_vertices(&self.vertices)
    }

    /// Translate every vertex so the bounding box midpoint lands on the origin.
    ///
    /// Returns the applied offset.
    pub fn center(&mut self) -> cgmath::Vector3<f32> {
        let Some(bounds) = self.bounds() else {
            return cgmath::Vector3::new(0.0, 0.0, 0.0);
        };
        let c = bounds.center();
        self.vertices.iter_mut().for_each(|v| {
            v.position[0] -= c.x;
            v.position[1] -= c.y;
            v.position[2] -= c.z;
        });
        cgmath::Vector3::new(-c.x, -c.y, -c.z)
    }
}

/// Decoded RGBA8 image, shared between every material that samples it.
#[derive(Debug)]
pub struct TextureData {
    id: u64,
    pub label: String,
    pub image: image::RgbaImage,
}

impl TextureData {
    pub fn new(label: impl Into<String>, image: image::RgbaImage) -> Self {
        Self {
            id: next_id(),
            label: label.into(),
            image,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// A one pixel texture of the given colour.
    pub fn solid(label: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self::new(label, image::RgbaImage::from_pixel(1, 1, image::Rgba(rgba)))
    }
}

#[derive(Clone, Debug)]
pub enum Shading {
    /// Colour looked up from a matcap image by the view-space normal.
    Matcap(Arc<TextureData>),
    /// Diffuse texture addressed by the mesh's texture coordinates, tinted by `base_color`.
    Textured(Arc<TextureData>),
    /// Flat colour.
    Color,
}

#[derive(Debug)]
pub struct Material {
    id: u64,
    pub name: String,
    pub shading: Shading,
    pub base_color: [f32; 4],
}

impl Material {
    pub fn new(name: impl Into<String>, shading: Shading, base_color: [f32; 4]) -> Self {
        Self {
            id: next_id(),
            name: name.into(),
            shading,
            base_color,
        }
    }

    pub fn matcap(name: impl Into<String>, matcap: Arc<TextureData>) -> Self {
        Self::new(name, Shading::Matcap(matcap), [1.0; 4])
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The texture the shader samples, if any.
    pub fn texture(&self) -> Option<&Arc<TextureData>> {
        match &self.shading {
            Shading::Matcap(tex) | Shading::Textured(tex) => Some(tex),
            Shading::Color => None,
        }
    }
}

/// Geometry + material pair carried by a drawable scene node.
#[derive(Clone, Debug)]
pub struct Renderable {
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
}

impl Renderable {
    pub fn new(mesh: Mesh, material: Arc<Material>) -> Self {
        Self {
            mesh: Arc::new(mesh),
            material,
        }
    }
}
