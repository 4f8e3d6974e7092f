//! Node transforms for the scene graph.
//!
//! Every scene node carries a local [`Transform`] (position, rotation, scale).
//! World placement is a matrix, `parent_world * local.to_matrix()`, so a
//! non-uniform parent scale shears rotated children the way it should. The
//! world matrix of every drawn node is uploaded as a [`TransformRaw`].

use cgmath::{EuclideanSpace, InnerSpace, Matrix, One, Rotation3, SquareMatrix};

use crate::data_structures::model;

/// Position, rotation (as quaternion), and scale of a scene node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Transform {
    /// Identity transform (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_position(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: cgmath::Vector3::new(x, y, z),
            ..Default::default()
        }
    }

    /// Rotate about the local X axis, composing with the current rotation.
    pub fn rotate_x(&mut self, angle: cgmath::Rad<f32>) {
        self.rotation = self.rotation * cgmath::Quaternion::from_angle_x(angle);
    }

    /// Orient the node so that its -Z axis points at `target`.
    ///
    /// Leaves the rotation untouched if `target` coincides with the position.
    pub fn look_at(&mut self, target: cgmath::Point3<f32>, up: cgmath::Vector3<f32>) {
        let back = cgmath::Point3::from_vec(self.position) - target;
        if back.magnitude2() < f32::EPSILON {
            return;
        }
        let z_axis = back.normalize();
        let x_axis = up.cross(z_axis);
        if x_axis.magnitude2() < f32::EPSILON {
            return;
        }
        let x_axis = x_axis.normalize();
        let y_axis = z_axis.cross(x_axis);
        self.rotation = cgmath::Matrix3::from_cols(x_axis, y_axis, z_axis).into();
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl From<cgmath::Vector3<f32>> for Transform {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Transform {
            position,
            ..Default::default()
        }
    }
}

/**
 * The raw transform is what the vertex shader reads per drawn node.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

impl TransformRaw {
    /// `world` plus its normal matrix, the inverse-transpose of the upper 3x3.
    pub fn from_matrix(world: cgmath::Matrix4<f32>) -> Self {
        let linear = cgmath::Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
        let normal = linear
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or(linear);
        Self {
            model: world.into(),
            normal: normal.into(),
        }
    }

    pub fn model(&self) -> cgmath::Matrix4<f32> {
        self.model.into()
    }

    pub fn normal(&self) -> cgmath::Matrix3<f32> {
        self.normal.into()
    }
}

/**
 * Per-instance layout: a 4x4 model matrix (four vec4 slots) and a 3x3
 * normal matrix (three vec3 slots).
 */
impl model::Vertex for TransformRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<TransformRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}
