//! Camera projection, viewport and the camera uniform.
//!
//! The camera itself is an ordinary scene node (its transform is the eye
//! position and orientation). This module holds the projection parameters,
//! the viewport they are derived from, and the GPU-side uniform.

use cgmath::{Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

/// wgpu clip space has z in [0, 1], cgmath produces [-1, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Highest device pixel ratio the output buffer is rendered at.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fovy: cgmath::Deg<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fovy: cgmath::Deg<f32>, znear: f32, zfar: f32) -> Self {
        Self {
            fovy,
            aspect: aspect_of(width, height),
            znear,
            zfar,
        }
    }

    /// Resynchronise the aspect ratio with a new viewport size.
    ///
    /// Field of view and clip planes are left untouched.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_of(width, height);
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

fn aspect_of(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

/// Inverse of the camera node's world matrix.
pub fn view_matrix(camera_world: &Matrix4<f32>) -> Matrix4<f32> {
    camera_world.invert().unwrap_or_else(Matrix4::identity)
}

/// Size of the display surface in logical pixels plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Pixel density of the output buffer, capped at [`MAX_PIXEL_RATIO`].
    pub fn pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio.clamp(f64::MIN_POSITIVE, MAX_PIXEL_RATIO)
    }

    /// Output buffer size in physical pixels.
    pub fn buffer_size(&self) -> (u32, u32) {
        let ratio = self.pixel_ratio();
        (
            ((self.width as f64 * ratio).round() as u32).max(1),
            ((self.height as f64 * ratio).round() as u32).max(1),
        )
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view: [[f32; 4]; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view: Matrix4::identity().into(),
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera_world: &Matrix4<f32>, projection: &Projection) {
        let view = view_matrix(camera_world);
        self.view_position = camera_world.w.into();
        self.view = view.into();
        self.view_proj = (projection.calc_matrix() * view).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU resources backing the camera uniform.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, camera_world: &Matrix4<f32>, projection: &Projection) {
        self.uniform.update_view_proj(camera_world, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
