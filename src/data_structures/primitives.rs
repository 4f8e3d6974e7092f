//! Procedural meshes for background objects.

use std::f32::consts::PI;

use crate::data_structures::model::{Mesh, ModelVertex};

/// UV sphere centred on the origin.
///
/// `width_segments` runs around the equator, `height_segments` from pole to pole.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Mesh {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);
    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * PI;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * 2.0 * PI;
            let normal = [
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            ];
            vertices.push(ModelVertex {
                position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                tex_coords: [u, v],
                normal,
            });
        }
    }

    let row = width_segments + 1;
    let mut indices = Vec::new();
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            // the pole rows collapse to a point, skip their degenerate half
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    Mesh::new("sphere", vertices, indices)
}

/// Axis-aligned box centred on the origin, four vertices per face.
pub fn cuboid(width: f32, height: f32, depth: f32) -> Mesh {
    let (hx, hy, hz) = (width * 0.5, height * 0.5, depth * 0.5);
    // (normal, u axis, v axis) per face
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let half = [hx, hy, hz];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u_axis, v_axis) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = std::array::from_fn(|i| {
                (normal[i] + u_axis[i] * su + v_axis[i] * sv) * half[i]
            });
            vertices.push(ModelVertex {
                position,
                tex_coords: [(su + 1.0) * 0.5, 1.0 - (sv + 1.0) * 0.5],
                normal,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    Mesh::new("box", vertices, indices)
}
