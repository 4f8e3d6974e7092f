//! Extruded, bevelled 3D text.
//!
//! Glyph outlines are flattened to closed polylines, the front and back caps
//! are triangulated with lyon, and the side walls are swept through a ring
//! profile: a quarter-circle bevel at the front, the straight body, and the
//! mirrored bevel at the back. The finished mesh is translated so that its
//! bounding box is centred on the origin.

use std::{f32::consts::FRAC_PI_2, sync::Arc};

use lyon_path::{Path, math};
use lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};
use serde::{Deserialize, Serialize};

use crate::{
    data_structures::{
        model::{Material, Mesh, ModelVertex, Renderable},
        scene_graph::SceneNode,
    },
    resources::font::{Font, FontPoint, Glyph, OutlineCommand},
};

const MAX_MITER: f32 = 2.0;
const EPSILON: f32 = 1e-7;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextGeometryParams {
    /// Glyph size: one em in scene units.
    pub size: f32,
    /// Extrusion depth of the body, not counting the bevels.
    pub depth: f32,
    /// Line segments per outline curve.
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    /// How far the bevel reaches out along Z on each side.
    pub bevel_thickness: f32,
    /// How far the bevel pushes the outline outwards.
    pub bevel_size: f32,
    pub bevel_offset: f32,
    pub bevel_segments: u32,
}

impl Default for TextGeometryParams {
    fn default() -> Self {
        Self {
            size: 100.0,
            depth: 50.0,
            curve_segments: 12,
            bevel_enabled: false,
            bevel_thickness: 10.0,
            bevel_size: 8.0,
            bevel_offset: 0.0,
            bevel_segments: 3,
        }
    }
}

impl TextGeometryParams {
    /// The `(z, outline expansion)` profile swept by the side walls, front to back.
    fn rings(&self) -> Vec<(f32, f32)> {
        if !self.bevel_enabled {
            return vec![(0.0, 0.0), (self.depth, 0.0)];
        }
        let segments = self.bevel_segments.max(1);
        let bevel = |b: u32| {
            let t = b as f32 / segments as f32;
            (
                self.bevel_thickness * (t * FRAC_PI_2).cos(),
                self.bevel_size * (t * FRAC_PI_2).sin() + self.bevel_offset,
            )
        };
        let body = self.bevel_size + self.bevel_offset;
        let mut rings: Vec<(f32, f32)> = (0..segments).map(bevel).map(|(z, e)| (-z, e)).collect();
        rings.push((0.0, body));
        rings.push((self.depth, body));
        rings.extend((0..segments).rev().map(bevel).map(|(z, e)| (self.depth + z, e)));
        rings
    }
}

type Contour = Vec<[f32; 2]>;

/// Build the text mesh for `text`, centred on its bounding box.
///
/// `'\n'` starts a new line. Characters the font lacks fall back to `?` or are
/// skipped.
pub fn build_text_mesh(font: &Font, text: &str, params: &TextGeometryParams) -> Mesh {
    let scale = params.size / font.resolution;
    let line_height = font.line_height * scale;
    let rings = params.rings();
    let mut builder = MeshBuilder::default();

    let (mut x, mut y) = (0.0, 0.0);
    for ch in text.chars() {
        if ch == '\n' {
            x = 0.0;
            y -= line_height;
            continue;
        }
        let Some(glyph) = font.glyph(ch) else {
            log::warn!("font {:?} has no glyph for {ch:?}", font.family);
            continue;
        };
        let contours = glyph_contours(glyph, scale, [x, y], params.curve_segments.max(1));
        builder.extrude(&contours, &rings);
        x += glyph.advance * scale;
    }

    let mut mesh = Mesh::new("text", builder.vertices, builder.indices);
    mesh.center();
    mesh
}

/// [`build_text_mesh`] wrapped in a drawable scene node.
pub fn build_text_node(
    font: &Font,
    text: &str,
    params: &TextGeometryParams,
    material: Arc<Material>,
) -> SceneNode {
    let mesh = build_text_mesh(font, text, params);
    SceneNode::new("text").with_renderable(Renderable::new(mesh, material))
}

fn glyph_contours(glyph: &Glyph, scale: f32, offset: [f32; 2], segments: u32) -> Vec<Contour> {
    let map = |p: FontPoint| [p[0] * scale + offset[0], p[1] * scale + offset[1]];
    let mut contours = Vec::new();
    let mut current: Contour = Vec::new();
    let mut pen = offset;

    for command in &glyph.outline {
        match *command {
            OutlineCommand::MoveTo(p) => {
                finish_contour(&mut contours, std::mem::take(&mut current));
                pen = map(p);
                current.push(pen);
            }
            OutlineCommand::LineTo(p) => {
                if current.is_empty() {
                    current.push(pen);
                }
                pen = map(p);
                current.push(pen);
            }
            OutlineCommand::QuadTo { ctrl, to } => {
                if current.is_empty() {
                    current.push(pen);
                }
                let (c, end) = (map(ctrl), map(to));
                for i in 1..=segments {
                    let t = i as f32 / segments as f32;
                    let u = 1.0 - t;
                    current.push(std::array::from_fn(|k| {
                        u * u * pen[k] + 2.0 * u * t * c[k] + t * t * end[k]
                    }));
                }
                pen = end;
            }
            OutlineCommand::CubicTo { ctrl1, ctrl2, to } => {
                if current.is_empty() {
                    current.push(pen);
                }
                let (c1, c2, end) = (map(ctrl1), map(ctrl2), map(to));
                for i in 1..=segments {
                    let t = i as f32 / segments as f32;
                    let u = 1.0 - t;
                    current.push(std::array::from_fn(|k| {
                        u * u * u * pen[k]
                            + 3.0 * u * u * t * c1[k]
                            + 3.0 * u * t * t * c2[k]
                            + t * t * t * end[k]
                    }));
                }
                pen = end;
            }
            OutlineCommand::Close => finish_contour(&mut contours, std::mem::take(&mut current)),
        }
    }
    finish_contour(&mut contours, current);
    contours
}

fn finish_contour(contours: &mut Vec<Contour>, mut contour: Contour) {
    contour.dedup_by(|a, b| close_enough(*a, *b));
    while contour.len() > 1 && close_enough(contour[0], contour[contour.len() - 1]) {
        contour.pop();
    }
    if contour.len() >= 3 && signed_area(&contour).abs() > EPSILON {
        contours.push(contour);
    }
}

fn close_enough(a: [f32; 2], b: [f32; 2]) -> bool {
    (a[0] - b[0]).abs() <= EPSILON && (a[1] - b[1]).abs() <= EPSILON
}

/// Positive for counter-clockwise contours.
fn signed_area(contour: &[[f32; 2]]) -> f32 {
    let n = contour.len();
    (0..n)
        .map(|i| {
            let (a, b) = (contour[i], contour[(i + 1) % n]);
            a[0] * b[1] - b[0] * a[1]
        })
        .sum::<f32>()
        * 0.5
}

fn normalize2(v: [f32; 2]) -> Option<[f32; 2]> {
    let len = (v[0] * v[0] + v[1] * v[1]).sqrt();
    (len > EPSILON).then(|| [v[0] / len, v[1] / len])
}

/// Unit normal of every edge `i -> i + 1`, pointing away from the solid.
fn edge_normals(contour: &[[f32; 2]], solid_on_left: bool) -> Vec<[f32; 2]> {
    let n = contour.len();
    (0..n)
        .map(|i| {
            let (a, b) = (contour[i], contour[(i + 1) % n]);
            let d = [b[0] - a[0], b[1] - a[1]];
            let normal = if solid_on_left { [d[1], -d[0]] } else { [-d[1], d[0]] };
            normalize2(normal).unwrap_or([0.0, 0.0])
        })
        .collect()
}

/// Per-vertex offset that moves both adjacent edges outwards by one unit.
fn miter_vectors(edge_normals: &[[f32; 2]]) -> Vec<[f32; 2]> {
    let n = edge_normals.len();
    (0..n)
        .map(|i| {
            let before = edge_normals[(i + n - 1) % n];
            let after = edge_normals[i];
            let Some(m) = normalize2([before[0] + after[0], before[1] + after[1]]) else {
                return after;
            };
            let cos = m[0] * after[0] + m[1] * after[1];
            let length = if cos > 1.0 / MAX_MITER { 1.0 / cos } else { MAX_MITER };
            [m[0] * length, m[1] * length]
        })
        .collect()
}

fn expand(contour: &[[f32; 2]], miters: &[[f32; 2]], amount: f32) -> Contour {
    contour
        .iter()
        .zip(miters)
        .map(|(p, m)| [p[0] + m[0] * amount, p[1] + m[1] * amount])
        .collect()
}

#[derive(Default)]
struct MeshBuilder {
    vertices: Vec<ModelVertex>,
    indices: Vec<u32>,
}

impl MeshBuilder {
    fn extrude(&mut self, contours: &[Contour], rings: &[(f32, f32)]) {
        let Some(outer) = contours
            .iter()
            .map(|c| signed_area(c))
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        else {
            return;
        };
        // fonts wind their outer contours consistently, holes the other way
        let solid_on_left = outer > 0.0;

        let miters: Vec<Vec<[f32; 2]>> = contours
            .iter()
            .map(|c| miter_vectors(&edge_normals(c, solid_on_left)))
            .collect();

        let (front, back) = (rings[0], rings[rings.len() - 1]);
        let cap: Vec<Contour> = contours
            .iter()
            .zip(&miters)
            .map(|(c, m)| expand(c, m, front.1))
            .collect();
        self.caps(&cap, front.0, back.0);

        for (contour, miters) in contours.iter().zip(&miters) {
            let layers: Vec<(f32, Contour)> = rings
                .iter()
                .map(|&(z, amount)| (z, expand(contour, miters, amount)))
                .collect();
            for pair in layers.windows(2) {
                self.wall(&pair[0], &pair[1], solid_on_left);
            }
        }
    }

    fn caps(&mut self, contours: &[Contour], front_z: f32, back_z: f32) {
        let mut path = Path::builder();
        for contour in contours {
            path.begin(math::point(contour[0][0], contour[0][1]));
            for p in &contour[1..] {
                path.line_to(math::point(p[0], p[1]));
            }
            path.end(true);
        }
        let path = path.build();

        let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
        let result = FillTessellator::new().tessellate_path(
            &path,
            &FillOptions::default().with_fill_rule(FillRule::NonZero),
            &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| v.position().to_array()),
        );
        if let Err(e) = result {
            log::warn!("could not triangulate glyph caps: {e:?}");
            return;
        }

        for (z, normal, flip) in [(front_z, -1.0, true), (back_z, 1.0, false)] {
            let base = self.vertices.len() as u32;
            self.vertices.extend(buffers.vertices.iter().map(|p| ModelVertex {
                position: [p[0], p[1], z],
                tex_coords: *p,
                normal: [0.0, 0.0, normal],
            }));
            for tri in buffers.indices.chunks_exact(3) {
                if flip {
                    self.indices.extend([base + tri[0], base + tri[2], base + tri[1]]);
                } else {
                    self.indices.extend([base + tri[0], base + tri[1], base + tri[2]]);
                }
            }
        }
    }

    fn wall(&mut self, near: &(f32, Contour), far: &(f32, Contour), solid_on_left: bool) {
        let (z0, ring0) = near;
        let (z1, ring1) = far;
        let n = ring0.len();
        let lateral = edge_normals(ring0, solid_on_left);
        for i in 0..n {
            let j = (i + 1) % n;
            let a = [ring0[i][0], ring0[i][1], *z0];
            let b = [ring0[j][0], ring0[j][1], *z0];
            let c = [ring1[j][0], ring1[j][1], *z1];
            let d = [ring1[i][0], ring1[i][1], *z1];

            let out = [lateral[i][0], lateral[i][1], 0.0];
            let mut normal = face_normal(a, b, d).unwrap_or(out);
            let flip = dot(normal, out) < 0.0;
            if flip {
                normal = [-normal[0], -normal[1], -normal[2]];
            }

            let along_x = (a[0] - b[0]).abs() > (a[1] - b[1]).abs();
            let uv = |p: [f32; 3]| if along_x { [p[0], 1.0 - p[2]] } else { [p[1], 1.0 - p[2]] };
            let base = self.vertices.len() as u32;
            self.vertices.extend([a, b, c, d].map(|position| ModelVertex {
                position,
                tex_coords: uv(position),
                normal,
            }));
            if flip {
                self.indices.extend([base, base + 2, base + 1, base, base + 3, base + 2]);
            } else {
                self.indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
            }
        }
    }
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn face_normal(a: [f32; 3], b: [f32; 3], d: [f32; 3]) -> Option<[f32; 3]> {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [d[0] - a[0], d[1] - a[1], d[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = dot(n, n).sqrt();
    (len > EPSILON).then(|| [n[0] / len, n[1] / len, n[2] / len])
}
