//! glTF / GLB models.
//!
//! A model decodes into a template tree that shares its meshes, materials and
//! textures. [`ModelAsset::instantiate`] turns the template into a fresh scene
//! node subtree, so one loaded model can be placed any number of times. The
//! subtree root is a grouping node without geometry.

use std::{collections::HashMap, sync::Arc};

use crate::{
    data_structures::{
        model::{Aabb, Material, Mesh, ModelVertex, Renderable, Shading, TextureData},
        scene_graph::SceneNode,
        transform::Transform,
    },
    resources::{AssetSource, LoadError, decode_texture},
};

#[derive(Debug)]
struct ModelNode {
    name: String,
    transform: Transform,
    parts: Vec<Renderable>,
    children: Vec<ModelNode>,
}

impl ModelNode {
    fn instantiate(&self) -> SceneNode {
        let mut node = SceneNode::new(self.name.clone()).with_transform(self.transform);
        match self.parts.as_slice() {
            [single] => node.renderable = Some(single.clone()),
            parts => {
                for (i, part) in parts.iter().enumerate() {
                    node.push_child(
                        SceneNode::new(format!("{}#{i}", self.name)).with_renderable(part.clone()),
                    );
                }
            }
        }
        for child in &self.children {
            node.push_child(child.instantiate());
        }
        node
    }

    fn mesh_count(&self) -> usize {
        self.parts.len() + self.children.iter().map(ModelNode::mesh_count).sum::<usize>()
    }
}

#[derive(Debug)]
pub struct ModelAsset {
    pub name: String,
    root: ModelNode,
}

impl ModelAsset {
    /// A new scene subtree for this model.
    pub fn instantiate(&self) -> SceneNode {
        self.root.instantiate()
    }

    /// Number of drawable primitives.
    pub fn mesh_count(&self) -> usize {
        self.root.mesh_count()
    }
}

pub async fn load_model(source: &AssetSource, file_name: &str) -> Result<ModelAsset, LoadError> {
    let model_err = |source: gltf::Error| LoadError::Model {
        path: file_name.to_string(),
        source,
    };
    let bytes = source.load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&bytes).map_err(model_err)?;

    // external buffers are fetched concurrently
    let blob = gltf.blob.as_deref();
    let buffer_data: Vec<Vec<u8>> =
        futures::future::try_join_all(gltf.buffers().map(|buffer| async move {
            match buffer.source() {
                gltf::buffer::Source::Bin => {
                    blob.map(<[u8]>::to_vec).ok_or_else(|| LoadError::Unsupported {
                        path: file_name.to_string(),
                        reason: "binary chunk referenced but missing".into(),
                    })
                }
                gltf::buffer::Source::Uri(uri) => {
                    source.load_binary(&sibling_path(file_name, uri)?).await
                }
            }
        }))
        .await?;

    let mut textures: HashMap<usize, Arc<TextureData>> = HashMap::new();
    for texture in gltf.textures() {
        let image = texture.source();
        if textures.contains_key(&image.index()) {
            continue;
        }
        let label = format!("{file_name}#image{}", image.index());
        let data = match image.source() {
            gltf::image::Source::View { view, .. } => {
                let buffer = &buffer_data[view.buffer().index()];
                let bytes = buffer
                    .get(view.offset()..view.offset() + view.length())
                    .ok_or_else(|| LoadError::Unsupported {
                        path: file_name.to_string(),
                        reason: format!("image {} lies outside its buffer", image.index()),
                    })?;
                decode_texture(&label, bytes)?
            }
            gltf::image::Source::Uri { uri, .. } => {
                let bytes = source.load_binary(&sibling_path(file_name, uri)?).await?;
                decode_texture(&label, &bytes)?
            }
        };
        textures.insert(image.index(), Arc::new(data));
    }

    let default_material = Arc::new(Material::new("default", Shading::Color, [1.0; 4]));
    let materials: Vec<Arc<Material>> = gltf
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let texture = pbr
                .base_color_texture()
                .and_then(|info| textures.get(&info.texture().source().index()).cloned());
            let shading = match texture {
                Some(texture) => Shading::Textured(texture),
                None => Shading::Color,
            };
            let name = material.name().unwrap_or("material");
            Arc::new(Material::new(name, shading, pbr.base_color_factor()))
        })
        .collect();

    let mut meshes: HashMap<usize, Vec<Renderable>> = HashMap::new();
    for mesh in gltf.meshes() {
        let mut parts = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "{file_name}: skipping {:?} primitive of mesh {}",
                    primitive.mode(),
                    mesh.index()
                );
                continue;
            }
            let Some(mesh_data) = read_primitive(&primitive, &buffer_data, mesh.name()) else {
                log::warn!("{file_name}: mesh {} has a primitive without positions", mesh.index());
                continue;
            };
            let material = primitive
                .material()
                .index()
                .and_then(|i| materials.get(i).cloned())
                .unwrap_or_else(|| default_material.clone());
            parts.push(Renderable::new(mesh_data, material));
        }
        meshes.insert(mesh.index(), parts);
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| LoadError::Unsupported {
            path: file_name.to_string(),
            reason: "model has no scene".into(),
        })?;
    let name = file_name.rsplit('/').next().unwrap_or(file_name).to_string();
    let root = ModelNode {
        name: name.clone(),
        transform: Transform::default(),
        parts: Vec::new(),
        children: scene.nodes().map(|node| to_model_node(node, &meshes)).collect(),
    };
    log::debug!("{file_name}: {} primitives", root.mesh_count());

    Ok(ModelAsset { name, root })
}

fn to_model_node(node: gltf::Node, meshes: &HashMap<usize, Vec<Renderable>>) -> ModelNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform {
        position: translation.into(),
        rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };
    ModelNode {
        name: node.name().unwrap_or("node").to_string(),
        transform,
        parts: node
            .mesh()
            .and_then(|mesh| meshes.get(&mesh.index()).cloned())
            .unwrap_or_default(),
        children: node.children().map(|child| to_model_node(child, meshes)).collect(),
    }
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffer_data: &[Vec<u8>],
    name: Option<&str>,
) -> Option<Mesh> {
    let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let mut normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|n| n.collect())
        .unwrap_or_default();
    let tex_coords: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|t| t.into_f32().collect())
        .unwrap_or_default();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if normals.len() != positions.len() {
        normals = vertex_normals(&positions, &indices);
    }

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, position)| ModelVertex {
            position: *position,
            tex_coords: tex_coords.get(i).copied().unwrap_or([0.0; 2]),
            normal: normals[i],
        })
        .collect();
    Some(Mesh::new(name.unwrap_or("mesh"), vertices, indices))
}

/// Area-weighted smooth normals for meshes that ship without them.
fn vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    use cgmath::InnerSpace;

    let mut normals = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
        if a.max(b).max(c) >= positions.len() {
            continue;
        }
        let pa = cgmath::Vector3::from(positions[a]);
        let n = (cgmath::Vector3::from(positions[b]) - pa).cross(cgmath::Vector3::from(positions[c]) - pa);
        for i in [a, b, c] {
            normals[i] += n;
        }
    }
    normals
        .into_iter()
        .map(|n| {
            if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}

/// Resolve a relative URI next to the model file.
fn sibling_path(model_path: &str, uri: &str) -> Result<String, LoadError> {
    if uri.starts_with("data:") {
        return Err(LoadError::Unsupported {
            path: model_path.to_string(),
            reason: "embedded data URIs are not supported, use a .glb".into(),
        });
    }
    Ok(match model_path.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{uri}"),
        None => uri.to_string(),
    })
}

/// Bounds of every mesh in a subtree, in the space of the subtree's parent.
pub fn subtree_bounds(node: &SceneNode) -> Option<Aabb> {
    fn visit(node: &SceneNode, parent: cgmath::Matrix4<f32>, acc: &mut Option<Aabb>) {
        let world = parent * node.transform.to_matrix();
        if let Some(bounds) = node.renderable.as_ref().and_then(|r| r.mesh.bounds()) {
            for corner in bounds.corners() {
                let p = world * corner.to_homogeneous();
                let p = cgmath::Point3::new(p.x, p.y, p.z);
                *acc = Some(match acc.take() {
                    Some(aabb) => aabb.including(p),
                    None => Aabb { min: p, max: p },
                });
            }
        }
        for child in node.children() {
            visit(child, world, acc);
        }
    }
    let mut acc = None;
    visit(node, cgmath::SquareMatrix::identity(), &mut acc);
    acc
}
