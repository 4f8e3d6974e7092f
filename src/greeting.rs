//! The greeting itself: what is loaded, where it goes and how it moves.
//!
//! [`assemble`] starts every load and registers the continuations that build
//! the scene content once their assets arrive; nothing waits on anything
//! else. [`install_mutators`] adds the per-tick behaviour.

use std::{f32::consts::PI, sync::Arc};

use cgmath::Rad;

use crate::{
    config::{BackgroundConfig, BackgroundShape, Config},
    data_structures::{
        model::{Material, Renderable, Shading, TextureData},
        primitives,
        scene_graph::{NodeId, SceneNode},
        transform::Transform,
    },
    debug::{DebugPanel, DebugTarget, Property, Range},
    flow::FrameScheduler,
    resources::{
        AssetLoader,
        font::Font,
        gltf_model::{ModelAsset, subtree_bounds},
        text::build_text_node,
    },
    scene::Scene,
};

pub const TEXT_NODE: &str = "text";
pub const MODEL_NODE: &str = "model";
pub const BACKGROUND_NODE: &str = "background";

/// Start all loads and register what happens when they complete.
pub fn assemble(config: &Config, scene: &mut Scene, loader: &mut AssetLoader) {
    let matcap = loader.load::<TextureData>(&config.text.matcap);
    let font = loader.load::<Font>(&config.text.font);
    let model = loader.load::<ModelAsset>(&config.model.path);
    for path in &config.extra_textures {
        loader.load::<TextureData>(path);
    }

    let text = config.text.clone();
    loader.when_ready(&[font.id(), matcap.id()], move |scene, assets| {
        let (Some(font), Some(matcap)) = (assets.get(&font), assets.get(&matcap)) else {
            return;
        };
        let material = Arc::new(Material::matcap("text", matcap));
        let mut node = build_text_node(&font, &text.content, &text.geometry, material);
        node.name = TEXT_NODE.into();
        let [x, y, z] = text.position;
        node.transform.position = cgmath::Vector3::new(x, y, z);
        scene.add_to_root(node);
    });

    let placement = model_transform(config);
    loader.on_ready(model, move |scene, model| {
        let mut node = model.instantiate();
        node.name = MODEL_NODE.into();
        node.transform = placement;
        match subtree_bounds(&node) {
            Some(bounds) => log::info!(
                "placing {} ({} meshes), extent {:?}",
                model.name,
                model.mesh_count(),
                bounds.size()
            ),
            None => log::warn!("{} has no geometry", model.name),
        }
        scene.add_to_root(node);
    });

    if let Some(background) = config.background.clone() {
        match &background.matcap {
            Some(path) => {
                let matcap = loader.load::<TextureData>(path);
                loader.on_ready(matcap, move |scene, matcap| {
                    let material = Arc::new(Material::matcap(BACKGROUND_NODE, matcap));
                    scene.add_to_root(background_node(&background, material));
                });
            }
            None => {
                let material = Arc::new(Material::new(
                    BACKGROUND_NODE,
                    Shading::Color,
                    background.color,
                ));
                scene.add_to_root(background_node(&background, material));
            }
        }
    }
}

fn model_transform(config: &Config) -> Transform {
    let [x, y, z] = config.model.position;
    let mut transform = Transform::from_position(x, y, z);
    transform.rotate_x(Rad(config.model.rotation_x));
    transform.scale = config.model.scale.into();
    transform
}

fn background_node(background: &BackgroundConfig, material: Arc<Material>) -> SceneNode {
    let mesh = match background.shape {
        BackgroundShape::Sphere { radius, segments } => {
            primitives::sphere(radius, segments, (segments / 2).max(2))
        }
        BackgroundShape::Box {
            width,
            height,
            depth,
        } => primitives::cuboid(width, height, depth),
    };
    let [x, y, z] = background.position;
    SceneNode::new(BACKGROUND_NODE)
        .with_renderable(Renderable::new(mesh, material))
        .with_transform(Transform::from_position(x, y, z))
}

/// Per-tick behaviour, in order: orbit controls, idle camera sway, model bob.
pub fn install_mutators(config: &Config, scheduler: &mut FrameScheduler) {
    scheduler.add_fn("orbit-controls", |scene, _| {
        scene.update_controls();
    });

    let camera = config.camera.clone();
    scheduler.add_fn("camera-sway", move |scene, time| {
        // Hand-driven camera wins over the sway.
        if scene.controls.is_enabled() {
            return;
        }
        let target = scene.controls.target;
        let t = time.elapsed_secs() * camera.sway_speed;
        let Some(transform) = scene.camera_transform_mut() else {
            return;
        };
        transform.position.x = t.sin() * camera.sway_amplitude;
        transform.position.y = -t.cos() * camera.sway_amplitude;
        transform.look_at(target, cgmath::Vector3::unit_y());
    });

    if let Some(bob) = config.model.bob {
        let base = config.model.position[1];
        let mut model: Option<NodeId> = None;
        scheduler.add_fn("model-bob", move |scene, time| {
            if model.is_none_or(|id| scene.node(id).is_none()) {
                model = scene.find(MODEL_NODE);
            }
            let Some(node) = model.and_then(|id| scene.node_mut(id)) else {
                return;
            };
            node.transform.position.y = base + (time.elapsed_secs() * bob.speed).sin() * bob.amplitude;
        });
    }
}

/// The default set of tweakable values.
pub fn debug_panel() -> DebugPanel {
    let node = |name: &str| DebugTarget::Node(name.into());
    let mut panel = DebugPanel::new();
    panel
        .bind(node(TEXT_NODE), Property::PositionY, Some(Range::new(-2.0, 2.0, 0.01)))
        .bind(node(TEXT_NODE), Property::Visible, None)
        .bind(node(MODEL_NODE), Property::PositionX, Some(Range::new(-2.0, 2.0, 0.01)))
        .bind(node(MODEL_NODE), Property::PositionY, Some(Range::new(-2.0, 2.0, 0.01)))
        .bind(node(MODEL_NODE), Property::RotationX, Some(Range::new(-PI, PI, 0.01)))
        .bind(node(MODEL_NODE), Property::Scale, Some(Range::new(0.01, 2.0, 0.01)))
        .bind(node(MODEL_NODE), Property::Visible, None)
        .bind(DebugTarget::Camera, Property::PositionZ, Some(Range::new(0.5, 10.0, 0.05)))
        .bind(DebugTarget::Controls, Property::Enabled, None)
        .bind(DebugTarget::Controls, Property::Damping, None)
        .bind(DebugTarget::Controls, Property::DampingFactor, Some(Range::new(0.0, 1.0, 0.01)));
    panel
}
