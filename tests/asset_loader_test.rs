use std::{cell::Cell, rc::Rc};

use greeting_scene::{
    config::Config,
    data_structures::{model::TextureData, scene_graph::SceneNode, transform::Transform},
    greeting,
    resources::{
        AssetStatus,
        font::Font,
        gltf_model::{ModelAsset, subtree_bounds},
    },
};

use crate::common::test_utils::{block_font_json, loader, scene, settle, temp_asset_dir, triangle_glb, write_png};

mod common;

#[test]
fn textures_load_in_the_background() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = temp_asset_dir("texture");
    write_png(&dir, "matcap.png", [10, 20, 30, 255]);
    let mut scene = scene();
    let mut loader = loader(&runtime, &dir);

    let handle = loader.load::<TextureData>("matcap.png");
    assert_eq!(loader.status(handle.id()), AssetStatus::Loading);
    settle(&mut loader, &mut scene);

    assert_eq!(loader.status(handle.id()), AssetStatus::Ready);
    let texture = loader.get(&handle).unwrap();
    assert_eq!(texture.image.dimensions(), (2, 2));
    assert_eq!(texture.image.get_pixel(1, 1).0, [10, 20, 30, 255]);
    assert!(loader.is_idle());
}

#[test]
fn unreferenced_assets_are_released_after_loading() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = temp_asset_dir("release");
    write_png(&dir, "kept.png", [1; 4]);
    write_png(&dir, "dropped.png", [2; 4]);
    let mut scene = scene();
    let mut loader = loader(&runtime, &dir);

    let kept = loader.load::<TextureData>("kept.png");
    let dropped = loader.load::<TextureData>("dropped.png").id();
    settle(&mut loader, &mut scene);

    assert_eq!(loader.status(dropped), AssetStatus::Ready);
    assert_eq!(loader.resident(), 1);
    assert!(loader.get(&kept).is_some());
    assert!(loader.is_idle());

    let copy = kept.clone();
    drop(kept);
    loader.poll(&mut scene);
    assert!(loader.get(&copy).is_some());

    drop(copy);
    let report = loader.poll(&mut scene);
    assert_eq!(report.released, 1);
    assert_eq!(loader.resident(), 0);
}

#[test]
fn a_pending_continuation_keeps_its_assets() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = temp_asset_dir("retain");
    write_png(&dir, "matcap.png", [3; 4]);
    // an id the loader under test never issues, so the join cannot complete
    let mut other = loader(&runtime, &dir);
    other.load::<TextureData>("matcap.png");
    let never = other.load::<TextureData>("matcap.png").id();
    let mut scene = scene();
    let mut loader = loader(&runtime, &dir);

    let matcap = loader.load::<TextureData>("matcap.png").id();
    loader.when_ready(&[matcap, never], |_, _| {});
    settle(&mut loader, &mut scene);

    assert_eq!(loader.status(matcap), AssetStatus::Ready);
    assert_eq!(loader.pending_continuations(), 1);
    assert_eq!(loader.resident(), 1);
}

#[test]
fn a_failed_dependency_drops_the_continuation() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = temp_asset_dir("missing");
    write_png(&dir, "matcap.png", [255; 4]);
    let mut scene = scene();
    let mut loader = loader(&runtime, &dir);

    let matcap = loader.load::<TextureData>("matcap.png");
    let font = loader.load::<Font>("fonts/missing.json");
    let invoked = Rc::new(Cell::new(false));
    let flag = invoked.clone();
    loader.when_ready(&[matcap.id(), font.id()], move |_, _| flag.set(true));

    settle(&mut loader, &mut scene);

    assert!(!invoked.get());
    assert_eq!(loader.failed(), 1);
    assert_eq!(loader.status(font.id()), AssetStatus::Failed);
    assert_eq!(loader.status(matcap.id()), AssetStatus::Ready);
    assert_eq!(loader.pending_continuations(), 0);
}

#[test]
fn continuations_run_in_registration_order_once_all_deps_are_ready() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = temp_asset_dir("order");
    write_png(&dir, "a.png", [1; 4]);
    write_png(&dir, "b.png", [2; 4]);
    let mut scene = scene();
    let mut loader = loader(&runtime, &dir);

    let a = loader.load::<TextureData>("a.png");
    let b = loader.load::<TextureData>("b.png");
    loader.when_ready(&[a.id(), b.id()], |scene, _| {
        scene.add_to_root(SceneNode::new("first"));
    });
    loader.when_ready(&[b.id(), a.id()], move |scene, assets| {
        let texture = assets.get(&a).unwrap();
        assert_eq!(texture.image.get_pixel(0, 0).0, [1; 4]);
        scene.add_to_root(SceneNode::new("second"));
    });

    settle(&mut loader, &mut scene);
    scene.commit();

    let names: Vec<_> = scene
        .graph()
        .traverse()
        .filter(|v| v.depth == 1)
        .map(|v| v.node.name.clone())
        .collect();
    assert_eq!(names, vec!["camera", "first", "second"]);
}

#[test]
fn undecodable_images_fail_instead_of_panicking() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = temp_asset_dir("garbage");
    std::fs::write(dir.join("broken.png"), b"definitely not a png").unwrap();
    let mut scene = scene();
    let mut loader = loader(&runtime, &dir);

    let handle = loader.load::<TextureData>("broken.png");
    settle(&mut loader, &mut scene);
    assert_eq!(loader.status(handle.id()), AssetStatus::Failed);
    assert!(loader.get(&handle).is_none());
}

#[test]
fn glb_models_instantiate_into_scene_nodes() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = temp_asset_dir("glb");
    std::fs::write(dir.join("mochi.glb"), triangle_glb("Mochi")).unwrap();
    let mut scene = scene();
    let mut loader = loader(&runtime, &dir);

    let handle = loader.load::<ModelAsset>("mochi.glb");
    settle(&mut loader, &mut scene);
    let model = loader.get(&handle).expect("model loaded");
    assert_eq!(model.mesh_count(), 1);

    let root = model.instantiate();
    assert_eq!(root.name, "mochi.glb");
    assert!(root.renderable.is_none());
    let node = root.find_by_name("Mochi").expect("gltf node kept its name");
    let renderable = node.renderable.as_ref().expect("mesh attached");
    assert_eq!(renderable.mesh.indices, vec![0, 1, 2]);
    for v in &renderable.mesh.vertices {
        assert_eq!(v.normal, [0.0, 0.0, 1.0]);
    }

    // two instances share geometry but not nodes
    let again = model.instantiate();
    assert_ne!(again.id(), root.id());
    let again_node = again.find_by_name("Mochi").unwrap();
    assert!(std::sync::Arc::ptr_eq(
        &again_node.renderable.as_ref().unwrap().mesh,
        &renderable.mesh
    ));
}

#[test]
fn model_bounds_follow_the_placement() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = temp_asset_dir("glb-bounds");
    std::fs::write(dir.join("mochi.glb"), triangle_glb("Mochi")).unwrap();
    let mut scene = scene();
    let mut loader = loader(&runtime, &dir);

    let handle = loader.load::<ModelAsset>("mochi.glb");
    settle(&mut loader, &mut scene);
    let mut root = loader.get(&handle).expect("model loaded").instantiate();

    let bounds = subtree_bounds(&root).expect("triangle has bounds");
    assert_eq!([bounds.min.x, bounds.min.y, bounds.min.z], [0.0, 0.0, 0.0]);
    assert_eq!([bounds.max.x, bounds.max.y, bounds.max.z], [1.0, 1.0, 0.0]);

    root.transform = Transform::from_position(-1.0, 0.0, 0.0);
    root.transform.scale = cgmath::Vector3::new(0.25, 0.5, 1.0);
    let bounds = subtree_bounds(&root).unwrap();
    assert!((bounds.min.x + 1.0).abs() < 1e-6);
    assert!((bounds.max.x + 0.75).abs() < 1e-6);
    assert!((bounds.max.y - 0.5).abs() < 1e-6);

    assert!(subtree_bounds(&SceneNode::new("empty")).is_none());
}

#[test]
fn greeting_assembles_text_and_model_from_assets() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = temp_asset_dir("greeting");
    let config = Config::default();
    write_png(&dir, &config.text.matcap, [200; 4]);
    std::fs::create_dir_all(dir.join("fonts")).unwrap();
    std::fs::write(dir.join(&config.text.font), block_font_json()).unwrap();
    std::fs::create_dir_all(dir.join("models/source")).unwrap();
    std::fs::write(dir.join(&config.model.path), triangle_glb("Mochi")).unwrap();
    for path in &config.extra_textures {
        write_png(&dir, path, [0; 4]);
    }

    let mut scene = scene();
    let mut loader = loader(&runtime, &dir);
    greeting::assemble(&config, &mut scene, &mut loader);
    settle(&mut loader, &mut scene);
    scene.commit();

    assert_eq!(loader.failed(), 0);
    assert_eq!(loader.resident(), 0);
    let text = scene.node(scene.find(greeting::TEXT_NODE).unwrap()).unwrap();
    assert_eq!(text.transform.position.y, 0.5);
    let model = scene.node(scene.find(greeting::MODEL_NODE).unwrap()).unwrap();
    assert_eq!(model.transform.position.x, -0.23);
    assert_eq!(model.transform.position.y, -0.6);
    assert_eq!(model.transform.scale.x, 0.25);
}

#[test]
fn greeting_without_a_model_still_shows_the_text() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = temp_asset_dir("no-model");
    let config = Config::default();
    write_png(&dir, &config.text.matcap, [200; 4]);
    std::fs::create_dir_all(dir.join("fonts")).unwrap();
    std::fs::write(dir.join(&config.text.font), block_font_json()).unwrap();

    let mut scene = scene();
    let mut loader = loader(&runtime, &dir);
    greeting::assemble(&config, &mut scene, &mut loader);
    settle(&mut loader, &mut scene);
    scene.commit();

    assert!(scene.find(greeting::TEXT_NODE).is_some());
    assert!(scene.find(greeting::MODEL_NODE).is_none());
    assert_eq!(loader.failed(), 1 + config.extra_textures.len());
}
