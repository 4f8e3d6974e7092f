#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::atomic::{AtomicU32, Ordering},
    time::{Duration, Instant},
};

use greeting_scene::{
    camera::Viewport,
    clock::FrameTime,
    config::Config,
    data_structures::transform::Transform,
    render::RenderTarget,
    resources::{AssetLoader, AssetSource, Spawner, font::Font},
    scene::Scene,
};

pub(crate) const UNITS_PER_EM: f32 = 1000.0;
pub(crate) const GLYPH_ADVANCE: f32 = 700.0;

/// Rectangles for every printable ASCII character, plus an `O` with a hole,
/// a quadratic ring `@` and a cubic disc `&`, all 600 units across.
pub(crate) fn block_font_json() -> String {
    let mut glyphs = serde_json::Map::new();
    for ch in ('!'..='~').filter(|c| !matches!(c, 'O' | '@' | '&')) {
        glyphs.insert(
            ch.to_string(),
            serde_json::json!({ "ha": GLYPH_ADVANCE, "o": "m 50 0 l 650 0 l 650 700 l 50 700 z" }),
        );
    }
    glyphs.insert(
        "O".into(),
        serde_json::json!({
            "ha": GLYPH_ADVANCE,
            "o": "m 50 0 l 650 0 l 650 700 l 50 700 z m 200 200 l 200 500 l 500 500 l 500 200 z"
        }),
    );
    glyphs.insert(
        "@".into(),
        serde_json::json!({
            "ha": GLYPH_ADVANCE,
            "o": concat!(
                "m 350 50 q 650 350 650 50 q 350 650 650 650 q 50 350 50 650 q 350 50 50 50 z ",
                "m 350 200 q 200 350 200 200 q 350 500 200 500 q 500 350 500 500 q 350 200 500 200 z"
            )
        }),
    );
    glyphs.insert(
        "&".into(),
        serde_json::json!({
            "ha": GLYPH_ADVANCE,
            "o": concat!(
                "m 350 50 b 650 350 515 50 650 185 b 350 650 650 515 515 650 ",
                "b 50 350 185 650 50 515 b 350 50 50 185 185 50 z"
            )
        }),
    );
    glyphs.insert(" ".into(), serde_json::json!({ "ha": 300 }));
    serde_json::json!({
        "glyphs": glyphs,
        "familyName": "Block",
        "resolution": UNITS_PER_EM,
        "boundingBox": { "xMin": 0, "xMax": 700, "yMin": -200, "yMax": 800 },
        "underlineThickness": 50
    })
    .to_string()
}

pub(crate) fn block_font() -> Font {
    Font::from_slice(block_font_json().as_bytes()).expect("fixture font parses")
}

pub(crate) fn viewport() -> Viewport {
    Viewport::new(800, 600, 1.0)
}

pub(crate) fn scene() -> Scene {
    Scene::new(&Config::default(), viewport())
}

pub(crate) fn time(secs: f32, frame: u64) -> FrameTime {
    FrameTime::at(Duration::from_secs_f32(secs), Duration::from_millis(16), frame)
}

/// What one rendered frame looked like.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub(crate) drawn: Vec<String>,
    pub(crate) camera: Transform,
    pub(crate) overlay_visible: bool,
}

/// Records the drawable nodes of every frame instead of drawing them.
#[derive(Debug, Default)]
pub(crate) struct RecordingTarget {
    pub(crate) frames: Vec<Frame>,
    pub(crate) fail_with: Option<wgpu::SurfaceError>,
}

impl RenderTarget for RecordingTarget {
    fn render(&mut self, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
        if let Some(error) = self.fail_with.clone() {
            return Err(error);
        }
        self.frames.push(Frame {
            drawn: scene
                .graph()
                .traverse()
                .filter(|visit| visit.is_drawable())
                .map(|visit| visit.node.name.clone())
                .collect(),
            camera: scene.camera_transform(),
            overlay_visible: scene.overlay.is_visible(),
        });
        Ok(())
    }
}

/// A fresh directory under the system temp dir.
pub(crate) fn temp_asset_dir(name: &str) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let dir = std::env::temp_dir().join(format!(
        "greeting-scene-{name}-{}-{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&dir).expect("temp dir");
    dir
}

pub(crate) fn write_png(dir: &PathBuf, file: &str, rgba: [u8; 4]) {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("asset subdir");
    }
    image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba))
        .save(&path)
        .expect("png written");
}

pub(crate) fn loader(runtime: &tokio::runtime::Runtime, dir: &PathBuf) -> AssetLoader {
    AssetLoader::new(
        AssetSource::new(dir.display().to_string()),
        Spawner::new(runtime.handle().clone()),
    )
}

/// Poll until every started load has been drained.
pub(crate) fn settle(loader: &mut AssetLoader, scene: &mut Scene) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        loader.poll(scene);
        if loader.in_flight() == 0 {
            loader.poll(scene);
            return;
        }
        assert!(Instant::now() < deadline, "assets did not settle in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// A binary glTF holding one triangle mesh on one named node, without normals.
pub(crate) fn triangle_glb(node_name: &str) -> Vec<u8> {
    let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bin: Vec<u8> = bytemuck::cast_slice(&positions).to_vec();
    bin.extend_from_slice(bytemuck::cast_slice(&indices));
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let json = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0, "name": node_name }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "buffers": [{ "byteLength": bin.len() }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    });
    let mut json = json.to_string().into_bytes();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E_4942u32.to_le_bytes());
    glb.extend_from_slice(&bin);
    glb
}
