//! greeting-scene
//!
//! A small cross-platform 3D greeting: extruded matcap text and a loaded glTF
//! model in a scene graph, a gently swaying camera with optional orbit
//! controls and a letter overlay, drawn with wgpu natively and on the web.
//!
//! High-level modules
//! - `camera`: projection, viewport and the camera uniform
//! - `clock`: the per-tick time source
//! - `config`: scene configuration with shipped defaults
//! - `context`: window, surface, device and the pipelines created once from it
//! - `controls`: orbit camera controls driven by pointer input
//! - `data_structures`: transforms, the scene graph, meshes, materials, textures
//! - `debug`: keyboard-driven tweak panel for developers
//! - `flow`: frame scheduler, tick mutators and the event loop
//! - `greeting`: what the greeting loads, where it goes and how it moves
//! - `overlay`: the open/close letter panel on top of the scene
//! - `pipelines`: render pipelines for meshes and the overlay
//! - `render`: drawing a scene to the window
//! - `resources`: asynchronous asset loading, fonts, text meshes and glTF models
//! - `scene`: the scene all of the above work on
//!

pub mod camera;
pub mod clock;
pub mod config;
pub mod context;
pub mod controls;
pub mod data_structures;
pub mod debug;
pub mod flow;
pub mod greeting;
pub mod overlay;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use config::Config;
pub use flow::run;
pub use scene::Scene;
pub use wgpu;
pub use winit::event::WindowEvent;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() -> Result<(), wasm_bindgen::JsValue> {
    let config = Config::load().map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{e:#}")))?;
    run(config).map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{e:#}")))
}
