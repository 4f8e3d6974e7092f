//! Scene configuration.
//!
//! [`Config::default`] describes the greeting as it ships. A `scene.json` in
//! the asset root can override any subset of it, and the asset root itself can
//! be moved with the `GREETING_ASSET_DIR` environment variable.

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::resources::text::TextGeometryParams;

pub const ASSET_DIR_ENV: &str = "GREETING_ASSET_DIR";
pub const CONFIG_FILE: &str = "scene.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory (native) or URL path (web) all asset paths are relative to.
    pub asset_root: String,
    pub window_title: String,
    pub clear_color: [f64; 4],
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub text: TextConfig,
    pub model: ModelConfig,
    pub background: Option<BackgroundConfig>,
    /// Textures loaded alongside the scene without anything depending on them.
    pub extra_textures: Vec<String>,
    pub overlay: bool,
    pub debug_panel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: "assets".into(),
            window_title: "Feliz Aniversário".into(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            text: TextConfig::default(),
            model: ModelConfig::default(),
            background: None,
            extra_textures: vec![
                "models/textures/tex1.png".into(),
                "models/textures/tex2.png".into(),
            ],
            overlay: true,
            debug_panel: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    /// Radius of the idle sway circle in the XY plane.
    pub sway_amplitude: f32,
    /// Angular speed of the sway in radians per second.
    pub sway_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 100.0,
            position: [0.0, 0.0, 1.9],
            sway_amplitude: 0.1,
            sway_speed: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enabled: bool,
    pub damping: bool,
    pub damping_factor: f32,
    pub target: [f32; 3],
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            damping: true,
            damping_factor: 0.05,
            target: [0.0; 3],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub content: String,
    pub font: String,
    pub matcap: String,
    pub geometry: TextGeometryParams,
    /// Where the centred text is placed.
    pub position: [f32; 3],
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            content: "Feliz\nAniversário,\nYnarinha!\n".into(),
            font: "fonts/Inter_Tight_Regular.json".into(),
            matcap: "textures/matcaps/2.png".into(),
            geometry: TextGeometryParams {
                size: 0.19,
                depth: 0.2,
                curve_segments: 5,
                bevel_enabled: true,
                bevel_thickness: 0.03,
                bevel_size: 0.02,
                bevel_offset: 0.0,
                bevel_segments: 5,
            },
            position: [0.0, 0.5, 0.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
    pub position: [f32; 3],
    /// Rotation about the local X axis, radians.
    pub rotation_x: f32,
    pub scale: [f32; 3],
    pub bob: Option<BobConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/source/mochi-mochi.glb".into(),
            position: [-0.23, -0.6, 0.0],
            rotation_x: -0.29,
            scale: [0.25, 0.25, 1.0],
            bob: None,
        }
    }
}

/// Vertical sine motion of the model around its configured height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BobConfig {
    pub amplitude: f32,
    pub speed: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackgroundShape {
    Sphere { radius: f32, segments: u32 },
    Box { width: f32, height: f32, depth: f32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackgroundConfig {
    pub shape: BackgroundShape,
    /// Matcap texture; flat `color` when absent.
    #[serde(default)]
    pub matcap: Option<String>,
    #[serde(default = "white")]
    pub color: [f32; 4],
    #[serde(default)]
    pub position: [f32; 3],
}

fn white() -> [f32; 4] {
    [1.0; 4]
}

impl Config {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid scene configuration")
    }

    /// Defaults, then `GREETING_ASSET_DIR`, then `scene.json` from the asset root.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> anyhow::Result<Self> {
        let root = std::env::var(ASSET_DIR_ENV).unwrap_or_else(|_| Config::default().asset_root);
        let path = std::path::Path::new(&root).join(CONFIG_FILE);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(json) => {
                log::info!("using {}", path.display());
                Self::from_json(&json).with_context(|| format!("in {}", path.display()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e).with_context(|| format!("cannot read {}", path.display())),
        };
        config.asset_root = root;
        Ok(config)
    }

    /// On the web the assets are served next to the page; there is no override file.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}
