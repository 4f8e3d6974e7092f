//! Engine data structures: transforms, the scene graph and renderable data.
//!
//! - `transform` holds node transforms and their GPU instance layout
//! - `scene_graph` enables hierarchical scene organization
//! - `model` contains meshes, materials and decoded texture data
//! - `primitives` builds procedural meshes (sphere, box)
//! - `texture` contains GPU texture wrapper and creation utilities

pub mod model;
pub mod primitives;
pub mod scene_graph;
pub mod texture;
pub mod transform;
