//! The composition root everything per-frame works on.
//!
//! A [`Scene`] owns the scene graph, the camera node and its projection, the
//! orbit controls, the letter overlay and the viewport. It is created once by
//! the application and handed by reference to asset continuations, tick
//! mutators, input handling and the renderer.

use log::warn;

use crate::{
    camera::{Projection, Viewport},
    config::Config,
    controls::{OrbitControls, PointerInput},
    data_structures::{
        scene_graph::{CommitReport, NodeId, SceneGraph, SceneNode},
        transform::Transform,
    },
    overlay::{OverlayPanel, OverlayStyle},
};

pub struct Scene {
    graph: SceneGraph,
    camera: NodeId,
    pub projection: Projection,
    pub controls: OrbitControls,
    pub overlay: OverlayPanel,
    /// Whether the overlay is drawn and receives clicks at all.
    pub overlay_enabled: bool,
    pub clear_color: [f64; 4],
    viewport: Viewport,
}

impl Scene {
    /// A scene holding only the camera, already attached to the root.
    pub fn new(config: &Config, viewport: Viewport) -> Self {
        let mut graph = SceneGraph::new();
        let [x, y, z] = config.camera.position;
        let camera = graph.add(
            graph.root(),
            SceneNode::new("camera").with_transform(Transform::from_position(x, y, z)),
        );
        graph.commit();

        let projection = Projection::new(
            viewport.width,
            viewport.height,
            cgmath::Deg(config.camera.fov_degrees),
            config.camera.near,
            config.camera.far,
        );

        let [tx, ty, tz] = config.controls.target;
        let mut controls = OrbitControls::new(cgmath::Point3::new(tx, ty, tz));
        controls.enable_damping = config.controls.damping;
        controls.damping_factor = config.controls.damping_factor;
        controls.set_enabled(config.controls.enabled);
        controls.set_viewport_height((viewport.height as f64 * viewport.device_pixel_ratio).round() as u32);

        Self {
            graph,
            camera,
            projection,
            controls,
            overlay: OverlayPanel::new(&viewport, OverlayStyle::default()),
            overlay_enabled: config.overlay,
            clear_color: config.clear_color,
            viewport,
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn root(&self) -> NodeId {
        self.graph.root()
    }

    /// Stage `node` under `parent`; it is drawn from the next tick on.
    pub fn add(&mut self, parent: NodeId, node: SceneNode) -> NodeId {
        self.graph.add(parent, node)
    }

    /// Stage `node` under the root.
    pub fn add_to_root(&mut self, node: SceneNode) -> NodeId {
        self.graph.add(self.graph.root(), node)
    }

    /// Stage removal of a node and its subtree. The camera cannot be removed.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.camera {
            warn!("the camera node stays in the scene");
            return;
        }
        self.graph.remove(node);
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.graph.node(id)
    }

    /// In-place edits (transform, visibility) take effect immediately.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.graph.node_mut(id)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.graph.find_by_name(name).map(SceneNode::id)
    }

    /// Apply staged additions and removals. Called at the start of every tick.
    pub fn commit(&mut self) -> CommitReport {
        self.graph.commit()
    }

    pub fn camera(&self) -> NodeId {
        self.camera
    }

    /// Local transform of the camera node, which hangs directly under the root.
    pub fn camera_transform(&self) -> Transform {
        self.graph
            .node(self.camera)
            .map(|node| node.transform)
            .unwrap_or_default()
    }

    pub fn camera_world_matrix(&self) -> cgmath::Matrix4<f32> {
        self.graph
            .world_matrix(self.camera)
            .unwrap_or_else(|| self.camera_transform().to_matrix())
    }

    /// Local transform of the camera node.
    pub fn camera_transform_mut(&mut self) -> Option<&mut Transform> {
        self.graph.node_mut(self.camera).map(|node| &mut node.transform)
    }

    /// Run the orbit controls against the camera node.
    pub fn update_controls(&mut self) -> bool {
        let Some(camera) = self.graph.node_mut(self.camera) else {
            return false;
        };
        self.controls.update(&mut camera.transform)
    }

    /// Pointer input in window pixels. Clicks on the overlay never reach the controls.
    pub fn handle_pointer(&mut self, input: PointerInput) -> bool {
        if self.overlay_enabled {
            if let PointerInput::Press { x, y } = input {
                let ratio = self.viewport.device_pixel_ratio.max(f64::MIN_POSITIVE) as f32;
                let (lx, ly) = (x as f32 / ratio, y as f32 / ratio);
                if self.overlay.captures(lx, ly) {
                    self.overlay.handle_click(lx, ly);
                    return true;
                }
            }
        }
        self.controls.handle_input(input)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Follow a change of the display surface.
    ///
    /// `width`/`height` are logical pixels. Returns the output buffer size in
    /// physical pixels, at a pixel ratio capped at 2.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f64) -> (u32, u32) {
        self.viewport = Viewport::new(width, height, device_pixel_ratio);
        self.projection.resize(width, height);
        self.overlay.layout(&self.viewport);
        self.controls
            .set_viewport_height((height as f64 * device_pixel_ratio).round() as u32);
        self.viewport.buffer_size()
    }
}
