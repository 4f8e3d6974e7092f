//! Developer tweak panel.
//!
//! A list of bindings from scene properties to editable values, driven from
//! the keyboard: `` ` `` shows or hides the panel, Tab and the up/down arrows
//! select a binding, left/right nudge a number by its step and Space flips a
//! flag. The panel has no on-screen widget: [`DebugPanel::lines`] is its
//! display, and the app writes those lines to the log at `info` after every
//! key press the panel handles.
//!
//! The panel only ever acts in response to a key press. A scene with and
//! without a panel attached ticks identically.

use cgmath::{Euler, Quaternion, Rad};
use winit::keyboard::KeyCode;

use crate::{data_structures::transform::Transform, scene::Scene};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DebugTarget {
    /// The first node with this name.
    Node(String),
    Camera,
    Controls,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Property {
    PositionX,
    PositionY,
    PositionZ,
    /// Euler angles in radians.
    RotationX,
    RotationY,
    RotationZ,
    /// Reads the x scale, writes all axes proportionally.
    Scale,
    Visible,
    Enabled,
    Damping,
    DampingFactor,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Number(f32),
    Bool(bool),
}

/// Bounds and increment of a numeric binding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Range {
    pub fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }
}

#[derive(Clone, Debug)]
struct Binding {
    target: DebugTarget,
    property: Property,
    range: Option<Range>,
}

impl Binding {
    fn label(&self) -> String {
        let target = match &self.target {
            DebugTarget::Node(name) => name.as_str(),
            DebugTarget::Camera => "camera",
            DebugTarget::Controls => "controls",
        };
        format!("{target}.{:?}", self.property)
    }
}

#[derive(Debug, Default)]
pub struct DebugPanel {
    bindings: Vec<Binding>,
    selected: usize,
    visible: bool,
}

impl DebugPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numbers without a range move in steps of 0.01 and are not clamped.
    pub fn bind(&mut self, target: DebugTarget, property: Property, range: Option<Range>) -> &mut Self {
        self.bindings.push(Binding {
            target,
            property,
            range,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Current value of binding `index`, `None` if its target does not exist
    /// (yet) or does not have the property.
    pub fn read(&self, scene: &Scene, index: usize) -> Option<Value> {
        let binding = self.bindings.get(index)?;
        match (&binding.target, binding.property) {
            (DebugTarget::Controls, Property::Enabled) => Some(Value::Bool(scene.controls.is_enabled())),
            (DebugTarget::Controls, Property::Damping) => Some(Value::Bool(scene.controls.enable_damping)),
            (DebugTarget::Controls, Property::DampingFactor) => {
                Some(Value::Number(scene.controls.damping_factor))
            }
            (DebugTarget::Controls, _) => None,
            (DebugTarget::Node(name), Property::Visible) => {
                let node = scene.node(scene.find(name)?)?;
                Some(Value::Bool(node.visible))
            }
            (DebugTarget::Node(name), property) => {
                let node = scene.node(scene.find(name)?)?;
                read_transform(&node.transform, property)
            }
            (DebugTarget::Camera, property) => {
                let camera = scene.node(scene.camera())?;
                read_transform(&camera.transform, property)
            }
        }
    }

    /// Write binding `index`. Numbers are clamped to the binding's range.
    pub fn set(&mut self, scene: &mut Scene, index: usize, value: Value) -> bool {
        let Some(binding) = self.bindings.get(index) else {
            return false;
        };
        let value = match (value, binding.range) {
            (Value::Number(n), Some(range)) => Value::Number(n.clamp(range.min, range.max)),
            (value, _) => value,
        };
        match (&binding.target, binding.property, value) {
            (DebugTarget::Controls, Property::Enabled, Value::Bool(b)) => scene.controls.set_enabled(b),
            (DebugTarget::Controls, Property::Damping, Value::Bool(b)) => scene.controls.enable_damping = b,
            (DebugTarget::Controls, Property::DampingFactor, Value::Number(n)) => {
                scene.controls.damping_factor = n
            }
            (DebugTarget::Node(name), Property::Visible, Value::Bool(b)) => {
                let Some(node) = scene.find(name).and_then(|id| scene.node_mut(id)) else {
                    return false;
                };
                node.visible = b;
            }
            (DebugTarget::Node(name), property, Value::Number(n)) => {
                let Some(node) = scene.find(name).and_then(|id| scene.node_mut(id)) else {
                    return false;
                };
                return write_transform(&mut node.transform, property, n);
            }
            (DebugTarget::Camera, property, Value::Number(n)) => {
                let Some(transform) = scene.camera_transform_mut() else {
                    return false;
                };
                return write_transform(transform, property, n);
            }
            _ => return false,
        }
        true
    }

    /// Step a number by `direction` steps, or flip a flag.
    pub fn nudge(&mut self, scene: &mut Scene, index: usize, direction: f32) -> bool {
        let Some(binding) = self.bindings.get(index) else {
            return false;
        };
        let step = binding.range.map_or(0.01, |r| r.step);
        let next = match self.read(scene, index) {
            Some(Value::Number(n)) => Value::Number(n + step * direction),
            Some(Value::Bool(b)) => Value::Bool(!b),
            None => return false,
        };
        self.set(scene, index, next)
    }

    /// Returns whether the key changed the panel or the scene.
    pub fn handle_key(&mut self, key: KeyCode, scene: &mut Scene) -> bool {
        if key == KeyCode::Backquote {
            self.visible = !self.visible;
            return true;
        }
        if !self.visible || self.bindings.is_empty() {
            return false;
        }
        let count = self.bindings.len();
        match key {
            KeyCode::Tab | KeyCode::ArrowDown => {
                self.selected = (self.selected + 1) % count;
                true
            }
            KeyCode::ArrowUp => {
                self.selected = (self.selected + count - 1) % count;
                true
            }
            KeyCode::ArrowRight => self.nudge(scene, self.selected, 1.0),
            KeyCode::ArrowLeft => self.nudge(scene, self.selected, -1.0),
            KeyCode::Space => match self.read(scene, self.selected) {
                Some(Value::Bool(b)) => self.set(scene, self.selected, Value::Bool(!b)),
                _ => false,
            },
            _ => false,
        }
    }

    /// One line per binding, the selected one marked.
    pub fn lines(&self, scene: &Scene) -> Vec<String> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, binding)| {
                let marker = if i == self.selected { '>' } else { ' ' };
                let value = match self.read(scene, i) {
                    Some(Value::Number(n)) => format!("{n:.3}"),
                    Some(Value::Bool(b)) => b.to_string(),
                    None => "-".into(),
                };
                format!("{marker} {} = {value}", binding.label())
            })
            .collect()
    }
}

fn read_transform(transform: &Transform, property: Property) -> Option<Value> {
    let euler = || Euler::<Rad<f32>>::from(transform.rotation);
    Some(match property {
        Property::PositionX => transform.position.x,
        Property::PositionY => transform.position.y,
        Property::PositionZ => transform.position.z,
        Property::RotationX => euler().x.0,
        Property::RotationY => euler().y.0,
        Property::RotationZ => euler().z.0,
        Property::Scale => transform.scale.x,
        _ => return None,
    })
    .filter(|n| n.is_finite())
    .map(Value::Number)
}

fn write_transform(transform: &mut Transform, property: Property, value: f32) -> bool {
    if !value.is_finite() {
        return false;
    }
    let mut euler = Euler::<Rad<f32>>::from(transform.rotation);
    match property {
        Property::PositionX => transform.position.x = value,
        Property::PositionY => transform.position.y = value,
        Property::PositionZ => transform.position.z = value,
        Property::RotationX => euler.x = Rad(value),
        Property::RotationY => euler.y = Rad(value),
        Property::RotationZ => euler.z = Rad(value),
        Property::Scale => {
            if transform.scale.x == 0.0 {
                transform.scale = cgmath::Vector3::new(value, value, value);
            } else {
                transform.scale *= value / transform.scale.x;
            }
        }
        _ => return false,
    }
    if matches!(
        property,
        Property::RotationX | Property::RotationY | Property::RotationZ
    ) {
        transform.rotation = Quaternion::from(euler);
    }
    true
}
