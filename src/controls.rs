//! Orbit camera controls.
//!
//! Pointer drags orbit the camera around a fixed target (yaw/pitch), the wheel
//! or a two-finger pinch zooms. Input only accumulates a pending delta; the
//! delta is applied to the camera node in [`OrbitControls::update`], once per
//! tick. With damping the delta is eased in exponentially and decays to rest.
//!
//! Disabled controls ignore input completely: nothing is recorded, and
//! disabling discards whatever delta or drag was still pending.

use std::{collections::HashMap, f32::consts::PI};

use cgmath::{EuclideanSpace, InnerSpace};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent};

use crate::data_structures::transform::Transform;

/// Pending deltas below this are snapped to rest.
const REST_EPSILON: f32 = 1e-5;
/// Keeps the camera off the poles where the up vector degenerates.
const POLE_EPSILON: f32 = 1e-6;
const PIXELS_PER_WHEEL_LINE: f32 = 100.0;

/// Device-independent pointer input, in physical pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerInput {
    Press { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Release,
    /// Positive values zoom in.
    Scroll(f32),
    TouchStart { id: u64, x: f64, y: f64 },
    TouchMove { id: u64, x: f64, y: f64 },
    TouchEnd { id: u64 },
}

impl PointerInput {
    /// Translate the winit events the controls care about.
    pub fn from_window_event(event: &WindowEvent, cursor: (f64, f64)) -> Option<Self> {
        match event {
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => Some(Self::Press {
                x: cursor.0,
                y: cursor.1,
            }),
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => Some(Self::Release),
            WindowEvent::CursorMoved { position, .. } => Some(Self::Move {
                x: position.x,
                y: position.y,
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_WHEEL_LINE,
                };
                (steps != 0.0).then_some(Self::Scroll(steps))
            }
            WindowEvent::Touch(touch) => {
                let (id, x, y) = (touch.id, touch.location.x, touch.location.y);
                Some(match touch.phase {
                    TouchPhase::Started => Self::TouchStart { id, x, y },
                    TouchPhase::Moved => Self::TouchMove { id, x, y },
                    TouchPhase::Ended | TouchPhase::Cancelled => Self::TouchEnd { id },
                })
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct OrbitDelta {
    theta: f32,
    phi: f32,
    scale: f32,
}

impl OrbitDelta {
    const REST: Self = Self {
        theta: 0.0,
        phi: 0.0,
        scale: 1.0,
    };
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    /// Polar angle from +Y.
    pub phi: f32,
    /// Azimuth around +Y, measured from +Z.
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(v: cgmath::Vector3<f32>) -> Self {
        let radius = v.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> cgmath::Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        cgmath::Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Debug)]
pub struct OrbitControls {
    enabled: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub target: cgmath::Point3<f32>,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    viewport_height: f32,
    pending: OrbitDelta,
    drag: Option<(f64, f64)>,
    touches: HashMap<u64, (f64, f64)>,
}

impl OrbitControls {
    pub fn new(target: cgmath::Point3<f32>) -> Self {
        Self {
            enabled: true,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            target,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            viewport_height: 1.0,
            pending: OrbitDelta::REST,
            drag: None,
            touches: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enabling starts from rest; disabling drops pending deltas and drags.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.pending = OrbitDelta::REST;
        self.drag = None;
        self.touches.clear();
        log::info!("orbit controls {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Physical height of the surface; a drag over its full height turns 360°.
    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// No orbit or zoom left to apply.
    pub fn is_at_rest(&self) -> bool {
        self.pending == OrbitDelta::REST
    }

    /// Feed one input event. Returns whether the controls consumed it.
    pub fn handle_input(&mut self, input: PointerInput) -> bool {
        if !self.enabled {
            return false;
        }
        match input {
            PointerInput::Press { x, y } => {
                self.drag = Some((x, y));
                true
            }
            PointerInput::Move { x, y } => match self.drag {
                Some((last_x, last_y)) => {
                    self.rotate_by_pixels((x - last_x) as f32, (y - last_y) as f32);
                    self.drag = Some((x, y));
                    true
                }
                None => false,
            },
            PointerInput::Release => self.drag.take().is_some(),
            PointerInput::Scroll(steps) => {
                self.zoom(steps);
                true
            }
            PointerInput::TouchStart { id, x, y } => {
                self.touches.insert(id, (x, y));
                true
            }
            PointerInput::TouchMove { id, x, y } => self.touch_move(id, x, y),
            PointerInput::TouchEnd { id } => self.touches.remove(&id).is_some(),
        }
    }

    fn touch_move(&mut self, id: u64, x: f64, y: f64) -> bool {
        let Some(&(last_x, last_y)) = self.touches.get(&id) else {
            return false;
        };
        match self.touches.len() {
            1 => self.rotate_by_pixels((x - last_x) as f32, (y - last_y) as f32),
            2 => {
                let other = self
                    .touches
                    .iter()
                    .find(|(other_id, _)| **other_id != id)
                    .map(|(_, pos)| *pos);
                if let Some((ox, oy)) = other {
                    let before = ((last_x - ox).powi(2) + (last_y - oy).powi(2)).sqrt() as f32;
                    let after = ((x - ox).powi(2) + (y - oy).powi(2)).sqrt() as f32;
                    if before > 0.0 && after > 0.0 {
                        // fingers apart shrink the orbit radius
                        self.pending.scale *= (before / after).powf(self.zoom_speed);
                    }
                }
            }
            _ => (),
        }
        self.touches.insert(id, (x, y));
        true
    }

    fn rotate_by_pixels(&mut self, dx: f32, dy: f32) {
        let full_turn = 2.0 * PI * self.rotate_speed / self.viewport_height;
        self.pending.theta -= dx * full_turn;
        self.pending.phi -= dy * full_turn;
    }

    /// Zoom by wheel steps; positive values move the camera closer.
    pub fn zoom(&mut self, steps: f32) {
        if !self.enabled {
            return;
        }
        self.pending.scale *= 0.95f32.powf(self.zoom_speed * steps);
    }

    /// Apply pending orbit and zoom to the camera transform.
    ///
    /// Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Transform) -> bool {
        if !self.enabled || self.is_at_rest() {
            return false;
        }
        let offset = camera.position - self.target.to_vec();
        let mut spherical = Spherical::from_offset(offset);

        let step = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.pending.theta * step;
        spherical.phi = (spherical.phi + self.pending.phi * step)
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(POLE_EPSILON, PI - POLE_EPSILON);
        spherical.radius =
            (spherical.radius * self.pending.scale).clamp(self.min_distance, self.max_distance);

        camera.position = self.target.to_vec() + spherical.to_offset();
        camera.look_at(self.target, cgmath::Vector3::unit_y());

        self.pending.scale = 1.0;
        if self.enable_damping {
            self.pending.theta *= 1.0 - self.damping_factor;
            self.pending.phi *= 1.0 - self.damping_factor;
            if self.pending.theta.abs() < REST_EPSILON {
                self.pending.theta = 0.0;
            }
            if self.pending.phi.abs() < REST_EPSILON {
                self.pending.phi = 0.0;
            }
        } else {
            self.pending = OrbitDelta::REST;
        }
        true
    }
}
