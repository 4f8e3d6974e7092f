//! The letter overlay.
//!
//! A panel drawn over the 3D scene with two designated controls: "open"
//! (shown while the letter is hidden) and "close" (shown on the letter
//! itself). The panel is a two-state toggle with no history; its state is
//! independent of the scene graph and the clock.
//!
//! Layout is in logical pixels. The overlay pipeline draws
//! [`OverlayPanel::quads`] on top of the scene after every scene pass.

use log::debug;

use crate::camera::Viewport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverlayControl {
    Open,
    Close,
}

/// Axis-aligned rectangle, origin top-left, logical pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// A solid-colour rectangle for the overlay pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayQuad {
    pub rect: Rect,
    pub color: [f32; 4],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    pub paper: [f32; 4],
    pub button: [f32; 4],
    pub accent: [f32; 4],
    /// Fraction of the viewport the letter covers on each axis.
    pub panel_fraction: f32,
    pub button_size: f32,
    pub margin: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            paper: [0.98, 0.95, 0.88, 0.96],
            button: [0.86, 0.32, 0.42, 1.0],
            accent: [1.0, 1.0, 1.0, 1.0],
            panel_fraction: 0.7,
            button_size: 48.0,
            margin: 24.0,
        }
    }
}

#[derive(Debug)]
pub struct OverlayPanel {
    visible: bool,
    style: OverlayStyle,
    panel: Rect,
    open: Rect,
    close: Rect,
}

impl OverlayPanel {
    /// A hidden letter laid out for `viewport`.
    pub fn new(viewport: &Viewport, style: OverlayStyle) -> Self {
        let mut panel = Self {
            visible: false,
            style,
            panel: Rect::default(),
            open: Rect::default(),
            close: Rect::default(),
        };
        panel.layout(viewport);
        panel
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The control currently offered to the user: "open" while hidden, "close" while shown.
    pub fn active_control(&self) -> OverlayControl {
        if self.visible {
            OverlayControl::Close
        } else {
            OverlayControl::Open
        }
    }

    pub fn is_control_shown(&self, control: OverlayControl) -> bool {
        self.active_control() == control
    }

    pub fn control_rect(&self, control: OverlayControl) -> Rect {
        match control {
            OverlayControl::Open => self.open,
            OverlayControl::Close => self.close,
        }
    }

    pub fn panel_rect(&self) -> Rect {
        self.panel
    }

    /// Click on one of the two controls.
    ///
    /// "Open" shows the letter and hides itself, "close" hides the letter.
    /// A click on a control that is not shown changes nothing. Returns
    /// whether the visibility flipped.
    pub fn click(&mut self, control: OverlayControl) -> bool {
        if !self.is_control_shown(control) {
            return false;
        }
        self.visible = control == OverlayControl::Open;
        debug!("letter {}", if self.visible { "opened" } else { "closed" });
        true
    }

    /// Click whichever control is shown.
    pub fn toggle(&mut self) {
        self.click(self.active_control());
    }

    /// The shown control under the pointer, if any.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<OverlayControl> {
        let control = self.active_control();
        self.control_rect(control).contains(x, y).then_some(control)
    }

    /// Route a pointer click at logical coordinates. Returns the control it
    /// activated.
    pub fn handle_click(&mut self, x: f32, y: f32) -> Option<OverlayControl> {
        let control = self.hit_test(x, y)?;
        self.click(control);
        Some(control)
    }

    /// Whether the overlay covers this point, so the click must not reach the scene.
    pub fn captures(&self, x: f32, y: f32) -> bool {
        self.hit_test(x, y).is_some() || (self.visible && self.panel.contains(x, y))
    }

    /// Recompute control placement for a new viewport size.
    pub fn layout(&mut self, viewport: &Viewport) {
        let (w, h) = (viewport.width as f32, viewport.height as f32);
        let s = &self.style;
        let pw = w * s.panel_fraction;
        let ph = h * s.panel_fraction;
        self.panel = Rect::new((w - pw) * 0.5, (h - ph) * 0.5, pw, ph);
        self.open = Rect::new(
            (w - s.button_size) * 0.5,
            h - s.margin - s.button_size,
            s.button_size,
            s.button_size,
        );
        self.close = Rect::new(
            self.panel.x + pw - s.margin - s.button_size * 0.5,
            self.panel.y + s.margin * 0.5,
            s.button_size * 0.5,
            s.button_size * 0.5,
        );
    }

    /// Rectangles to draw this frame, back to front.
    pub fn quads(&self) -> Vec<OverlayQuad> {
        let s = &self.style;
        if !self.visible {
            let r = self.open;
            // envelope flap
            let flap = Rect::new(r.x + r.width * 0.2, r.y + r.height * 0.3, r.width * 0.6, r.height * 0.1);
            return vec![
                OverlayQuad {
                    rect: r,
                    color: s.button,
                },
                OverlayQuad {
                    rect: flap,
                    color: s.accent,
                },
            ];
        }
        let c = self.close;
        let bar = Rect::new(c.x + c.width * 0.2, c.y + c.height * 0.45, c.width * 0.6, c.height * 0.1);
        vec![
            OverlayQuad {
                rect: self.panel,
                color: s.paper,
            },
            OverlayQuad {
                rect: c,
                color: s.button,
            },
            OverlayQuad {
                rect: bar,
                color: s.accent,
            },
        ]
    }
}
