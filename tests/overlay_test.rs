use greeting_scene::{
    camera::Viewport,
    controls::PointerInput,
    overlay::{OverlayControl, OverlayPanel, OverlayStyle},
};

use crate::common::test_utils::{scene, viewport};

mod common;

fn panel() -> OverlayPanel {
    OverlayPanel::new(&viewport(), OverlayStyle::default())
}

#[test]
fn starts_hidden_offering_open() {
    let panel = panel();
    assert!(!panel.is_visible());
    assert_eq!(panel.active_control(), OverlayControl::Open);
    assert!(panel.is_control_shown(OverlayControl::Open));
    assert!(!panel.is_control_shown(OverlayControl::Close));
}

#[test]
fn open_then_close() {
    let mut panel = panel();
    assert!(panel.click(OverlayControl::Open));
    assert!(panel.is_visible());
    assert!(!panel.is_control_shown(OverlayControl::Open));
    assert!(panel.click(OverlayControl::Close));
    assert!(!panel.is_visible());
    assert!(panel.is_control_shown(OverlayControl::Open));
}

#[test]
fn clicking_a_hidden_control_changes_nothing() {
    let mut panel = panel();
    assert!(!panel.click(OverlayControl::Close));
    assert!(!panel.is_visible());

    panel.click(OverlayControl::Open);
    assert!(!panel.click(OverlayControl::Open));
    assert!(panel.is_visible());
}

#[test]
fn visibility_follows_the_parity_of_toggles() {
    let mut panel = panel();
    for n in 1..=9 {
        panel.toggle();
        assert_eq!(panel.is_visible(), n % 2 == 1, "after {n} toggles");
    }
}

#[test]
fn clicks_hit_the_shown_control_only() {
    let mut panel = panel();
    let open = panel.control_rect(OverlayControl::Open);
    let close = panel.control_rect(OverlayControl::Close);

    assert_eq!(panel.handle_click(close.x + 1.0, close.y + 1.0), None);
    assert_eq!(
        panel.handle_click(open.x + open.width * 0.5, open.y + open.height * 0.5),
        Some(OverlayControl::Open)
    );
    assert!(panel.is_visible());
    assert_eq!(
        panel.handle_click(close.x + close.width * 0.5, close.y + close.height * 0.5),
        Some(OverlayControl::Close)
    );
    assert!(!panel.is_visible());
}

#[test]
fn layout_follows_the_viewport() {
    let mut panel = panel();
    panel.layout(&Viewport::new(400, 300, 1.0));
    let open = panel.control_rect(OverlayControl::Open);
    assert!(open.x + open.width <= 400.0);
    assert!(open.y + open.height <= 300.0);
    let letter = panel.panel_rect();
    assert!((letter.x + letter.width * 0.5 - 200.0).abs() < 1e-3);
}

#[test]
fn quads_show_the_letter_only_while_open() {
    let mut panel = panel();
    let letter = panel.panel_rect();
    assert!(panel.quads().iter().all(|q| q.rect != letter));
    panel.toggle();
    assert_eq!(panel.quads()[0].rect, letter);
}

#[test]
fn overlay_press_does_not_reach_the_controls() {
    let mut scene = scene();
    scene.controls.set_enabled(true);
    let open = scene.overlay.control_rect(OverlayControl::Open);
    let (x, y) = ((open.x + 2.0) as f64, (open.y + 2.0) as f64);

    assert!(scene.handle_pointer(PointerInput::Press { x, y }));
    assert!(scene.overlay.is_visible());
    // no drag was started, so moving does nothing
    assert!(!scene.handle_pointer(PointerInput::Move { x: x + 50.0, y }));
    assert!(scene.controls.is_at_rest());
}

#[test]
fn overlay_hit_test_uses_logical_pixels() {
    let mut scene = scene();
    scene.resize(800, 600, 2.0);
    let open = scene.overlay.control_rect(OverlayControl::Open);
    let (x, y) = (open.x + open.width * 0.5, open.y + open.height * 0.5);

    scene.handle_pointer(PointerInput::Press {
        x: x as f64 * 2.0,
        y: y as f64 * 2.0,
    });
    assert!(scene.overlay.is_visible());
}

#[test]
fn quads_map_to_clip_space() {
    use greeting_scene::{
        overlay::{OverlayQuad, Rect},
        pipelines::overlay::quad_vertices,
    };

    let quad = OverlayQuad {
        rect: Rect::new(0.0, 0.0, 800.0, 600.0),
        color: [1.0, 0.0, 0.0, 1.0],
    };
    let vertices = quad_vertices(&[quad], 800.0, 600.0);
    assert_eq!(vertices.len(), 6);
    for v in &vertices {
        assert_eq!(v.position[0].abs(), 1.0);
        assert_eq!(v.position[1].abs(), 1.0);
        assert_eq!(v.color, quad.color);
    }
    // top-left of the window is the top-left of clip space
    assert!(vertices.iter().any(|v| v.position == [-1.0, 1.0]));
}
