use cgmath::{Deg, InnerSpace, Point3};
use greeting_scene::{
    camera::{Projection, Viewport},
    config::Config,
    controls::{OrbitControls, PointerInput, Spherical},
    data_structures::transform::Transform,
    flow::FrameScheduler,
    greeting,
};

use crate::common::test_utils::{RecordingTarget, scene, time};

mod common;

#[test]
fn resize_only_changes_the_aspect() {
    let mut scene = scene();
    let before = scene.projection;
    let buffer = scene.resize(1280, 720, 1.0);

    assert_eq!(scene.projection.aspect, 1280.0 / 720.0);
    assert_eq!(scene.projection.fovy, before.fovy);
    assert_eq!(scene.projection.znear, before.znear);
    assert_eq!(scene.projection.zfar, before.zfar);
    assert_eq!(buffer, (1280, 720));
}

#[test]
fn pixel_ratio_is_capped_at_two() {
    assert_eq!(Viewport::new(100, 50, 3.0).buffer_size(), (200, 100));
    assert_eq!(Viewport::new(100, 50, 1.5).buffer_size(), (150, 75));
    assert_eq!(Viewport::new(100, 50, 3.0).pixel_ratio(), 2.0);
}

#[test]
fn projection_defaults_match_the_configuration() {
    let scene = scene();
    assert_eq!(scene.projection.fovy, Deg(75.0));
    assert_eq!(scene.projection.znear, 0.1);
    assert_eq!(scene.projection.zfar, 100.0);
    assert_eq!(scene.camera_transform().position.z, 1.9);
}

#[test]
fn zero_sized_viewport_keeps_a_finite_aspect() {
    let mut projection = Projection::new(10, 10, Deg(75.0), 0.1, 100.0);
    projection.resize(0, 0);
    assert!(projection.aspect.is_finite());
}

#[test]
fn disabled_controls_leave_the_camera_alone() {
    let mut controls = OrbitControls::new(Point3::new(0.0, 0.0, 0.0));
    controls.set_enabled(false);
    let mut camera = Transform::from_position(0.0, 0.0, 1.9);
    let before = camera;

    assert!(!controls.handle_input(PointerInput::Press { x: 10.0, y: 10.0 }));
    assert!(!controls.handle_input(PointerInput::Move { x: 200.0, y: 90.0 }));
    assert!(!controls.handle_input(PointerInput::Scroll(3.0)));
    assert!(!controls.update(&mut camera));
    assert_eq!(camera, before);
}

#[test]
fn disabling_discards_pending_motion() {
    let mut controls = OrbitControls::new(Point3::new(0.0, 0.0, 0.0));
    controls.handle_input(PointerInput::Press { x: 0.0, y: 0.0 });
    controls.handle_input(PointerInput::Move { x: 100.0, y: 0.0 });
    assert!(!controls.is_at_rest());

    controls.set_enabled(false);
    controls.set_enabled(true);
    assert!(controls.is_at_rest());
    let mut camera = Transform::from_position(0.0, 0.0, 1.9);
    assert!(!controls.update(&mut camera));
}

#[test]
fn drag_orbits_around_the_target_at_constant_distance() {
    let mut controls = OrbitControls::new(Point3::new(0.0, 0.0, 0.0));
    controls.set_viewport_height(600);
    let mut camera = Transform::from_position(0.0, 0.0, 2.0);

    controls.handle_input(PointerInput::Press { x: 0.0, y: 0.0 });
    controls.handle_input(PointerInput::Move { x: 150.0, y: 0.0 });
    controls.handle_input(PointerInput::Release);
    assert!(controls.update(&mut camera));

    assert!((camera.position.magnitude() - 2.0).abs() < 1e-4);
    assert!(camera.position.x.abs() > 0.1);
    assert!(controls.is_at_rest());
}

#[test]
fn damping_eases_in_and_comes_to_rest() {
    let mut controls = OrbitControls::new(Point3::new(0.0, 0.0, 0.0));
    controls.enable_damping = true;
    controls.damping_factor = 0.05;
    controls.set_viewport_height(600);
    let mut camera = Transform::from_position(0.0, 0.0, 2.0);

    controls.handle_input(PointerInput::Press { x: 0.0, y: 0.0 });
    controls.handle_input(PointerInput::Move { x: 60.0, y: 0.0 });
    controls.handle_input(PointerInput::Release);

    assert!(controls.update(&mut camera));
    let first_step = camera.position.x.abs();
    assert!(!controls.is_at_rest());

    let mut ticks = 1;
    while controls.update(&mut camera) {
        ticks += 1;
        assert!(ticks < 10_000, "damping never settled");
    }
    assert!(controls.is_at_rest());
    assert!(camera.position.x.abs() > first_step);
}

#[test]
fn scroll_zooms_in() {
    let mut controls = OrbitControls::new(Point3::new(0.0, 0.0, 0.0));
    let mut camera = Transform::from_position(0.0, 0.0, 2.0);
    controls.handle_input(PointerInput::Scroll(2.0));
    controls.update(&mut camera);
    assert!(camera.position.magnitude() < 2.0);
}

#[test]
fn spherical_round_trips_an_offset() {
    let offset = cgmath::Vector3::new(0.3, -0.4, 1.2);
    let back = Spherical::from_offset(offset).to_offset();
    assert!((back - offset).magnitude() < 1e-5);
}

#[test]
fn idle_camera_sways_on_a_small_circle() {
    let config = Config::default();
    let mut scene = common::test_utils::scene();
    let mut scheduler = FrameScheduler::new();
    greeting::install_mutators(&config, &mut scheduler);
    let mut target = RecordingTarget::default();

    let t = 0.7f32;
    scheduler.tick_at(time(t, 0), &mut scene, &mut target).unwrap();
    let camera = target.frames[0].camera;
    assert!((camera.position.x - t.sin() * 0.1).abs() < 1e-5);
    assert!((camera.position.y + t.cos() * 0.1).abs() < 1e-5);
    assert_eq!(camera.position.z, 1.9);
}

#[test]
fn enabled_controls_stop_the_sway() {
    let config = Config::default();
    let mut scene = scene();
    scene.controls.set_enabled(true);
    let mut scheduler = FrameScheduler::new();
    greeting::install_mutators(&config, &mut scheduler);
    let mut target = RecordingTarget::default();

    scheduler.tick_at(time(0.7, 0), &mut scene, &mut target).unwrap();
    assert_eq!(target.frames[0].camera, Transform::from_position(0.0, 0.0, 1.9));
}
