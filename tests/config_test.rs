use greeting_scene::config::{BackgroundShape, Config};

#[test]
fn defaults_describe_the_shipped_greeting() {
    let config = Config::default();
    assert_eq!(config.text.content, "Feliz\nAniversário,\nYnarinha!\n");
    assert_eq!(config.text.geometry.size, 0.19);
    assert_eq!(config.text.geometry.curve_segments, 5);
    assert!(config.text.geometry.bevel_enabled);
    assert_eq!(config.model.rotation_x, -0.29);
    assert!(!config.controls.enabled);
    assert!(config.controls.damping);
    assert_eq!(config.camera.fov_degrees, 75.0);
    assert!(config.background.is_none());
}

#[test]
fn partial_json_overrides_only_what_it_names() {
    let config = Config::from_json(
        r#"{
            "controls": { "enabled": true },
            "text": { "content": "Hi", "geometry": { "size": 0.5 } },
            "background": { "shape": { "kind": "sphere", "radius": 5.0, "segments": 32 } }
        }"#,
    )
    .unwrap();

    assert!(config.controls.enabled);
    assert!(config.controls.damping);
    assert_eq!(config.text.content, "Hi");
    assert_eq!(config.text.geometry.size, 0.5);
    assert_eq!(config.text.geometry.depth, 50.0);
    assert_eq!(config.text.font, Config::default().text.font);
    let background = config.background.unwrap();
    assert_eq!(
        background.shape,
        BackgroundShape::Sphere {
            radius: 5.0,
            segments: 32
        }
    );
    assert_eq!(background.color, [1.0; 4]);
}

#[test]
fn invalid_json_is_an_error() {
    assert!(Config::from_json("{ \"camera\": 3 }").is_err());
}
