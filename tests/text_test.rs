use cgmath::InnerSpace;
use greeting_scene::resources::{
    font::{Font, FontError, OutlineCommand},
    text::{TextGeometryParams, build_text_mesh},
};

use crate::common::test_utils::{GLYPH_ADVANCE, UNITS_PER_EM, block_font};

mod common;

fn params() -> TextGeometryParams {
    TextGeometryParams {
        size: 1.0,
        depth: 0.2,
        curve_segments: 4,
        bevel_enabled: false,
        ..Default::default()
    }
}

#[test]
fn outlines_list_curve_end_points_first() {
    let json = r#"{
        "glyphs": { "S": { "ha": 500, "o": "m 0 0 q 100 0 50 50 b 0 100 100 50 50 100 z" } },
        "resolution": 1000,
        "boundingBox": { "yMin": -200, "yMax": 800 }
    }"#;
    let font = Font::from_slice(json.as_bytes()).unwrap();
    let glyph = font.glyph('S').unwrap();
    assert_eq!(glyph.advance, 500.0);
    assert_eq!(
        glyph.outline,
        vec![
            OutlineCommand::MoveTo([0.0, 0.0]),
            OutlineCommand::QuadTo {
                ctrl: [50.0, 50.0],
                to: [100.0, 0.0]
            },
            OutlineCommand::CubicTo {
                ctrl1: [100.0, 50.0],
                ctrl2: [50.0, 100.0],
                to: [0.0, 100.0]
            },
            OutlineCommand::Close,
        ]
    );
    assert_eq!(font.line_height, 1000.0);
}

#[test]
fn malformed_fonts_are_rejected() {
    let truncated = r#"{ "glyphs": { "a": { "ha": 1, "o": "m 0" } }, "resolution": 1000,
        "boundingBox": { "yMin": 0, "yMax": 1 } }"#;
    assert!(matches!(
        Font::from_slice(truncated.as_bytes()),
        Err(FontError::Outline { glyph: 'a', .. })
    ));

    let unknown = r#"{ "glyphs": { "a": { "ha": 1, "o": "x 0 0" } }, "resolution": 1000,
        "boundingBox": { "yMin": 0, "yMax": 1 } }"#;
    assert!(Font::from_slice(unknown.as_bytes()).is_err());

    let flat = r#"{ "glyphs": {}, "resolution": 0, "boundingBox": { "yMin": 0, "yMax": 1 } }"#;
    assert!(matches!(
        Font::from_slice(flat.as_bytes()),
        Err(FontError::Resolution(_))
    ));

    assert!(matches!(Font::from_slice(b"not json"), Err(FontError::Json(_))));
}

#[test]
fn missing_glyphs_fall_back_to_question_mark() {
    let font = block_font();
    assert!(!font.has_glyph('ã'));
    assert!(font.glyph('ã').is_some());
}

#[test]
fn multi_line_text_is_centred_on_its_bounding_box() {
    let font = block_font();
    let mesh = build_text_mesh(&font, "Line1\nLine2\nLine3\nLine4", &params());
    let bounds = mesh.bounds().unwrap();

    let center = bounds.center();
    assert!(center.x.abs() < 1e-4, "x centre {}", center.x);
    assert!(center.y.abs() < 1e-4, "y centre {}", center.y);
    assert!(center.z.abs() < 1e-4, "z centre {}", center.z);

    let scale = 1.0 / UNITS_PER_EM;
    let line_height = font.line_height * scale;
    let size = bounds.size();
    // three line breaks plus the 700 unit tall glyph boxes
    assert!((size.y - (3.0 * line_height + 0.7)).abs() < 1e-4, "height {}", size.y);
    // five glyphs per line, the last one 600 units wide
    assert!((size.x - (4.0 * GLYPH_ADVANCE + 600.0) * scale).abs() < 1e-4, "width {}", size.x);
    assert!((size.z - 0.2).abs() < 1e-5);
}

#[test]
fn bevel_grows_the_outline_and_the_depth() {
    let font = block_font();
    let flat = build_text_mesh(&font, "I", &params());
    let bevelled = build_text_mesh(
        &font,
        "I",
        &TextGeometryParams {
            bevel_enabled: true,
            bevel_thickness: 0.03,
            bevel_size: 0.02,
            bevel_segments: 5,
            ..params()
        },
    );
    let (flat, bevelled) = (flat.bounds().unwrap().size(), bevelled.bounds().unwrap().size());
    assert!((bevelled.x - (flat.x + 0.04)).abs() < 1e-4);
    assert!((bevelled.y - (flat.y + 0.04)).abs() < 1e-4);
    assert!((bevelled.z - (flat.z + 0.06)).abs() < 1e-4);
}

#[test]
fn caps_face_front_and_back() {
    let font = block_font();
    let mesh = build_text_mesh(&font, "I", &params());
    let bounds = mesh.bounds().unwrap();
    let front = mesh
        .vertices
        .iter()
        .filter(|v| (v.position[2] - bounds.min.z).abs() < 1e-6 && v.normal == [0.0, 0.0, -1.0])
        .count();
    let back = mesh
        .vertices
        .iter()
        .filter(|v| (v.position[2] - bounds.max.z).abs() < 1e-6 && v.normal == [0.0, 0.0, 1.0])
        .count();
    assert!(front >= 3);
    assert!(back >= 3);
}

#[test]
fn side_normals_point_away_from_the_glyph() {
    let font = block_font();
    let mesh = build_text_mesh(&font, "I", &params());
    let bounds = mesh.bounds().unwrap();
    let center = bounds.center();
    for v in mesh.vertices.iter().filter(|v| v.normal[2] == 0.0) {
        let n = cgmath::Vector3::from(v.normal);
        let out = cgmath::Vector3::new(v.position[0] - center.x, v.position[1] - center.y, 0.0);
        assert!(n.dot(out) > 0.0, "inward side normal at {:?}", v.position);
        assert!((n.magnitude() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn holes_stay_open() {
    let font = block_font();
    let solid = build_text_mesh(&font, "I", &params());
    let holed = build_text_mesh(&font, "O", &params());
    // the hole adds its own side walls
    assert!(holed.indices.len() > solid.indices.len());
    assert!(holed.indices.iter().all(|&i| (i as usize) < holed.vertices.len()));
}

#[test]
fn empty_text_gives_an_empty_mesh() {
    let mesh = build_text_mesh(&block_font(), "", &params());
    assert!(mesh.vertices.is_empty());
    assert!(mesh.bounds().is_none());
}

#[test]
fn curve_segments_refine_curved_outlines() {
    let font = block_font();
    for glyph in ["@", "&"] {
        let counts: Vec<usize> = [1, 5, 12]
            .into_iter()
            .map(|curve_segments| {
                let mesh = build_text_mesh(&font, glyph, &TextGeometryParams { curve_segments, ..params() });
                let center = mesh.bounds().unwrap().center();
                assert!(
                    center.x.abs() < 1e-4 && center.y.abs() < 1e-4 && center.z.abs() < 1e-4,
                    "{glyph} at {curve_segments} segments is centred at {center:?}"
                );
                mesh.vertices.len()
            })
            .collect();
        assert!(counts[0] < counts[1] && counts[1] < counts[2], "{glyph}: {counts:?}");
    }
}

#[test]
fn flattened_curves_pass_through_their_end_points() {
    let font = block_font();
    let mesh = build_text_mesh(&font, "&", &TextGeometryParams { curve_segments: 12, ..params() });
    let size = mesh.bounds().unwrap().size();
    // the disc touches its four end points, 600 units apart
    assert!((size.x - 0.6).abs() < 1e-4, "width {}", size.x);
    assert!((size.y - 0.6).abs() < 1e-4, "height {}", size.y);
    let rim = mesh
        .vertices
        .iter()
        .filter(|v| v.normal[2] == 0.0)
        .map(|v| cgmath::Vector2::new(v.position[0], v.position[1]).magnitude());
    for r in rim {
        // a four-arc cubic circle stays within a fraction of a percent of its radius
        assert!((r - 0.3).abs() < 0.002, "rim radius {r}");
    }
}
