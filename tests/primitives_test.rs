use cgmath::InnerSpace;
use greeting_scene::data_structures::{model::Aabb, primitives};

#[test]
fn sphere_vertices_lie_on_the_radius() {
    let mesh = primitives::sphere(2.0, 16, 8);
    for v in &mesh.vertices {
        let p = cgmath::Vector3::from(v.position);
        assert!((p.magnitude() - 2.0).abs() < 1e-4);
        assert!((cgmath::Vector3::from(v.normal).magnitude() - 1.0).abs() < 1e-4);
    }
    assert_eq!(mesh.indices.len() % 3, 0);
    assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
}

#[test]
fn cuboid_is_centred_with_the_requested_size() {
    let mesh = primitives::cuboid(2.0, 4.0, 6.0);
    let Aabb { min, max } = mesh.bounds().unwrap();
    assert_eq!([min.x, min.y, min.z], [-1.0, -2.0, -3.0]);
    assert_eq!([max.x, max.y, max.z], [1.0, 2.0, 3.0]);
    assert_eq!(mesh.vertices.len(), 24);
    assert_eq!(mesh.indices.len(), 36);
}
