//! End-to-end scene assembly from OBJ files on disk.

use scene_bvh::prelude::*;
use std::fs;
use std::path::Path;

const TWO_OBJECTS: &str = "\
mtllib two.mtl
o floor
v -5 0 -5
v 5 0 -5
v 5 0 5
v -5 0 5
vn 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl stone
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
o pyramid
v 0 0 0
v 1 0 0
v 1 0 1
v 0 0 1
v 0.5 1 0.5
usemtl glass
f 5 6 9
f 6 7 9
f 7 8 9
f 8 5 9
f 5 7 6
f 5 8 7
";

const MTL: &str = "\
newmtl stone
Kd 0.5 0.5 0.5
map_Kd stone.png

newmtl glass
Kd 0.9 0.9 1.0
d 0.1
Ni 1.45
";

fn write_scene(dir: &Path) -> std::path::PathBuf {
    fs::write(dir.join("two.obj"), TWO_OBJECTS).unwrap();
    fs::write(dir.join("two.mtl"), MTL).unwrap();
    dir.join("two.obj")
}

fn covered(scene: &Scene) -> Vec<usize> {
    let mut covered: Vec<usize> = scene
        .bvh()
        .leaves()
        .filter_map(|n| n.triangle_range())
        .flatten()
        .collect();
    covered.sort_unstable();
    covered
}

#[test]
fn test_two_object_file_builds_full_partition() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scene(dir.path());

    let mut scene = Scene::new();
    let ids = scene.add_mesh(&path, Mat4::IDENTITY, false).unwrap();
    assert_eq!(ids, vec![0, 1]);
    scene.rebuild_acceleration_structure(DEFAULT_MAX_LEAF_SIZE).unwrap();

    let index_total: usize = scene.meshes().iter().map(|m| m.triangles.len() * 3).sum();
    assert_eq!(index_total / 3, 8);
    assert_eq!(scene.triangles().len(), index_total / 3);
    assert_eq!(covered(&scene), (0..8).collect::<Vec<_>>());
    assert_eq!(scene.bvh().validate(scene.triangles().as_slice()), Ok(()));

    assert_eq!(scene.mesh_triangle_range(0), Some(0..2));
    assert_eq!(scene.mesh_triangle_range(1), Some(2..8));

    // Materials are copied into every triangle of their mesh
    let floor = &scene.triangles()[0];
    assert_eq!(floor.material.diffuse, [0.5, 0.5, 0.5]);
    assert_eq!(floor.material.texture(), Some(0));
    assert_eq!(scene.textures(), &[dir.path().join("stone.png")]);
    let glass = &scene.triangles()[5];
    assert_eq!(glass.material.texture(), None);
    assert!((glass.material.transparency - 0.9).abs() < 1e-6);
    assert_eq!(glass.material.ior, 1.45);
    assert_eq!(floor.v0.normal(), Vec3::Y);
    assert_eq!(floor.v1.tex_coord(), Vec2::new(1.0, 0.0));
}

#[test]
fn test_add_mesh_twice_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scene(dir.path());

    let mut scene = Scene::new();
    scene.add_mesh(&path, Mat4::IDENTITY, false).unwrap();
    let moved = Mat4::from_translation(Vec3::new(20.0, 0.0, 0.0));
    let ids = scene.add_mesh(&path, moved, false).unwrap();
    assert_eq!(ids, vec![2, 3]);
    assert_eq!(scene.triangles().len(), 16);
    assert_eq!(scene.textures().len(), 1);

    scene.rebuild_acceleration_structure(2).unwrap();
    assert_eq!(covered(&scene), (0..16).collect::<Vec<_>>());
    let bounds = scene.bvh().root().unwrap().bounds();
    assert_eq!(bounds.min, Vec3::new(-5.0, 0.0, -5.0));
    assert_eq!(bounds.max, Vec3::new(25.0, 1.0, 5.0));
}

#[test]
fn test_missing_file_is_file_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = Scene::new();
    let missing = dir.path().join("missing.obj");

    let err = scene.add_mesh(&missing, Mat4::IDENTITY, false).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(ref p) if p == &missing));
    assert!(err.to_string().contains("missing.obj"));
    assert!(scene.meshes().is_empty());
    assert!(scene.triangles().is_empty());
}

#[test]
fn test_zero_leaf_size_keeps_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scene(dir.path());

    let mut scene = Scene::new();
    scene.add_mesh(&path, Mat4::IDENTITY, false).unwrap();
    scene.rebuild_acceleration_structure(1).unwrap();
    let nodes = scene.nodes().to_vec();
    assert_eq!(nodes.len(), 15);

    let err = scene.rebuild_acceleration_structure(0).unwrap_err();
    assert!(matches!(err, Error::InvalidBuildParameter(_)));
    assert_eq!(scene.nodes(), nodes.as_slice());
}

#[test]
fn test_normalize_fits_unit_box() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scene(dir.path());

    let mut scene = Scene::new();
    scene.add_mesh(&path, Mat4::IDENTITY, true).unwrap();
    scene.rebuild_acceleration_structure(4).unwrap();

    let bounds = scene.bvh().root().unwrap().bounds();
    let size = bounds.size();
    assert!((size.max_element() - 1.0).abs() < 1e-5);
    assert!(bounds.center().length() < 1e-5);
}

#[test]
fn test_export_writes_upload_arrays() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_scene(dir.path());
    let out = dir.path().join("out");

    let mut scene = Scene::new();
    scene.add_mesh(&path, Mat4::IDENTITY, false).unwrap();
    scene.rebuild_acceleration_structure(4).unwrap();
    let data = scene.gpu_data();
    data.write_to_dir(&out).unwrap();

    assert_eq!(fs::read(out.join("triangles.bin")).unwrap(), data.triangles_bytes());
    assert_eq!(fs::read(out.join("nodes.bin")).unwrap(), scene.bvh().as_bytes());
    assert_eq!(data.tri_count, 8);
}

#[test]
fn test_settings_file_drives_leaf_size() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("settings.json");
    fs::write(&config, r#"{ "max_leaf_size": 2, "normalize_vertex_positions": true }"#).unwrap();

    let settings = Settings::load_from(&config).unwrap();
    let mut scene = Scene::new();
    scene
        .add_mesh(write_scene(dir.path()), Mat4::IDENTITY, settings.normalize_vertex_positions)
        .unwrap();
    scene.rebuild_acceleration_structure(settings.max_leaf_size).unwrap();

    assert_eq!(scene.bvh().max_leaf_size(), 2);
    assert!(scene.bvh().leaves().all(|n| n.count <= 2));
}
