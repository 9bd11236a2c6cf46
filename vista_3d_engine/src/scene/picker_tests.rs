/// Tests for Picker

use super::*;
use std::sync::{Arc, Mutex};
use crate::backend::{Backend, MockBackend};
use crate::native::ReleaseQueue;
use crate::scene::{NodeDesc, PickTarget, Transform};

fn setup() -> Scene {
    let backend: Arc<Mutex<dyn Backend>> = Arc::new(Mutex::new(MockBackend::new()));
    Scene::new(backend, Arc::new(ReleaseQueue::new()))
}

/// Unit quad facing +Z at depth `z`, pickable
fn panel(scene: &mut Scene, root: NodeKey, z: f32) -> NodeKey {
    let node = scene
        .create_node_with(NodeDesc {
            transform: Transform::from_position(Vec3::new(0.0, 0.0, z)),
            width: Some(1.0),
            height: Some(1.0),
            pickable: true,
            ..Default::default()
        })
        .unwrap();
    scene.add_child(root, node).unwrap();
    node
}

fn forward_ray() -> Ray {
    Ray::new(Vec3::ZERO, Vec3::NEG_Z)
}

#[test]
fn test_hits_are_sorted_nearest_first() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    let far = panel(&mut scene, root, -5.0);
    let near = panel(&mut scene, root, -2.0);

    let hits = Picker::pick(&scene, &forward_ray(), root);

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].node, near);
    assert!((hits[0].distance - 2.0).abs() < 1e-4);
    assert_eq!(hits[1].node, far);
    assert!((hits[1].distance - 5.0).abs() < 1e-4);
    assert!((hits[1].point - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-4);
}

#[test]
fn test_hidden_node_is_excluded() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    let near = panel(&mut scene, root, -2.0);
    let far = panel(&mut scene, root, -5.0);

    scene.set_visible(near, false).unwrap();
    let hits = Picker::pick(&scene, &forward_ray(), root);

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].node, far);
}

#[test]
fn test_hidden_ancestor_excludes_subtree() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    let group = scene.create_node().unwrap();
    scene.add_child(root, group).unwrap();
    panel(&mut scene, group, -2.0);

    scene.set_visible(group, false).unwrap();
    assert!(Picker::pick(&scene, &forward_ray(), root).is_empty());

    // Picking from inside a hidden subtree finds nothing either
    assert!(Picker::pick(&scene, &forward_ray(), group).is_empty());
}

#[test]
fn test_no_hits_is_empty() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    panel(&mut scene, root, -2.0);

    let away = Ray::new(Vec3::ZERO, Vec3::Z);
    assert!(Picker::pick(&scene, &away, root).is_empty());
    assert!(Picker::pick_nearest(&scene, &away, root).is_none());
}

#[test]
fn test_nodes_without_volume_are_skipped() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    let node = panel(&mut scene, root, -2.0);
    scene.set_picking_enabled(node, false).unwrap();
    assert!(Picker::pick(&scene, &forward_ray(), root).is_empty());
}

#[test]
fn test_nearest_matches_first_of_pick() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    panel(&mut scene, root, -7.0);
    panel(&mut scene, root, -3.0);
    panel(&mut scene, root, -4.0);

    let all = Picker::pick(&scene, &forward_ray(), root);
    let nearest = Picker::pick_nearest(&scene, &forward_ray(), root);
    assert_eq!(nearest, all.first().copied());
}

#[test]
fn test_equal_distances_keep_preorder() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    let first = panel(&mut scene, root, -3.0);
    let second = panel(&mut scene, root, -3.0);

    let hits = Picker::pick(&scene, &forward_ray(), root);
    assert_eq!(hits.iter().map(|h| h.node).collect::<Vec<_>>(), vec![first, second]);
}

#[test]
fn test_distance_is_world_space_under_scale() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    scene.transform_mut(root).unwrap().set_scale(Vec3::splat(2.0));
    let node = panel(&mut scene, root, -2.0);

    let hit = Picker::pick_nearest(&scene, &forward_ray(), root).unwrap();
    assert_eq!(hit.node, node);
    assert!((hit.distance - 4.0).abs() < 1e-4);
}

#[test]
fn test_small_scale_panel_is_pickable() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    // 1000x1000 quad authored in millimetres, shown as a 1m panel
    let node = scene
        .create_node_with(NodeDesc {
            transform: Transform::from_position(Vec3::new(0.0, 0.0, -2.0)).with_scale(Vec3::splat(0.001)),
            width: Some(1000.0),
            height: Some(1000.0),
            pickable: true,
            ..Default::default()
        })
        .unwrap();
    scene.add_child(root, node).unwrap();

    let hits = Picker::pick(&scene, &forward_ray(), root);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].node, node);
    assert!((hits[0].distance - 2.0).abs() < 1e-3);
}

#[test]
fn test_zero_scale_node_is_not_pickable() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    let node = panel(&mut scene, root, -2.0);
    scene.transform_mut(node).unwrap().set_scale(Vec3::ZERO);

    assert!(Picker::pick(&scene, &forward_ray(), root).is_empty());
}

#[test]
fn test_triangle_and_sphere_targets() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    let sphere_node = scene.create_node().unwrap();
    let tri_node = scene.create_node().unwrap();
    scene.add_child(root, sphere_node).unwrap();
    scene.add_child(root, tri_node).unwrap();

    let sphere = scene
        .create_pickable_volume(vec![PickTarget::Sphere { center: Vec3::new(0.0, 0.0, -10.0), radius: 1.0 }])
        .unwrap();
    let triangle = scene
        .create_pickable_volume(vec![PickTarget::Triangles(Arc::new(vec![[
            Vec3::new(-1.0, -1.0, -6.0),
            Vec3::new(1.0, -1.0, -6.0),
            Vec3::new(0.0, 1.0, -6.0),
        ]]))])
        .unwrap();
    scene.attach_pickable_volume(sphere_node, sphere).unwrap();
    scene.attach_pickable_volume(tri_node, triangle).unwrap();

    let hits = Picker::pick(&scene, &forward_ray(), root);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].node, tri_node);
    assert!((hits[0].distance - 6.0).abs() < 1e-4);
    assert!((hits[1].distance - 9.0).abs() < 1e-4);
}

#[test]
fn test_is_looking_at() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    let near = panel(&mut scene, root, -2.0);
    let far = panel(&mut scene, root, -5.0);

    assert!(Picker::is_looking_at(&scene, &forward_ray(), root, near));
    assert!(!Picker::is_looking_at(&scene, &forward_ray(), root, far));
}

#[test]
fn test_pick_locked_from_another_thread() {
    let mut scene = setup();
    let root = scene.create_node().unwrap();
    let node = panel(&mut scene, root, -2.0);
    let scene = Arc::new(RwLock::new(scene));

    let shared = Arc::clone(&scene);
    let hits = std::thread::spawn(move || Picker::pick_locked(&shared, &forward_ray(), root).unwrap())
        .join()
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].node, node);
}
