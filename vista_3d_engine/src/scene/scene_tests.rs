/// Tests for Scene
///
/// Tree invariants, inherited visibility/opacity, attachment ownership,
/// pending resources and render-state sync, all against a MockBackend.

use super::*;
use crate::backend::{MockBackend, RenderMask};
use glam::Vec3;

// ============================================================================
// Helper Functions
// ============================================================================

fn setup() -> (Arc<Mutex<MockBackend>>, Scene) {
    let backend = Arc::new(Mutex::new(MockBackend::new()));
    let shared: Arc<Mutex<dyn Backend>> = backend.clone();
    let scene = Scene::new(shared, Arc::new(ReleaseQueue::new()));
    (backend, scene)
}

fn quad_node(scene: &mut Scene, name: &str) -> NodeKey {
    scene
        .create_node_with(NodeDesc {
            width: Some(1.0),
            height: Some(1.0),
            ..NodeDesc::named(name)
        })
        .unwrap()
}

fn chain(scene: &mut Scene) -> (NodeKey, NodeKey, NodeKey) {
    let root = quad_node(scene, "root");
    let middle = quad_node(scene, "middle");
    let leaf = quad_node(scene, "leaf");
    scene.add_root(root).unwrap();
    scene.add_child(root, middle).unwrap();
    scene.add_child(middle, leaf).unwrap();
    (root, middle, leaf)
}

fn drain(backend: &Arc<Mutex<MockBackend>>, scene: &Scene) -> usize {
    let mut backend = backend.lock().unwrap();
    scene.release_queue().drain(&mut *backend).unwrap()
}

// ============================================================================
// Tree structure
// ============================================================================

#[test]
fn test_new_node_is_detached() {
    let (_backend, mut scene) = setup();
    let node = scene.create_node().unwrap();

    assert!(scene.contains(node));
    assert_eq!(scene.parent(node), None);
    assert!(scene.roots().is_empty());
    assert!(scene.is_shown(node));
    assert_eq!(scene.effective_opacity(node), 1.0);
}

#[test]
fn test_add_ancestor_as_child_is_cycle_error() {
    let (_backend, mut scene) = setup();
    let (root, middle, leaf) = chain(&mut scene);

    let result = scene.add_child(leaf, root);
    assert!(matches!(result, Err(Error::CycleError(_))));

    // Tree unchanged
    assert_eq!(scene.parent(root), None);
    assert_eq!(scene.parent(middle), Some(root));
    assert_eq!(scene.parent(leaf), Some(middle));
    assert_eq!(scene.child_count(leaf), 0);
    assert_eq!(scene.roots(), &[root]);
}

#[test]
fn test_add_self_as_child_is_cycle_error() {
    let (_backend, mut scene) = setup();
    let node = scene.create_node().unwrap();
    assert!(matches!(scene.add_child(node, node), Err(Error::CycleError(_))));
    assert_eq!(scene.child_count(node), 0);
}

#[test]
fn test_add_child_reparents() {
    let (_backend, mut scene) = setup();
    let a = scene.create_node().unwrap();
    let b = scene.create_node().unwrap();
    let child = scene.create_node().unwrap();

    scene.add_child(a, child).unwrap();
    scene.add_child(b, child).unwrap();

    assert_eq!(scene.parent(child), Some(b));
    assert_eq!(scene.child_count(a), 0);
    assert_eq!(scene.children(b).collect::<Vec<_>>(), vec![child]);
}

#[test]
fn test_add_child_removes_from_roots() {
    let (_backend, mut scene) = setup();
    let parent = scene.create_node().unwrap();
    let child = scene.create_node().unwrap();
    scene.add_root(child).unwrap();

    scene.add_child(parent, child).unwrap();
    assert!(scene.roots().is_empty());
}

#[test]
fn test_remove_child_absent_is_noop() {
    let (_backend, mut scene) = setup();
    let parent = scene.create_node().unwrap();
    let other = scene.create_node().unwrap();
    let child = scene.create_node().unwrap();
    scene.add_child(parent, child).unwrap();

    assert!(!scene.remove_child(other, child));
    assert_eq!(scene.parent(child), Some(parent));

    assert!(scene.remove_child(parent, child));
    assert_eq!(scene.parent(child), None);
    assert_eq!(scene.child_count(parent), 0);
    assert!(!scene.remove_child(parent, child));
}

#[test]
fn test_children_view_and_indexed_access() {
    let (_backend, mut scene) = setup();
    let parent = scene.create_node().unwrap();
    let kids: Vec<NodeKey> = (0..3).map(|_| scene.create_node().unwrap()).collect();
    for kid in &kids {
        scene.add_child(parent, *kid).unwrap();
    }

    assert_eq!(scene.child_count(parent), 3);
    assert_eq!(scene.child(parent, 1), Some(kids[1]));
    assert_eq!(scene.child(parent, 3), None);
    assert_eq!(scene.children(parent).len(), 3);
    assert_eq!(scene.children(parent).collect::<Vec<_>>(), kids);
}

#[test]
fn test_is_ancestor() {
    let (_backend, mut scene) = setup();
    let (root, middle, leaf) = chain(&mut scene);
    assert!(scene.is_ancestor(root, leaf));
    assert!(scene.is_ancestor(middle, leaf));
    assert!(!scene.is_ancestor(leaf, root));
    assert!(!scene.is_ancestor(leaf, leaf));
}

#[test]
fn test_roots_add_and_remove() {
    let (_backend, mut scene) = setup();
    let parent = scene.create_node().unwrap();
    let node = scene.create_node().unwrap();
    scene.add_child(parent, node).unwrap();

    scene.add_root(node).unwrap();
    assert_eq!(scene.parent(node), None);
    assert_eq!(scene.child_count(parent), 0);
    assert_eq!(scene.roots(), &[node]);

    assert!(scene.remove_root(node));
    assert!(!scene.remove_root(node));
}

#[test]
fn test_find_by_name_is_preorder() {
    let (_backend, mut scene) = setup();
    let root = scene.create_node().unwrap();
    let first = scene.create_node().unwrap();
    let nested = scene.create_node().unwrap();
    let second = scene.create_node().unwrap();
    scene.add_child(root, first).unwrap();
    scene.add_child(first, nested).unwrap();
    scene.add_child(root, second).unwrap();
    scene.set_name(nested, "target").unwrap();
    scene.set_name(second, "target").unwrap();

    assert_eq!(scene.find_by_name(root, "target"), Some(nested));
    assert_eq!(scene.find_by_name(root, "missing"), None);
    assert_eq!(scene.name(nested), Some("target"));
}

#[test]
fn test_world_matrix_composes_parent_first() {
    let (_backend, mut scene) = setup();
    let parent = scene.create_node().unwrap();
    let child = scene.create_node().unwrap();
    scene.add_child(parent, child).unwrap();
    scene.transform_mut(parent).unwrap().set_scale(Vec3::splat(2.0));
    scene.transform_mut(child).unwrap().set_position(Vec3::new(1.0, 0.0, 0.0));

    let world = scene.world_matrix(child).unwrap();
    assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(2.0, 0.0, 0.0));
}

#[test]
fn test_invalid_key_is_invalid_node() {
    let (_backend, mut scene) = setup();
    let node = scene.create_node().unwrap();
    scene.destroy_node(node).unwrap();

    assert!(matches!(scene.set_visible(node, false), Err(Error::InvalidNode(_))));
    assert!(matches!(scene.destroy_node(node), Err(Error::InvalidNode(_))));
    assert_eq!(scene.child_count(node), 0);
}

// ============================================================================
// Inherited state
// ============================================================================

#[test]
fn test_hidden_middle_hides_leaf() {
    let (_backend, mut scene) = setup();
    let (_root, middle, leaf) = chain(&mut scene);

    scene.set_visible(middle, false).unwrap();

    assert!(scene.node(leaf).unwrap().visible());
    assert!(!scene.is_shown(leaf));
    assert_eq!(scene.render_data(leaf).unwrap().render_mask(), RenderMask::empty());
    assert_eq!(scene.render_data(middle).unwrap().render_mask(), RenderMask::empty());

    scene.set_visible(middle, true).unwrap();
    assert!(scene.is_shown(leaf));
    assert_eq!(scene.render_data(leaf).unwrap().render_mask(), RenderMask::BOTH);
}

#[test]
fn test_opacity_multiplies_down_the_tree() {
    let (_backend, mut scene) = setup();
    let (root, middle, leaf) = chain(&mut scene);

    scene.set_opacity(root, 0.5).unwrap();
    scene.set_opacity(middle, 0.5).unwrap();

    assert_eq!(scene.effective_opacity(leaf), 0.25);
    assert_eq!(scene.render_data(leaf).unwrap().material().opacity(), 0.25);
    assert_eq!(scene.node(leaf).unwrap().opacity(), 1.0);
}

#[test]
fn test_reparenting_picks_up_new_inherited_state() {
    let (_backend, mut scene) = setup();
    let hidden = scene.create_node().unwrap();
    scene.set_visible(hidden, false).unwrap();
    let leaf = quad_node(&mut scene, "leaf");
    assert_eq!(scene.render_data(leaf).unwrap().render_mask(), RenderMask::BOTH);

    scene.add_child(hidden, leaf).unwrap();
    assert_eq!(scene.render_data(leaf).unwrap().render_mask(), RenderMask::empty());

    scene.remove_child(hidden, leaf);
    assert_eq!(scene.render_data(leaf).unwrap().render_mask(), RenderMask::BOTH);
}

#[test]
fn test_set_opacity_clamps_and_rejects_nan() {
    let (_backend, mut scene) = setup();
    let node = scene.create_node().unwrap();

    scene.set_opacity(node, 1.5).unwrap();
    assert_eq!(scene.node(node).unwrap().opacity(), 1.0);
    scene.set_opacity(node, -0.5).unwrap();
    assert_eq!(scene.node(node).unwrap().opacity(), 0.0);

    assert!(matches!(scene.set_opacity(node, f32::NAN), Err(Error::InvalidArgument(_))));
    assert_eq!(scene.node(node).unwrap().opacity(), 0.0);
}

// ============================================================================
// Attachments
// ============================================================================

#[test]
fn test_attach_replaces_and_clears_old_owner() {
    let (_backend, mut scene) = setup();
    let node = scene.create_node().unwrap();
    let first = scene.create_render_data(Material::default()).unwrap();
    let second = scene.create_render_data(Material::default()).unwrap();

    assert!(scene.attach_render_data(node, first).unwrap().is_none());
    assert_eq!(scene.render_data(node).unwrap().owner(), Some(node));

    let old = scene.attach_render_data(node, second).unwrap().unwrap();
    assert_eq!(old.owner(), None);
    assert_eq!(scene.render_data(node).unwrap().owner(), Some(node));
}

#[test]
fn test_attach_applies_current_effective_state() {
    let (_backend, mut scene) = setup();
    let parent = scene.create_node().unwrap();
    let child = scene.create_node().unwrap();
    scene.add_child(parent, child).unwrap();
    scene.set_visible(parent, false).unwrap();
    scene.set_opacity(parent, 0.4).unwrap();

    let render_data = scene.create_render_data(Material::default()).unwrap();
    scene.attach_render_data(child, render_data).unwrap();

    let attached = scene.render_data(child).unwrap();
    assert_eq!(attached.render_mask(), RenderMask::empty());
    assert_eq!(attached.material().opacity(), 0.4);
}

#[test]
fn test_transfer_render_data_moves_ownership() {
    let (_backend, mut scene) = setup();
    let from = quad_node(&mut scene, "from");
    let to = scene.create_node().unwrap();

    assert!(scene.transfer_render_data(from, to).unwrap().is_none());
    assert!(scene.render_data(from).is_none());
    assert_eq!(scene.render_data(to).unwrap().owner(), Some(to));

    assert!(matches!(
        scene.transfer_render_data(from, to),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_detach_pickable_volume() {
    let (_backend, mut scene) = setup();
    let node = scene.create_node().unwrap();
    let volume = scene
        .create_pickable_volume(vec![PickTarget::Sphere { center: Vec3::ZERO, radius: 1.0 }])
        .unwrap();
    scene.attach_pickable_volume(node, volume).unwrap();
    assert!(scene.picking_enabled(node));

    let volume = scene.detach_pickable_volume(node).unwrap();
    assert_eq!(volume.owner(), None);
    assert!(!scene.picking_enabled(node));
    assert!(scene.detach_pickable_volume(node).is_none());
}

#[test]
fn test_picking_requires_mesh_bounds() {
    let (_backend, mut scene) = setup();
    let bare = scene.create_node().unwrap();
    assert!(matches!(
        scene.set_picking_enabled(bare, true),
        Err(Error::InvalidArgument(_))
    ));

    let quad = quad_node(&mut scene, "quad");
    scene.set_picking_enabled(quad, true).unwrap();
    let bounds = scene.pickable_volume(quad).unwrap().local_bounds().unwrap();
    assert_eq!(bounds.max, Vec3::new(0.5, 0.5, 0.0));

    scene.set_picking_enabled(quad, false).unwrap();
    assert!(!scene.picking_enabled(quad));
}

#[test]
fn test_is_colliding_uses_world_bounds() {
    let (_backend, mut scene) = setup();
    let a = quad_node(&mut scene, "a");
    let b = quad_node(&mut scene, "b");
    scene.set_picking_enabled(a, true).unwrap();
    scene.set_picking_enabled(b, true).unwrap();

    scene.transform_mut(b).unwrap().set_position(Vec3::new(0.75, 0.0, 0.0));
    assert!(scene.is_colliding(a, b));

    scene.transform_mut(b).unwrap().set_position(Vec3::new(5.0, 0.0, 0.0));
    assert!(!scene.is_colliding(a, b));
}

// ============================================================================
// Creation, LOD, destruction
// ============================================================================

#[test]
fn test_create_node_with_desc() {
    let (backend, mut scene) = setup();
    let node = scene
        .create_node_with(NodeDesc {
            width: Some(2.0),
            height: Some(1.0),
            opacity: 0.5,
            visible: false,
            pickable: true,
            ..NodeDesc::named("panel")
        })
        .unwrap();

    assert_eq!(scene.name(node), Some("panel"));
    assert!(scene.picking_enabled(node));
    let render_data = scene.render_data(node).unwrap();
    assert_eq!(render_data.mesh().unwrap().index_count(), 6);
    assert_eq!(render_data.render_mask(), RenderMask::empty());
    assert_eq!(render_data.material().opacity(), 0.5);
    assert_eq!(backend.lock().unwrap().uploaded_meshes, vec![4]);
}

#[test]
fn test_create_pickable_node_without_mesh_fails() {
    let (_backend, mut scene) = setup();
    let result = scene.create_node_with(NodeDesc { pickable: true, ..Default::default() });
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(scene.node_count(), 0);
}

#[test]
fn test_lod_range_validation() {
    let (_backend, mut scene) = setup();
    let node = scene.create_node().unwrap();

    scene.set_lod_range(node, 1.0, 10.0).unwrap();
    assert_eq!(scene.lod_range(node), Some((1.0, 10.0)));

    assert!(scene.set_lod_range(node, -1.0, 10.0).is_err());
    assert!(scene.set_lod_range(node, 5.0, 2.0).is_err());
    assert_eq!(scene.lod_range(node), Some((1.0, 10.0)));
}

#[test]
fn test_destroy_subtree_enqueues_every_handle() {
    let (backend, mut scene) = setup();
    let (root, _middle, leaf) = chain(&mut scene);
    let outsider = scene.create_node().unwrap();
    let live_before = backend.lock().unwrap().stats().live_handles;
    let leaf_handle = scene.render_data(leaf).unwrap().handle().raw();

    assert_eq!(scene.destroy_node(root).unwrap(), 3);
    assert_eq!(scene.node_count(), 1);
    assert!(scene.roots().is_empty());
    assert!(scene.contains(outsider));
    assert!(scene.release_queue().is_pending(leaf_handle));

    // 3 nodes + 3 render attachments + 3 quad meshes
    assert_eq!(drain(&backend, &scene), 9);
    assert_eq!(backend.lock().unwrap().stats().live_handles, live_before - 9);
}

#[test]
fn test_destroy_detaches_from_parent() {
    let (_backend, mut scene) = setup();
    let (_root, middle, leaf) = chain(&mut scene);
    scene.destroy_node(leaf).unwrap();
    assert_eq!(scene.child_count(middle), 0);
}

// ============================================================================
// Pending resources and render state sync
// ============================================================================

#[test]
fn test_pending_texture_apply_and_fail() {
    let (backend, mut scene) = setup();
    let node = quad_node(&mut scene, "node");
    let key = ResourceKey::texture("a.png");
    let other = ResourceKey::texture("b.png");
    let texture = {
        let mut backend = backend.lock().unwrap();
        Arc::new(GpuTexture::upload(
            &mut *backend,
            scene.release_queue(),
            &crate::backend::TextureUpload {
                kind: crate::backend::TextureKind::Texture2D,
                width: 1,
                height: 1,
                faces: vec![vec![0u8; 4]],
            },
        ).unwrap())
    };

    scene.request_texture(node, key.clone()).unwrap();
    assert!(!scene.apply_texture(node, &other, texture.clone()));
    assert!(scene.apply_texture(node, &key, texture));
    let material = scene.render_data(node).unwrap().material();
    assert!(material.main_texture().is_some());
    assert!(material.pending_texture().is_none());

    scene.request_texture(node, other.clone()).unwrap();
    assert!(scene.fail_texture(node, &other));
    let material = scene.render_data(node).unwrap().material();
    assert!(material.main_texture().is_some(), "previous texture is kept");
    assert!(material.pending_texture().is_none());
}

#[test]
fn test_request_without_render_data_fails() {
    let (_backend, mut scene) = setup();
    let node = scene.create_node().unwrap();
    assert!(matches!(
        scene.request_mesh(node, ResourceKey::mesh("a.obj")),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_sync_render_state_pushes_dirty_once() {
    let (backend, mut scene) = setup();
    let (root, _middle, leaf) = chain(&mut scene);
    scene.sync_render_state().unwrap();

    scene.set_opacity(root, 0.5).unwrap();
    assert_eq!(scene.dirty_render_states().len(), 3);

    assert_eq!(scene.sync_render_state().unwrap(), 3);
    assert!(scene.dirty_render_states().is_empty());
    assert_eq!(scene.sync_render_state().unwrap(), 0);

    let leaf_handle = scene.render_data(leaf).unwrap().handle().raw();
    let backend = backend.lock().unwrap();
    assert_eq!(backend.render_states.get(&leaf_handle).unwrap().opacity, 0.5);
}
