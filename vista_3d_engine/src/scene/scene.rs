/// Scene: an arena of SceneNodes forming a forest.
///
/// Nodes live in a SlotMap and refer to each other by `NodeKey`, so the
/// parent back-reference never owns anything. Effective visibility and
/// opacity are pushed top-down into each node's render attachment whenever
/// a local flag changes, and the touched attachments are collected in a
/// dirty set that `sync_render_state` flushes to the backend once per frame.

use std::sync::{Arc, Mutex, RwLock, Weak};
use glam::Mat4;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::backend::{self, Backend, HandleKind};
use crate::error::{Error, Result};
use crate::native::{NativeHandle, ReleaseQueue};
use crate::resource::{
    GpuMesh, GpuTexture, LoadOutcome, LoadedResource, RequestTicket, ResourceKey, Throttler,
};
use crate::{engine_debug, engine_error, engine_warn};
use super::aabb::AABB;
use super::node::{NodeDesc, NodeKey, SceneNode};
use super::pickable::{PickTarget, PickableVolume};
use super::render_data::{Material, RenderData};
use super::transform::Transform;

/// Forward-only view over a node's children.
///
/// Borrows the scene, so the tree cannot change while it is alive; copy the
/// keys out (`collect()`) before mutating.
pub struct Children<'a> {
    inner: std::slice::Iter<'a, NodeKey>,
}

impl Iterator for Children<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        self.inner.next().copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}

pub struct Scene {
    /// Backend used to allocate node, attachment and volume handles
    backend: Arc<Mutex<dyn Backend>>,
    /// Queue every handle owned by this scene is released through
    release_queue: Arc<ReleaseQueue>,
    /// Node arena
    nodes: SlotMap<NodeKey, SceneNode>,
    /// Nodes designated live without a parent
    roots: Vec<NodeKey>,
    /// Nodes whose render attachment state changed since the last sync
    dirty_render_states: FxHashSet<NodeKey>,
}

impl Scene {
    /// Create an empty scene
    pub fn new(backend: Arc<Mutex<dyn Backend>>, release_queue: Arc<ReleaseQueue>) -> Self {
        Self {
            backend,
            release_queue,
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
            dirty_render_states: FxHashSet::default(),
        }
    }

    pub fn backend(&self) -> &Arc<Mutex<dyn Backend>> {
        &self.backend
    }

    pub fn release_queue(&self) -> &Arc<ReleaseQueue> {
        &self.release_queue
    }

    fn get(&self, key: NodeKey) -> Result<&SceneNode> {
        self.nodes
            .get(key)
            .ok_or_else(|| Error::InvalidNode(format!("{:?} is not in the scene", key)))
    }

    fn get_mut(&mut self, key: NodeKey) -> Result<&mut SceneNode> {
        self.nodes
            .get_mut(key)
            .ok_or_else(|| Error::InvalidNode(format!("{:?} is not in the scene", key)))
    }

    // ===== CREATION =====

    /// Create a detached node with default state
    pub fn create_node(&mut self) -> Result<NodeKey> {
        let handle = {
            let mut backend = backend::lock_backend(&self.backend)?;
            NativeHandle::allocate(&mut *backend, HandleKind::SceneNode, &self.release_queue)?
        };
        Ok(self.nodes.insert(SceneNode::new(handle)))
    }

    /// Create a detached node from a description.
    ///
    /// The description is validated before any backend state is allocated.
    pub fn create_node_with(&mut self, desc: NodeDesc) -> Result<NodeKey> {
        if desc.opacity.is_nan() {
            return Err(Error::InvalidArgument("node opacity is NaN".to_string()));
        }

        let (handle, render_data) = {
            let mut backend = backend::lock_backend(&self.backend)?;
            let mesh = match (desc.mesh, desc.width, desc.height) {
                (Some(mesh), _, _) => Some(mesh),
                (None, Some(width), Some(height)) => Some(Arc::new(GpuMesh::quad(
                    &mut *backend, &self.release_queue, width, height,
                )?)),
                _ => None,
            };
            if desc.pickable && mesh.as_ref().and_then(|m| m.bounds()).is_none() {
                return Err(Error::InvalidArgument(
                    "a pickable node needs a mesh with bounds".to_string(),
                ));
            }

            let render_data = if mesh.is_some() || desc.texture.is_some() {
                let mut material = Material::new(desc.shader_id);
                material.set_main_texture(desc.texture);
                let mut render_data = RenderData::new(&mut *backend, &self.release_queue, material)?;
                render_data.set_mesh(mesh);
                Some(render_data)
            } else {
                None
            };
            let handle =
                NativeHandle::allocate(&mut *backend, HandleKind::SceneNode, &self.release_queue)?;
            (handle, render_data)
        };

        let mut node = SceneNode::new(handle);
        node.name = desc.name;
        node.transform = desc.transform;
        node.visible = desc.visible;
        node.opacity = desc.opacity.clamp(0.0, 1.0);
        let key = self.nodes.insert(node);

        if let Some(render_data) = render_data {
            self.attach_render_data(key, render_data)?;
        }
        if desc.pickable {
            self.set_picking_enabled(key, true)?;
        }
        Ok(key)
    }

    /// Allocate a detached render attachment
    pub fn create_render_data(&self, material: Material) -> Result<RenderData> {
        let mut backend = backend::lock_backend(&self.backend)?;
        RenderData::new(&mut *backend, &self.release_queue, material)
    }

    /// Allocate a detached pickable volume
    pub fn create_pickable_volume(&self, targets: Vec<PickTarget>) -> Result<PickableVolume> {
        let mut backend = backend::lock_backend(&self.backend)?;
        PickableVolume::new(&mut *backend, &self.release_queue, targets)
    }

    /// Destroy a node and its whole subtree.
    ///
    /// Every destroyed node, attachment and volume enqueues its native
    /// handle on the release queue. Returns the number of nodes destroyed.
    pub fn destroy_node(&mut self, key: NodeKey) -> Result<usize> {
        self.get(key)?;
        self.unlink(key);

        let mut destroyed = 0usize;
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children.iter().copied());
                self.dirty_render_states.remove(&current);
                destroyed += 1;
            }
        }
        engine_debug!("vista3d::Scene", "Destroyed {} node(s)", destroyed);
        Ok(destroyed)
    }

    // ===== ACCESS =====

    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &SceneNode)> {
        self.nodes.iter()
    }

    pub fn name(&self, key: NodeKey) -> Option<&str> {
        self.nodes.get(key).and_then(|node| node.name())
    }

    pub fn set_name(&mut self, key: NodeKey, name: impl Into<String>) -> Result<()> {
        self.get_mut(key)?.name = Some(name.into());
        Ok(())
    }

    /// First node named `name` in the pre-order of `root`'s subtree
    pub fn find_by_name(&self, root: NodeKey, name: &str) -> Option<NodeKey> {
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            let node = self.nodes.get(key)?;
            if node.name() == Some(name) {
                return Some(key);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    pub fn transform(&self, key: NodeKey) -> Option<&Transform> {
        self.nodes.get(key).map(|node| &node.transform)
    }

    pub fn transform_mut(&mut self, key: NodeKey) -> Option<&mut Transform> {
        self.nodes.get_mut(key).map(|node| &mut node.transform)
    }

    /// `parent_world * local`, roots and detached nodes use their local matrix
    pub fn world_matrix(&self, key: NodeKey) -> Option<Mat4> {
        let mut node = self.nodes.get(key)?;
        let mut world = node.transform.local_matrix();
        while let Some(parent) = node.parent.and_then(|p| self.nodes.get(p)) {
            world = parent.transform.local_matrix() * world;
            node = parent;
        }
        Some(world)
    }

    // ===== TREE =====

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|node| node.parent)
    }

    pub fn child_count(&self, key: NodeKey) -> usize {
        self.nodes.get(key).map_or(0, |node| node.children.len())
    }

    pub fn child(&self, key: NodeKey, index: usize) -> Option<NodeKey> {
        self.nodes.get(key)?.children.get(index).copied()
    }

    /// Live view over the children of `key` (empty for an unknown key)
    pub fn children(&self, key: NodeKey) -> Children<'_> {
        let slice = self.nodes.get(key).map_or(&[][..], |node| node.children.as_slice());
        Children { inner: slice.iter() }
    }

    /// Whether `ancestor` is a strict ancestor of `key`
    pub fn is_ancestor(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = self.parent(key);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    /// Designate `key` as a live root, detaching it from its parent first
    pub fn add_root(&mut self, key: NodeKey) -> Result<()> {
        self.get(key)?;
        self.unlink(key);
        self.roots.push(key);
        self.propagate(key);
        Ok(())
    }

    /// Remove `key` from the root list. No-op (false) if it is not a root.
    pub fn remove_root(&mut self, key: NodeKey) -> bool {
        match self.roots.iter().position(|root| *root == key) {
            Some(index) => {
                self.roots.remove(index);
                true
            }
            None => false,
        }
    }

    /// Append `child` to `parent`'s children.
    ///
    /// Fails with `CycleError` when `child` is `parent` or one of its
    /// ancestors; the tree is left unchanged. Otherwise `child` is detached
    /// from its current parent (or the root list) and its subtree picks up
    /// the new inherited state.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<()> {
        self.get(parent)?;
        self.get(child)?;

        if child == parent || self.is_ancestor(child, parent) {
            engine_warn!("vista3d::Scene",
                "Rejected add_child: {:?} is an ancestor of {:?}", child, parent);
            return Err(Error::CycleError(format!(
                "{:?} cannot become a child of its descendant {:?}",
                child, parent
            )));
        }

        self.unlink(child);
        self.get_mut(child)?.parent = Some(parent);
        self.get_mut(parent)?.children.push(child);
        self.propagate(child);
        Ok(())
    }

    /// Detach `child` from `parent`. No-op (false) if it is not a child.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.unlink(child);
        self.propagate(child);
        true
    }

    /// Remove `key` from its parent's child list or from the root list
    fn unlink(&mut self, key: NodeKey) {
        let parent = self.nodes.get_mut(key).and_then(|node| node.parent.take());
        match parent {
            Some(parent) => {
                if let Some(parent_node) = self.nodes.get_mut(parent) {
                    parent_node.children.retain(|c| *c != key);
                }
            }
            None => {
                self.remove_root(key);
            }
        }
    }

    // ===== INHERITED STATE =====

    pub fn set_visible(&mut self, key: NodeKey, visible: bool) -> Result<()> {
        let node = self.get_mut(key)?;
        if node.visible != visible {
            node.visible = visible;
            self.propagate(key);
        }
        Ok(())
    }

    /// Set local opacity, clamped to [0, 1]. NaN is rejected.
    pub fn set_opacity(&mut self, key: NodeKey, opacity: f32) -> Result<()> {
        if opacity.is_nan() {
            engine_warn!("vista3d::Scene", "Rejected NaN opacity for {:?}", key);
            return Err(Error::InvalidArgument("opacity is NaN".to_string()));
        }
        self.get_mut(key)?.opacity = opacity.clamp(0.0, 1.0);
        self.propagate(key);
        Ok(())
    }

    /// Effective visibility: local flag AND every ancestor's
    pub fn is_shown(&self, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(node) = current.and_then(|k| self.nodes.get(k)) {
            if !node.visible {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Effective opacity: local opacity times every ancestor's
    pub fn effective_opacity(&self, key: NodeKey) -> f32 {
        let mut opacity = 1.0;
        let mut current = Some(key);
        while let Some(node) = current.and_then(|k| self.nodes.get(k)) {
            opacity *= node.opacity;
            current = node.parent;
        }
        opacity
    }

    /// Recompute effective state for `start` and its subtree and write it
    /// into every render attachment found there
    fn propagate(&mut self, start: NodeKey) {
        let (parent_shown, parent_opacity) = match self.parent(start) {
            Some(parent) => (self.is_shown(parent), self.effective_opacity(parent)),
            None => (true, 1.0),
        };

        let mut stack = vec![(start, parent_shown, parent_opacity)];
        while let Some((key, inherited_shown, inherited_opacity)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(key) else { continue };
            let shown = inherited_shown && node.visible;
            let opacity = inherited_opacity * node.opacity;
            if let Some(render_data) = node.render_data.as_mut() {
                render_data.apply_effective_state(shown, opacity);
                self.dirty_render_states.insert(key);
            }
            stack.extend(node.children.iter().map(|child| (*child, shown, opacity)));
        }
    }

    // ===== ATTACHMENTS =====

    pub fn render_data(&self, key: NodeKey) -> Option<&RenderData> {
        self.nodes.get(key).and_then(|node| node.render_data.as_ref())
    }

    pub fn render_data_mut(&mut self, key: NodeKey) -> Option<&mut RenderData> {
        self.nodes.get_mut(key).and_then(|node| node.render_data.as_mut())
    }

    /// Bind `render_data` to `key`, returning the attachment it replaces
    /// (with its owner link cleared)
    pub fn attach_render_data(
        &mut self,
        key: NodeKey,
        mut render_data: RenderData,
    ) -> Result<Option<RenderData>> {
        self.get(key)?;
        let (shown, opacity) = (self.is_shown(key), self.effective_opacity(key));
        render_data.set_owner(Some(key));
        render_data.apply_effective_state(shown, opacity);

        let old = self.get_mut(key)?.render_data.replace(render_data);
        self.dirty_render_states.insert(key);
        Ok(old.map(|mut old| {
            old.set_owner(None);
            old
        }))
    }

    /// Unbind and return the render attachment of `key`
    pub fn detach_render_data(&mut self, key: NodeKey) -> Option<RenderData> {
        let mut render_data = self.nodes.get_mut(key)?.render_data.take()?;
        render_data.set_owner(None);
        self.dirty_render_states.remove(&key);
        Some(render_data)
    }

    /// Move the render attachment of `from` to `to`, returning the
    /// attachment `to` had before
    pub fn transfer_render_data(&mut self, from: NodeKey, to: NodeKey) -> Result<Option<RenderData>> {
        self.get(to)?;
        let render_data = self.detach_render_data(from).ok_or_else(|| {
            Error::InvalidArgument(format!("{:?} has no render data to transfer", from))
        })?;
        self.attach_render_data(to, render_data)
    }

    pub fn pickable_volume(&self, key: NodeKey) -> Option<&PickableVolume> {
        self.nodes.get(key).and_then(|node| node.pickable.as_ref())
    }

    /// Bind `volume` to `key`, returning the volume it replaces
    pub fn attach_pickable_volume(
        &mut self,
        key: NodeKey,
        mut volume: PickableVolume,
    ) -> Result<Option<PickableVolume>> {
        volume.set_owner(Some(key));
        let old = self.get_mut(key)?.pickable.replace(volume);
        Ok(old.map(|mut old| {
            old.set_owner(None);
            old
        }))
    }

    /// Unbind and return the pickable volume of `key`
    pub fn detach_pickable_volume(&mut self, key: NodeKey) -> Option<PickableVolume> {
        let mut volume = self.nodes.get_mut(key)?.pickable.take()?;
        volume.set_owner(None);
        Some(volume)
    }

    /// Enable picking from the bounds of the node's mesh, or drop the
    /// current volume
    pub fn set_picking_enabled(&mut self, key: NodeKey, enabled: bool) -> Result<()> {
        if !enabled {
            self.get(key)?;
            self.detach_pickable_volume(key);
            return Ok(());
        }

        let bounds = self
            .get(key)?
            .render_data
            .as_ref()
            .and_then(|render_data| render_data.mesh())
            .and_then(|mesh| mesh.bounds())
            .ok_or_else(|| {
                engine_warn!("vista3d::Scene", "Cannot enable picking on {:?}: no mesh bounds", key);
                Error::InvalidArgument(format!("{:?} has no mesh with bounds", key))
            })?;
        let volume = self.create_pickable_volume(vec![PickTarget::Aabb(bounds)])?;
        self.attach_pickable_volume(key, volume)?;
        Ok(())
    }

    pub fn picking_enabled(&self, key: NodeKey) -> bool {
        self.pickable_volume(key).is_some()
    }

    /// World-space bounds of the node's pickable volume
    pub fn world_bounds(&self, key: NodeKey) -> Option<AABB> {
        let local = self.pickable_volume(key)?.local_bounds()?;
        Some(local.transformed(&self.world_matrix(key)?))
    }

    /// Whether the world bounds of two pickable nodes overlap
    pub fn is_colliding(&self, a: NodeKey, b: NodeKey) -> bool {
        match (self.world_bounds(a), self.world_bounds(b)) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        }
    }

    // ===== LOD =====

    /// Set the visible distance range. Both bounds must be non-negative and
    /// `min <= max`.
    pub fn set_lod_range(&mut self, key: NodeKey, min: f32, max: f32) -> Result<()> {
        if !(min >= 0.0 && max >= 0.0) {
            return Err(Error::InvalidArgument(format!(
                "LOD range must be non-negative, got [{}, {}]",
                min, max
            )));
        }
        if min > max {
            return Err(Error::InvalidArgument(format!(
                "LOD min {} is greater than max {}",
                min, max
            )));
        }
        self.get_mut(key)?.lod_range = (min, max);
        Ok(())
    }

    pub fn lod_range(&self, key: NodeKey) -> Option<(f32, f32)> {
        self.nodes.get(key).map(|node| node.lod_range)
    }

    // ===== PENDING RESOURCES =====

    fn render_data_for(&mut self, key: NodeKey) -> Result<&mut RenderData> {
        self.get_mut(key)?
            .render_data
            .as_mut()
            .ok_or_else(|| Error::InvalidArgument(format!("{:?} has no render data", key)))
    }

    /// Mark `texture` as the pending main texture of the node's material
    pub fn request_texture(&mut self, key: NodeKey, texture: ResourceKey) -> Result<()> {
        self.render_data_for(key)?.material_mut().set_pending_texture(Some(texture));
        Ok(())
    }

    /// Install a loaded texture if `texture` is still the pending one
    pub fn apply_texture(&mut self, key: NodeKey, texture: &ResourceKey, loaded: Arc<GpuTexture>) -> bool {
        match self.render_data_mut(key) {
            Some(render_data) if render_data.material().pending_texture() == Some(texture) => {
                render_data.material_mut().set_main_texture(Some(loaded));
                true
            }
            _ => false,
        }
    }

    /// Clear the pending mark after a failed load, keeping the previous texture
    pub fn fail_texture(&mut self, key: NodeKey, texture: &ResourceKey) -> bool {
        match self.render_data_mut(key) {
            Some(render_data) if render_data.material().pending_texture() == Some(texture) => {
                render_data.material_mut().set_pending_texture(None);
                true
            }
            _ => false,
        }
    }

    /// Mark `mesh` as the pending mesh of the node's render attachment
    pub fn request_mesh(&mut self, key: NodeKey, mesh: ResourceKey) -> Result<()> {
        self.render_data_for(key)?.set_pending_mesh(Some(mesh));
        Ok(())
    }

    /// Install a loaded mesh if `mesh` is still the pending one
    pub fn apply_mesh(&mut self, key: NodeKey, mesh: &ResourceKey, loaded: Arc<GpuMesh>) -> bool {
        match self.render_data_mut(key) {
            Some(render_data) if render_data.pending_mesh() == Some(mesh) => {
                render_data.set_mesh(Some(loaded));
                true
            }
            _ => false,
        }
    }

    /// Clear the pending mark after a failed load, keeping the previous mesh
    pub fn fail_mesh(&mut self, key: NodeKey, mesh: &ResourceKey) -> bool {
        match self.render_data_mut(key) {
            Some(render_data) if render_data.pending_mesh() == Some(mesh) => {
                render_data.set_pending_mesh(None);
                true
            }
            _ => false,
        }
    }

    /// Request `texture` through the throttler and install it on `key` when
    /// it arrives.
    ///
    /// The completion runs during `Throttler::process_frame` and takes the
    /// scene write lock, so the caller of `process_frame` must not hold it.
    pub fn load_texture(
        scene: &Arc<RwLock<Scene>>,
        key: NodeKey,
        throttler: &Throttler,
        texture: ResourceKey,
        priority: i32,
    ) -> Result<RequestTicket> {
        write_scene(scene)?.request_texture(key, texture.clone())?;
        let weak = Arc::downgrade(scene);
        let pending = texture.clone();
        throttler.request(texture, priority, move |outcome: LoadOutcome| {
            with_scene(&weak, |scene| match outcome {
                Ok(LoadedResource::Texture(loaded)) => {
                    scene.apply_texture(key, &pending, loaded);
                }
                Ok(LoadedResource::Mesh(_)) => {
                    engine_error!("vista3d::Scene", "{} resolved to a mesh", pending);
                    scene.fail_texture(key, &pending);
                }
                Err(err) => {
                    engine_warn!("vista3d::Scene", "Texture {} failed for {:?}: {}", pending, key, err);
                    scene.fail_texture(key, &pending);
                }
            });
        })
    }

    /// Request `mesh` through the throttler and install it on `key` when it
    /// arrives. Same locking rule as `load_texture`.
    pub fn load_mesh(
        scene: &Arc<RwLock<Scene>>,
        key: NodeKey,
        throttler: &Throttler,
        mesh: ResourceKey,
        priority: i32,
    ) -> Result<RequestTicket> {
        write_scene(scene)?.request_mesh(key, mesh.clone())?;
        let weak = Arc::downgrade(scene);
        let pending = mesh.clone();
        throttler.request(mesh, priority, move |outcome: LoadOutcome| {
            with_scene(&weak, |scene| match outcome {
                Ok(LoadedResource::Mesh(loaded)) => {
                    scene.apply_mesh(key, &pending, loaded);
                }
                Ok(LoadedResource::Texture(_)) => {
                    engine_error!("vista3d::Scene", "{} resolved to a texture", pending);
                    scene.fail_mesh(key, &pending);
                }
                Err(err) => {
                    engine_warn!("vista3d::Scene", "Mesh {} failed for {:?}: {}", pending, key, err);
                    scene.fail_mesh(key, &pending);
                }
            });
        })
    }

    // ===== RENDER STATE SYNC =====

    /// Nodes whose render state has not been pushed yet
    pub fn dirty_render_states(&self) -> &FxHashSet<NodeKey> {
        &self.dirty_render_states
    }

    /// Push every dirty render state to the backend. Rendering thread only.
    ///
    /// Every dirty node is attempted; the first failure is returned after
    /// the set has been flushed.
    pub fn sync_render_state(&mut self) -> Result<usize> {
        if self.dirty_render_states.is_empty() {
            return Ok(0);
        }
        let dirty = std::mem::take(&mut self.dirty_render_states);
        let mut backend = backend::lock_backend(&self.backend)?;

        let mut synced = 0usize;
        let mut first_error = None;
        for key in dirty {
            let Some(render_data) = self.nodes.get(key).and_then(|n| n.render_data.as_ref()) else {
                continue;
            };
            match backend.set_render_state(render_data.handle().raw(), render_data.render_state()) {
                Ok(()) => synced += 1,
                Err(err) => {
                    engine_error!("vista3d::Scene", "Failed to sync render state of {:?}: {}", key, err);
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(synced),
        }
    }
}

fn write_scene(scene: &RwLock<Scene>) -> Result<std::sync::RwLockWriteGuard<'_, Scene>> {
    scene
        .write()
        .map_err(|_| Error::BackendError("scene lock poisoned".to_string()))
}

/// Run `f` on the scene if it is still alive
fn with_scene(scene: &Weak<RwLock<Scene>>, f: impl FnOnce(&mut Scene)) {
    let Some(scene) = scene.upgrade() else { return };
    match write_scene(&scene) {
        Ok(mut guard) => f(&mut guard),
        Err(err) => engine_error!("vista3d::Scene", "Dropping load result: {}", err),
    };
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
