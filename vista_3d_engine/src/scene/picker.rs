/// Ray picking over the scene graph.
///
/// The ray is moved into each node's local space (inverse world matrix)
/// for the volume test; the hit point is moved back to world space and the
/// distance is measured there, so scaled nodes compare correctly.

use std::sync::RwLock;
use glam::{Mat4, Vec3};
use crate::error::{Error, Result};
use super::node::NodeKey;
use super::pickable::PickableVolume;
use super::ray::Ray;
use super::scene::Scene;

/// Result of a ray-volume intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// The node whose volume was hit
    pub node: NodeKey,
    /// World-space distance from the ray origin
    pub distance: f32,
    /// World-space hit location
    pub point: Vec3,
}

/// Stateless pick query engine
pub struct Picker;

impl Picker {
    /// Every hit under `root`, nearest first.
    ///
    /// Only effectively visible nodes that own a pickable volume are
    /// tested. Equal distances keep traversal pre-order.
    pub fn pick(scene: &Scene, ray: &Ray, root: NodeKey) -> Vec<PickHit> {
        let mut hits = Vec::new();
        if !scene.contains(root) || !scene.is_shown(root) {
            return hits;
        }

        let root_parent_world = scene
            .parent(root)
            .and_then(|parent| scene.world_matrix(parent))
            .unwrap_or(Mat4::IDENTITY);

        let mut stack = vec![(root, root_parent_world)];
        while let Some((key, parent_world)) = stack.pop() {
            let Some(node) = scene.node(key) else { continue };
            if !node.visible() {
                continue;
            }
            let world = parent_world * node.transform().local_matrix();

            if let Some((distance, point)) = node
                .pickable_volume()
                .and_then(|volume| Self::intersect(volume, &world, ray))
            {
                hits.push(PickHit { node: key, distance, point });
            }

            stack.extend(node.children().iter().rev().map(|child| (*child, world)));
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Nearest hit, the first element of `pick`
    pub fn pick_nearest(scene: &Scene, ray: &Ray, root: NodeKey) -> Option<PickHit> {
        Self::pick(scene, ray, root).into_iter().next()
    }

    /// Whether `node` is the nearest thing `ray` hits under `root`
    pub fn is_looking_at(scene: &Scene, ray: &Ray, root: NodeKey, node: NodeKey) -> bool {
        Self::pick_nearest(scene, ray, root).is_some_and(|hit| hit.node == node)
    }

    /// `pick` under the scene read lock, for queries from outside the
    /// rendering thread
    pub fn pick_locked(scene: &RwLock<Scene>, ray: &Ray, root: NodeKey) -> Result<Vec<PickHit>> {
        let scene = scene
            .read()
            .map_err(|_| Error::BackendError("scene lock poisoned".to_string()))?;
        Ok(Self::pick(&scene, ray, root))
    }

    fn intersect(
        volume: &PickableVolume,
        world: &Mat4,
        ray: &Ray,
    ) -> Option<(f32, Vec3)> {
        // Singular (zero-scale) nodes cannot be hit
        if world.determinant() == 0.0 {
            return None;
        }
        let inverse = world.inverse();
        if !inverse.is_finite() {
            return None;
        }
        let local_ray = ray.transformed(&inverse);
        let t = volume.intersect_local(&local_ray)?;
        let point = world.transform_point3(local_ray.point_at(t));
        Some(((point - ray.origin).length(), point))
    }
}

#[cfg(test)]
#[path = "picker_tests.rs"]
mod tests;
