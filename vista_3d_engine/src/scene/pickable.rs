/// Pickable volume: the geometric targets a ray is tested against

use std::sync::Arc;
use glam::Vec3;
use crate::backend::{Backend, HandleKind};
use crate::error::Result;
use crate::native::{NativeHandle, ReleaseQueue};
use super::aabb::AABB;
use super::node::NodeKey;
use super::ray::Ray;

/// One pick target, expressed in node-local space
#[derive(Debug, Clone)]
pub enum PickTarget {
    /// Bounding box (typically a mesh's bounds)
    Aabb(AABB),
    /// Bounding sphere
    Sphere { center: Vec3, radius: f32 },
    /// Explicit triangle soup, tested exactly
    Triangles(Arc<Vec<[Vec3; 3]>>),
}

impl PickTarget {
    /// Distance along a local-space ray to the nearest hit
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        match self {
            PickTarget::Aabb(aabb) => ray.intersect_aabb(aabb),
            PickTarget::Sphere { center, radius } => ray.intersect_sphere(*center, *radius),
            PickTarget::Triangles(triangles) => triangles
                .iter()
                .filter_map(|[a, b, c]| ray.intersect_triangle(*a, *b, *c))
                .min_by(f32::total_cmp),
        }
    }

    /// Local-space bounds
    pub fn bounds(&self) -> Option<AABB> {
        match self {
            PickTarget::Aabb(aabb) => Some(*aabb),
            PickTarget::Sphere { center, radius } => {
                Some(AABB::new(*center - Vec3::splat(*radius), *center + Vec3::splat(*radius)))
            }
            PickTarget::Triangles(triangles) => {
                let points: Vec<Vec3> = triangles.iter().flatten().copied().collect();
                AABB::from_points(&points)
            }
        }
    }
}

/// Set of pick targets owned by at most one node
#[derive(Debug)]
pub struct PickableVolume {
    handle: NativeHandle,
    targets: Vec<PickTarget>,
    owner: Option<NodeKey>,
}

impl PickableVolume {
    /// Allocate a detached volume
    pub fn new(
        backend: &mut dyn Backend,
        queue: &Arc<ReleaseQueue>,
        targets: Vec<PickTarget>,
    ) -> Result<Self> {
        Ok(Self {
            handle: NativeHandle::allocate(backend, HandleKind::PickableVolume, queue)?,
            targets,
            owner: None,
        })
    }

    pub fn handle(&self) -> &NativeHandle {
        &self.handle
    }

    pub fn targets(&self) -> &[PickTarget] {
        &self.targets
    }

    pub fn add_target(&mut self, target: PickTarget) {
        self.targets.push(target);
    }

    /// Node this volume is bound to
    pub fn owner(&self) -> Option<NodeKey> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<NodeKey>) {
        self.owner = owner;
    }

    /// Nearest hit distance over all targets, along a local-space ray
    pub fn intersect_local(&self, ray: &Ray) -> Option<f32> {
        self.targets
            .iter()
            .filter_map(|target| target.intersect(ray))
            .min_by(f32::total_cmp)
    }

    /// Union of every target's bounds
    pub fn local_bounds(&self) -> Option<AABB> {
        self.targets
            .iter()
            .filter_map(PickTarget::bounds)
            .reduce(|a, b| a.union(&b))
    }
}
