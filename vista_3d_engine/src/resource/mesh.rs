/// Backend-resident mesh produced by the conversion step

use std::sync::Arc;
use glam::Vec3;
use crate::backend::{Backend, HandleKind, MeshUpload};
use crate::error::{Error, Result};
use crate::native::{NativeHandle, ReleaseQueue};
use crate::scene::AABB;

/// Uploaded triangle mesh with its local-space bounds
#[derive(Debug)]
pub struct GpuMesh {
    handle: NativeHandle,
    vertex_count: usize,
    index_count: usize,
    /// Local-space bounds, `None` for a mesh without vertices
    bounds: Option<AABB>,
}

impl GpuMesh {
    /// Upload decoded geometry. Rendering thread only.
    pub fn upload(
        backend: &mut dyn Backend,
        queue: &Arc<ReleaseQueue>,
        upload: &MeshUpload,
    ) -> Result<Self> {
        let points: Vec<Vec3> = upload.positions.iter().map(|p| Vec3::from_array(*p)).collect();
        let raw = backend.upload_mesh(upload)?;
        Ok(Self {
            handle: NativeHandle::adopt(raw, HandleKind::Mesh, queue),
            vertex_count: upload.positions.len(),
            index_count: upload.indices.len(),
            bounds: AABB::from_points(&points),
        })
    }

    /// Two-triangle quad of `width` x `height` in the XY plane, centered on
    /// the origin and facing +Z
    pub fn quad(
        backend: &mut dyn Backend,
        queue: &Arc<ReleaseQueue>,
        width: f32,
        height: f32,
    ) -> Result<Self> {
        if !(width > 0.0 && height > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "quad size must be positive, got {}x{}",
                width, height
            )));
        }
        let (hw, hh) = (width * 0.5, height * 0.5);
        let upload = MeshUpload {
            positions: vec![
                [-hw, -hh, 0.0],
                [hw, -hh, 0.0],
                [hw, hh, 0.0],
                [-hw, hh, 0.0],
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        };
        Self::upload(backend, queue, &upload)
    }

    pub fn handle(&self) -> &NativeHandle {
        &self.handle
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn bounds(&self) -> Option<AABB> {
        self.bounds
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
