/// Mock Backend for tests and headless tools (no GPU required)
///
/// Records every handle it hands out, every release, every upload and the
/// last render state pushed per attachment, so tests can assert on the
/// exact traffic the core produced.

use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::engine_bail;
use super::backend::{
    Backend, BackendStats, HandleKind, MeshUpload, RawHandle, RenderState, TextureUpload,
};

// ============================================================================
// Mock Backend
// ============================================================================

#[derive(Debug, Default)]
pub struct MockBackend {
    next_id: u64,
    live: FxHashMap<RawHandle, HandleKind>,
    /// Handles released so far, in release order
    pub destroyed: Vec<RawHandle>,
    /// Last render state pushed for each render attachment
    pub render_states: FxHashMap<RawHandle, RenderState>,
    /// Number of `set_render_state` calls
    pub render_state_pushes: usize,
    /// Uploaded texture sizes (width, height, faces)
    pub uploaded_textures: Vec<(u32, u32, usize)>,
    /// Uploaded mesh vertex counts
    pub uploaded_meshes: Vec<usize>,
    /// When set, every upload fails with a backend error
    pub fail_uploads: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `handle` is currently allocated
    pub fn is_live(&self, handle: RawHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Kind of a live handle
    pub fn kind_of(&self, handle: RawHandle) -> Option<HandleKind> {
        self.live.get(&handle).copied()
    }

    /// Number of live handles of one kind
    pub fn live_count(&self, kind: HandleKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    fn allocate(&mut self, kind: HandleKind) -> RawHandle {
        self.next_id += 1;
        let handle = RawHandle(self.next_id);
        self.live.insert(handle, kind);
        handle
    }
}

impl Backend for MockBackend {
    fn create_handle(&mut self, kind: HandleKind) -> Result<RawHandle> {
        Ok(self.allocate(kind))
    }

    fn destroy_handle(&mut self, handle: RawHandle) -> Result<()> {
        if self.live.remove(&handle).is_none() {
            return Err(Error::LifecycleError(format!(
                "release of unknown or already released handle {}",
                handle
            )));
        }
        self.render_states.remove(&handle);
        self.destroyed.push(handle);
        Ok(())
    }

    fn upload_texture(&mut self, upload: &TextureUpload) -> Result<RawHandle> {
        if self.fail_uploads {
            engine_bail!("vista3d::mock", "upload_texture: backend rejected upload");
        }
        if upload.faces.len() != upload.expected_faces() {
            engine_bail!("vista3d::mock",
                "upload_texture: expected {} faces, got {}",
                upload.expected_faces(), upload.faces.len());
        }
        if upload.faces.iter().any(|face| face.len() != upload.face_size()) {
            engine_bail!("vista3d::mock",
                "upload_texture: face size mismatch for {}x{}",
                upload.width, upload.height);
        }
        self.uploaded_textures.push((upload.width, upload.height, upload.faces.len()));
        Ok(self.allocate(HandleKind::Texture))
    }

    fn upload_mesh(&mut self, upload: &MeshUpload) -> Result<RawHandle> {
        if self.fail_uploads {
            engine_bail!("vista3d::mock", "upload_mesh: backend rejected upload");
        }
        if let Some(bad) = upload.indices.iter().find(|i| **i as usize >= upload.positions.len()) {
            engine_bail!("vista3d::mock",
                "upload_mesh: index {} out of range ({} vertices)",
                bad, upload.positions.len());
        }
        self.uploaded_meshes.push(upload.positions.len());
        Ok(self.allocate(HandleKind::Mesh))
    }

    fn set_render_state(&mut self, render_data: RawHandle, state: RenderState) -> Result<()> {
        match self.live.get(&render_data) {
            Some(HandleKind::RenderData) => {}
            Some(other) => engine_bail!("vista3d::mock",
                "set_render_state: handle {} is a {:?}, not render data",
                render_data, other),
            None => return Err(Error::LifecycleError(format!(
                "set_render_state on released handle {}",
                render_data
            ))),
        }
        self.render_states.insert(render_data, state);
        self.render_state_pushes += 1;
        Ok(())
    }

    fn stats(&self) -> BackendStats {
        BackendStats {
            live_handles: self.live.len(),
            textures_uploaded: self.uploaded_textures.len() as u64,
            meshes_uploaded: self.uploaded_meshes.len() as u64,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mock_backend_tests.rs"]
mod tests;
