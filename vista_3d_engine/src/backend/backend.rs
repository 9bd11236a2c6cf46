/// Backend trait - native handle factory and render-state sink

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use bitflags::bitflags;
use crate::error::{Error, Result};

// ============================================================================
// Handles
// ============================================================================

/// Raw identifier of backend-side state.
///
/// Carries no ownership. Ownership lives in `native::NativeHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(pub u64);

impl fmt::Display for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of backend state a handle refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Scene node (transform + attachment slots)
    SceneNode,
    /// Render attachment (geometry + material)
    RenderData,
    /// Pick target holder
    PickableVolume,
    /// Uploaded texture (2D or cubemap)
    Texture,
    /// Uploaded mesh
    Mesh,
}

// ============================================================================
// Render state
// ============================================================================

bitflags! {
    /// Which stereo eye(s) draw a render attachment
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderMask: u32 {
        /// Drawn for the left eye
        const LEFT = 1 << 0;
        /// Drawn for the right eye
        const RIGHT = 1 << 1;
        /// Drawn for both eyes
        const BOTH = Self::LEFT.bits() | Self::RIGHT.bits();
    }
}

/// Render state pushed to the backend for one render attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Eye mask (empty = not drawn)
    pub mask: RenderMask,
    /// Material opacity in [0, 1]
    pub opacity: f32,
}

// ============================================================================
// Uploads
// ============================================================================

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// Single 2D image
    Texture2D,
    /// Six square faces (+X, -X, +Y, -Y, +Z, -Z)
    Cubemap,
}

/// Decoded texture ready for upload (RGBA8, tightly packed rows)
#[derive(Debug, Clone)]
pub struct TextureUpload {
    /// Texture dimensionality
    pub kind: TextureKind,
    /// Face width in pixels
    pub width: u32,
    /// Face height in pixels
    pub height: u32,
    /// One pixel buffer per face (1 for 2D, 6 for cubemaps)
    pub faces: Vec<Vec<u8>>,
}

impl TextureUpload {
    /// Expected byte size of one face
    pub fn face_size(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Number of faces this kind of texture must carry
    pub fn expected_faces(&self) -> usize {
        match self.kind {
            TextureKind::Texture2D => 1,
            TextureKind::Cubemap => 6,
        }
    }
}

/// Decoded triangle mesh ready for upload
#[derive(Debug, Clone, Default)]
pub struct MeshUpload {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Triangle list indices (empty = non-indexed)
    pub indices: Vec<u32>,
}

/// Backend statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Handles currently alive in the backend
    pub live_handles: usize,
    /// Textures uploaded since creation
    pub textures_uploaded: u64,
    /// Meshes uploaded since creation
    pub meshes_uploaded: u64,
}

// ============================================================================
// Backend trait
// ============================================================================

/// Native rendering backend.
///
/// Every call is expected on the thread that owns the rendering context.
/// The engine wraps the backend in `Arc<Mutex<dyn Backend>>` and only
/// locks it from the per-frame drain and from scene construction.
pub trait Backend: Send + Sync {
    /// Allocate fresh backend state
    fn create_handle(&mut self, kind: HandleKind) -> Result<RawHandle>;

    /// Release backend state.
    ///
    /// Releasing an unknown or already-released handle is a
    /// `LifecycleError`.
    fn destroy_handle(&mut self, handle: RawHandle) -> Result<()>;

    /// Upload a decoded texture, returning its texture handle
    fn upload_texture(&mut self, upload: &TextureUpload) -> Result<RawHandle>;

    /// Upload a decoded mesh, returning its mesh handle
    fn upload_mesh(&mut self, upload: &MeshUpload) -> Result<RawHandle>;

    /// Set eye mask and opacity on a render attachment
    fn set_render_state(&mut self, render_data: RawHandle, state: RenderState) -> Result<()>;

    /// Get statistics about the backend
    fn stats(&self) -> BackendStats;
}

/// Lock a shared backend, mapping a poisoned mutex to `BackendError`
pub fn lock_backend(backend: &Arc<Mutex<dyn Backend>>) -> Result<MutexGuard<'_, dyn Backend + 'static>> {
    backend
        .lock()
        .map_err(|_| Error::BackendError("backend mutex poisoned".to_string()))
}
