/// Render attachment: geometry, material and eye mask of one node.
///
/// The scene writes the effective eye mask and opacity into the attachment
/// whenever visibility or opacity changes on the node or its ancestors.
/// Renderers read these fields as they are and never walk the tree.

use std::sync::Arc;
use glam::Vec4;
use crate::backend::{Backend, HandleKind, RenderMask, RenderState};
use crate::error::Result;
use crate::native::{NativeHandle, ReleaseQueue};
use crate::resource::{GpuMesh, GpuTexture, ResourceKey};
use super::node::NodeKey;

// ===== SHADER ID =====

/// Backend shader program identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

impl ShaderId {
    /// Unlit textured shader
    pub const TEXTURE: ShaderId = ShaderId(0);
}

impl Default for ShaderId {
    fn default() -> Self {
        Self::TEXTURE
    }
}

// ===== MATERIAL =====

/// Shader parameters and texture references
#[derive(Debug, Clone)]
pub struct Material {
    shader_id: ShaderId,
    color: Vec4,
    main_texture: Option<Arc<GpuTexture>>,
    /// Key of a texture still loading for this material
    pending_texture: Option<ResourceKey>,
    /// Effective opacity, written by the scene
    opacity: f32,
}

impl Material {
    pub fn new(shader_id: ShaderId) -> Self {
        Self {
            shader_id,
            color: Vec4::ONE,
            main_texture: None,
            pending_texture: None,
            opacity: 1.0,
        }
    }

    pub fn shader_id(&self) -> ShaderId {
        self.shader_id
    }

    pub fn set_shader_id(&mut self, shader_id: ShaderId) {
        self.shader_id = shader_id;
    }

    pub fn color(&self) -> Vec4 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec4) {
        self.color = color;
    }

    pub fn main_texture(&self) -> Option<&Arc<GpuTexture>> {
        self.main_texture.as_ref()
    }

    /// Replace the main texture, returning the previous one.
    ///
    /// Clears any pending texture load for this material.
    pub fn set_main_texture(&mut self, texture: Option<Arc<GpuTexture>>) -> Option<Arc<GpuTexture>> {
        self.pending_texture = None;
        std::mem::replace(&mut self.main_texture, texture)
    }

    pub fn pending_texture(&self) -> Option<&ResourceKey> {
        self.pending_texture.as_ref()
    }

    pub(crate) fn set_pending_texture(&mut self, key: Option<ResourceKey>) {
        self.pending_texture = key;
    }

    /// Effective opacity (local opacity times every ancestor's)
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub(crate) fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(ShaderId::default())
    }
}

// ===== RENDER DATA =====

/// Geometry + material bound to at most one scene node
#[derive(Debug)]
pub struct RenderData {
    handle: NativeHandle,
    mesh: Option<Arc<GpuMesh>>,
    /// Key of a mesh still loading for this attachment
    pending_mesh: Option<ResourceKey>,
    material: Material,
    render_mask: RenderMask,
    owner: Option<NodeKey>,
}

impl RenderData {
    /// Allocate a detached render attachment
    pub fn new(
        backend: &mut dyn Backend,
        queue: &Arc<ReleaseQueue>,
        material: Material,
    ) -> Result<Self> {
        Ok(Self {
            handle: NativeHandle::allocate(backend, HandleKind::RenderData, queue)?,
            mesh: None,
            pending_mesh: None,
            material,
            render_mask: RenderMask::BOTH,
            owner: None,
        })
    }

    pub fn with_mesh(mut self, mesh: Arc<GpuMesh>) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn handle(&self) -> &NativeHandle {
        &self.handle
    }

    pub fn mesh(&self) -> Option<&Arc<GpuMesh>> {
        self.mesh.as_ref()
    }

    /// Replace the mesh, returning the previous one.
    ///
    /// Clears any pending mesh load for this attachment.
    pub fn set_mesh(&mut self, mesh: Option<Arc<GpuMesh>>) -> Option<Arc<GpuMesh>> {
        self.pending_mesh = None;
        std::mem::replace(&mut self.mesh, mesh)
    }

    pub fn pending_mesh(&self) -> Option<&ResourceKey> {
        self.pending_mesh.as_ref()
    }

    pub(crate) fn set_pending_mesh(&mut self, key: Option<ResourceKey>) {
        self.pending_mesh = key;
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    /// Eyes this attachment is drawn for (empty when hidden)
    pub fn render_mask(&self) -> RenderMask {
        self.render_mask
    }

    /// Node this attachment is bound to
    pub fn owner(&self) -> Option<NodeKey> {
        self.owner
    }

    /// Snapshot pushed to the backend
    pub fn render_state(&self) -> RenderState {
        RenderState {
            mask: self.render_mask,
            opacity: self.material.opacity,
        }
    }

    pub(crate) fn set_owner(&mut self, owner: Option<NodeKey>) {
        self.owner = owner;
    }

    pub(crate) fn apply_effective_state(&mut self, shown: bool, opacity: f32) {
        self.render_mask = if shown { RenderMask::BOTH } else { RenderMask::empty() };
        self.material.set_opacity(opacity);
    }
}
