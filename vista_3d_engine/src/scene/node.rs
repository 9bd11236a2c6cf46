/// Scene node types

use std::sync::Arc;
use slotmap::new_key_type;
use crate::native::NativeHandle;
use crate::resource::{GpuMesh, GpuTexture};
use super::pickable::PickableVolume;
use super::render_data::{RenderData, ShaderId};
use super::transform::Transform;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a SceneNode within a Scene.
    ///
    /// Keys remain valid until their own node is destroyed.
    pub struct NodeKey;
}

// ===== SCENE NODE =====

/// Tree element stored in the scene arena.
///
/// Parent and children are keys into the same arena; ownership of the
/// subtree is expressed by the child list, the parent key is a plain
/// back-reference.
#[derive(Debug)]
pub struct SceneNode {
    pub(crate) name: Option<String>,
    pub(crate) handle: NativeHandle,
    pub(crate) transform: Transform,
    pub(crate) render_data: Option<RenderData>,
    pub(crate) pickable: Option<PickableVolume>,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    /// Local visibility flag
    pub(crate) visible: bool,
    /// Local opacity in [0, 1]
    pub(crate) opacity: f32,
    /// Visible distance range (min, max)
    pub(crate) lod_range: (f32, f32),
}

impl SceneNode {
    pub(crate) fn new(handle: NativeHandle) -> Self {
        Self {
            name: None,
            handle,
            transform: Transform::default(),
            render_data: None,
            pickable: None,
            parent: None,
            children: Vec::new(),
            visible: true,
            opacity: 1.0,
            lod_range: (0.0, f32::MAX),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn handle(&self) -> &NativeHandle {
        &self.handle
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn render_data(&self) -> Option<&RenderData> {
        self.render_data.as_ref()
    }

    pub fn pickable_volume(&self) -> Option<&PickableVolume> {
        self.pickable.as_ref()
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Local visibility flag (see `Scene::is_shown` for the effective one)
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Local opacity (see `Scene::effective_opacity`)
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn lod_range(&self) -> (f32, f32) {
        self.lod_range
    }
}

// ===== NODE DESC =====

/// Every optional input of node creation.
///
/// When `mesh` is absent and both `width` and `height` are set, a quad of
/// that size is built. A render attachment is created whenever a mesh or
/// texture is available.
#[derive(Debug, Clone)]
pub struct NodeDesc {
    pub name: Option<String>,
    pub transform: Transform,
    pub mesh: Option<Arc<GpuMesh>>,
    pub texture: Option<Arc<GpuTexture>>,
    pub shader_id: ShaderId,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub visible: bool,
    pub opacity: f32,
    /// Build a pickable volume from the mesh bounds
    pub pickable: bool,
}

impl Default for NodeDesc {
    fn default() -> Self {
        Self {
            name: None,
            transform: Transform::default(),
            mesh: None,
            texture: None,
            shader_id: ShaderId::default(),
            width: None,
            height: None,
            visible: true,
            opacity: 1.0,
            pickable: false,
        }
    }
}

impl NodeDesc {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Default::default() }
    }
}
