/// Resource identity used for request deduplication

use std::fmt;

/// Type of a loadable asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// 2D image texture (PNG, JPEG)
    Texture,
    /// Cubemap stored as one vertical strip of six square faces
    CubemapTexture,
    /// Wavefront OBJ mesh
    Mesh,
}

/// (kind, source identifier) pair.
///
/// Two requests with equal keys share one in-flight load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    kind: ResourceKind,
    source: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, source: impl Into<String>) -> Self {
        Self { kind, source: source.into() }
    }

    /// Key for a 2D texture
    pub fn texture(source: impl Into<String>) -> Self {
        Self::new(ResourceKind::Texture, source)
    }

    /// Key for a cubemap texture
    pub fn cubemap(source: impl Into<String>) -> Self {
        Self::new(ResourceKind::CubemapTexture, source)
    }

    /// Key for a mesh
    pub fn mesh(source: impl Into<String>) -> Self {
        Self::new(ResourceKind::Mesh, source)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Source identifier handed to the `AssetSource`
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.source)
    }
}
