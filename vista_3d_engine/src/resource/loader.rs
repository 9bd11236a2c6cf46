/// Loader trait: decode on a worker thread, convert on the render thread

use std::sync::Arc;
use crate::backend::{Backend, MeshUpload, TextureUpload};
use crate::error::{Error, Result};
use crate::native::ReleaseQueue;
use super::asset_source::AssetStream;
use super::mesh::GpuMesh;
use super::resource_key::ResourceKey;
use super::texture::GpuTexture;

/// CPU-side data produced by `AsyncLoader::load`
#[derive(Debug, Clone)]
pub enum DecodedResource {
    Texture(TextureUpload),
    Mesh(MeshUpload),
}

/// Backend-ready object delivered to waiters.
///
/// Cloning shares the same backend object; it is released once the last
/// clone is dropped.
#[derive(Debug, Clone)]
pub enum LoadedResource {
    Texture(Arc<GpuTexture>),
    Mesh(Arc<GpuMesh>),
}

impl LoadedResource {
    pub fn as_texture(&self) -> Option<&Arc<GpuTexture>> {
        match self {
            LoadedResource::Texture(texture) => Some(texture),
            LoadedResource::Mesh(_) => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&Arc<GpuMesh>> {
        match self {
            LoadedResource::Mesh(mesh) => Some(mesh),
            LoadedResource::Texture(_) => None,
        }
    }
}

/// Format-specific loader, registered per `ResourceKind` on the throttler
pub trait AsyncLoader: Send + Sync {
    /// Decode the stream. Runs on a worker thread; must not touch the
    /// backend. Failures become `LoadError`.
    fn load(&self, key: &ResourceKey, stream: &mut dyn AssetStream) -> Result<DecodedResource>;

    /// Turn decoded data into a backend object. Runs on the rendering
    /// thread during the frame drain. Failures become `ConversionError`.
    fn convert(
        &self,
        backend: &mut dyn Backend,
        queue: &Arc<ReleaseQueue>,
        decoded: DecodedResource,
    ) -> Result<LoadedResource> {
        upload_decoded(backend, queue, decoded)
    }
}

/// Upload decoded data as-is
pub fn upload_decoded(
    backend: &mut dyn Backend,
    queue: &Arc<ReleaseQueue>,
    decoded: DecodedResource,
) -> Result<LoadedResource> {
    let loaded = match decoded {
        DecodedResource::Texture(upload) => {
            GpuTexture::upload(backend, queue, &upload).map(|t| LoadedResource::Texture(Arc::new(t)))
        }
        DecodedResource::Mesh(upload) => {
            GpuMesh::upload(backend, queue, &upload).map(|m| LoadedResource::Mesh(Arc::new(m)))
        }
    };
    loaded.map_err(|err| match err {
        Error::ConversionError(_) => err,
        other => Error::ConversionError(other.to_string()),
    })
}
