/// Backend-resident texture produced by the conversion step

use std::sync::Arc;
use crate::backend::{Backend, HandleKind, TextureKind, TextureUpload};
use crate::error::Result;
use crate::native::{NativeHandle, ReleaseQueue};

/// Uploaded texture (2D or cubemap).
///
/// Owns its native handle; the texture is released through the release
/// queue once the last `Arc<GpuTexture>` is dropped.
#[derive(Debug)]
pub struct GpuTexture {
    handle: NativeHandle,
    kind: TextureKind,
    width: u32,
    height: u32,
}

impl GpuTexture {
    /// Upload decoded pixels. Rendering thread only.
    pub fn upload(
        backend: &mut dyn Backend,
        queue: &Arc<ReleaseQueue>,
        upload: &TextureUpload,
    ) -> Result<Self> {
        let raw = backend.upload_texture(upload)?;
        Ok(Self {
            handle: NativeHandle::adopt(raw, HandleKind::Texture, queue),
            kind: upload.kind,
            width: upload.width,
            height: upload.height,
        })
    }

    pub fn handle(&self) -> &NativeHandle {
        &self.handle
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    /// Face width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Face height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }
}
