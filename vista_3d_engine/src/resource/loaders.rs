/// Built-in loaders: PNG/JPEG textures, cubemap strips, Wavefront OBJ meshes

use std::io::{BufReader, Cursor};
use crate::backend::{MeshUpload, TextureKind, TextureUpload};
use crate::error::{Error, Result};
use super::asset_source::AssetStream;
use super::loader::{AsyncLoader, DecodedResource};
use super::resource_key::ResourceKey;

fn read_bytes(key: &ResourceKey, stream: &mut dyn AssetStream) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    stream
        .read_to_end(&mut bytes)
        .map_err(|e| Error::LoadError(format!("{}: read failed: {}", key, e)))?;
    Ok(bytes)
}

fn decode_rgba(key: &ResourceKey, bytes: &[u8]) -> Result<(u32, u32, Vec<u8>)> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| Error::LoadError(format!("{}: failed to decode image: {}", key, e)))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((width, height, rgba.into_raw()))
}

// ===== 2D TEXTURE =====

/// Decodes PNG/JPEG into an RGBA8 2D texture
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageTextureLoader;

impl AsyncLoader for ImageTextureLoader {
    fn load(&self, key: &ResourceKey, stream: &mut dyn AssetStream) -> Result<DecodedResource> {
        let bytes = read_bytes(key, stream)?;
        let (width, height, pixels) = decode_rgba(key, &bytes)?;
        Ok(DecodedResource::Texture(TextureUpload {
            kind: TextureKind::Texture2D,
            width,
            height,
            faces: vec![pixels],
        }))
    }
}

// ===== CUBEMAP =====

/// Decodes a vertical strip of six square faces (+X, -X, +Y, -Y, +Z, -Z)
#[derive(Debug, Default, Clone, Copy)]
pub struct CubemapTextureLoader;

impl AsyncLoader for CubemapTextureLoader {
    fn load(&self, key: &ResourceKey, stream: &mut dyn AssetStream) -> Result<DecodedResource> {
        let bytes = read_bytes(key, stream)?;
        let (width, height, pixels) = decode_rgba(key, &bytes)?;
        if width == 0 || height != width * 6 {
            return Err(Error::LoadError(format!(
                "{}: cubemap strip must be W x 6W, got {}x{}",
                key, width, height
            )));
        }

        // Rows are contiguous, so each face is one slice of the strip
        let face_size = width as usize * width as usize * 4;
        let faces = pixels.chunks_exact(face_size).map(<[u8]>::to_vec).collect();
        Ok(DecodedResource::Texture(TextureUpload {
            kind: TextureKind::Cubemap,
            width,
            height: width,
            faces,
        }))
    }
}

// ===== OBJ MESH =====

/// Parses Wavefront OBJ; every model in the file is merged into one mesh
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjMeshLoader;

impl AsyncLoader for ObjMeshLoader {
    fn load(&self, key: &ResourceKey, stream: &mut dyn AssetStream) -> Result<DecodedResource> {
        let bytes = read_bytes(key, stream)?;
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        // Materials are not part of mesh loading
        let (models, _materials) = tobj::load_obj_buf(
            &mut BufReader::new(Cursor::new(bytes)),
            &options,
            |_| Err(tobj::LoadError::OpenFileFailed),
        )
        .map_err(|e| Error::LoadError(format!("{}: invalid OBJ: {}", key, e)))?;

        let mut upload = MeshUpload::default();
        for model in models {
            let base = upload.positions.len() as u32;
            upload.positions.extend(
                model.mesh.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]),
            );
            upload.indices.extend(model.mesh.indices.iter().map(|i| base + i));
        }
        if upload.positions.is_empty() {
            return Err(Error::LoadError(format!("{}: OBJ has no vertices", key)));
        }
        Ok(DecodedResource::Mesh(upload))
    }
}

#[cfg(test)]
#[path = "loaders_tests.rs"]
mod tests;
