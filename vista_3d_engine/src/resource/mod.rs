//! Resource module
//!
//! GPU-side resources (textures, meshes), the asset sources and loaders
//! that produce them, and the throttler that schedules loading.

mod asset_source;
mod loader;
mod loaders;
mod request;
mod resource_key;
mod throttler;
pub mod mesh;
pub mod texture;

pub use asset_source::{AssetSource, AssetStream, FileAssetSource, MemoryAssetSource};
pub use loader::{upload_decoded, AsyncLoader, DecodedResource, LoadedResource};
pub use loaders::{CubemapTextureLoader, ImageTextureLoader, ObjMeshLoader};
pub use mesh::GpuMesh;
pub use request::{LoadOutcome, RequestId, RequestState, RequestTicket, WaiterId};
pub use resource_key::{ResourceKey, ResourceKind};
pub use texture::GpuTexture;
pub use throttler::{Throttler, ThrottlerConfig, ThrottlerStats};
