/*!
# Vista 3D Engine

Scene graph core for a stereo 3D renderer.

The crate owns the scene side of rendering and talks to the native
backend only through opaque handles. It never records draw calls.

## Architecture

- **Scene**: arena of nodes with inherited visibility and opacity,
  render attachments and pickable volumes
- **Picker**: ray queries against pickable volumes (gaze selection)
- **Throttler**: bounded, deduplicating, prioritized asynchronous loading
  of textures, cubemaps and meshes
- **NativeHandle / ReleaseQueue**: two-phase release of backend state,
  drained once per frame on the rendering thread
- **Backend**: trait implemented by the native renderer (`MockBackend`
  for tests and headless use)
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod backend;
pub mod native;
pub mod resource;
pub mod scene;

// Main vista3d namespace module
pub mod vista3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::{Engine, FrameStats};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend sub-module
    pub mod backend {
        pub use crate::backend::*;
    }

    // Native handle sub-module
    pub mod native {
        pub use crate::native::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
