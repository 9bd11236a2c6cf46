//! Backend module - the native rendering backend seen as an opaque handle sink
//!
//! The core never issues draw calls. It allocates and destroys native
//! handles, uploads converted resources, and pushes per-attachment render
//! state (eye mask, opacity) through the `Backend` trait.

pub mod backend;
pub mod mock_backend;

pub use backend::*;
pub use mock_backend::MockBackend;
