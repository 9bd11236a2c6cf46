//! Error types for the Vista3D engine
//!
//! This module defines the error types used throughout the engine,
//! including scene mutation, resource loading and native handle lifecycle.

use std::fmt;

/// Result type for Vista3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Vista3D engine errors
///
/// `Clone` is required: one failed request delivers the same error value
/// to every waiter registered on it.
#[derive(Debug, Clone)]
pub enum Error {
    /// Tree mutation would create a cycle (tree left unchanged)
    CycleError(String),

    /// Source stream unreadable or malformed
    LoadError(String),

    /// Decoded data could not be turned into a backend object
    ConversionError(String),

    /// Double release or use of a released native handle
    LifecycleError(String),

    /// Node key does not exist in the scene
    InvalidNode(String),

    /// Argument outside its accepted range
    InvalidArgument(String),

    /// Invalid resource (unknown kind, missing loader, etc.)
    InvalidResource(String),

    /// Backend-specific error
    BackendError(String),

    /// Initialization failed (engine, backend, subsystems)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CycleError(msg) => write!(f, "Cycle error: {}", msg),
            Error::LoadError(msg) => write!(f, "Load error: {}", msg),
            Error::ConversionError(msg) => write!(f, "Conversion error: {}", msg),
            Error::LifecycleError(msg) => write!(f, "Lifecycle error: {}", msg),
            Error::InvalidNode(msg) => write!(f, "Invalid node: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::LoadError(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
