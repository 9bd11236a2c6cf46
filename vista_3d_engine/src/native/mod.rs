//! Native handle lifecycle
//!
//! Every entity wrapping backend state owns exactly one `NativeHandle`.
//! Release is two-phase: dropping (or `defer_release`) puts the handle on
//! the process-wide `ReleaseQueue`, and the rendering thread drains that
//! queue once per frame.

mod native_handle;
mod release_queue;

pub use native_handle::NativeHandle;
pub use release_queue::ReleaseQueue;
