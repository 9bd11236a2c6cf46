/// Exclusive owner of one piece of backend state.
///
/// `NativeHandle` is move-only. It is released exactly once: either
/// explicitly through `release()` on the rendering thread, or by being
/// enqueued on its `ReleaseQueue` (`defer_release()` or drop).

use std::fmt;
use std::sync::Arc;
use crate::backend::{Backend, HandleKind, RawHandle};
use crate::error::{Error, Result};
use crate::{engine_error, engine_trace};
use super::ReleaseQueue;

pub struct NativeHandle {
    raw: RawHandle,
    kind: HandleKind,
    queue: Arc<ReleaseQueue>,
    /// Set once the handle has been released or enqueued
    retired: bool,
}

impl NativeHandle {
    /// Allocate fresh backend state and take ownership of it
    pub fn allocate(
        backend: &mut dyn Backend,
        kind: HandleKind,
        queue: &Arc<ReleaseQueue>,
    ) -> Result<Self> {
        let raw = backend.create_handle(kind)?;
        engine_trace!("vista3d::NativeHandle", "Allocated {:?} handle {}", kind, raw);
        Ok(Self::adopt(raw, kind, queue))
    }

    /// Take ownership of a handle created by a collaborator (e.g. an upload)
    pub fn adopt(raw: RawHandle, kind: HandleKind, queue: &Arc<ReleaseQueue>) -> Self {
        Self {
            raw,
            kind,
            queue: Arc::clone(queue),
            retired: false,
        }
    }

    /// Raw backend identifier
    pub fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Kind of backend state
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Release immediately. Rendering thread only.
    ///
    /// Fails with `LifecycleError` if the same raw handle is already
    /// pending on the queue (it would be released twice).
    pub fn release(mut self, backend: &mut dyn Backend) -> Result<()> {
        self.retired = true;
        if self.queue.is_pending(self.raw) {
            engine_error!("vista3d::NativeHandle",
                "Explicit release of handle {} which is already pending release", self.raw);
            return Err(Error::LifecycleError(format!(
                "handle {} is already pending release",
                self.raw
            )));
        }
        backend.destroy_handle(self.raw)
    }

    /// Enqueue for release at the next frame drain.
    ///
    /// Fails with `LifecycleError` if the raw handle is already pending.
    pub fn defer_release(mut self) -> Result<()> {
        self.retired = true;
        self.queue.push(self.raw, self.kind)
    }
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        if !self.retired {
            self.retired = true;
            // Rejection is already logged and counted by the queue
            let _ = self.queue.push(self.raw, self.kind);
        }
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("raw", &self.raw)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
#[path = "native_handle_tests.rs"]
mod tests;
