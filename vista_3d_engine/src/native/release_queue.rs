/// Pending-release queue for native handles.
///
/// Handles may become unreachable on any thread, but the backend may only
/// release them on the rendering thread. The queue collects them and
/// `drain()` releases everything once per frame.

use std::sync::{Mutex, MutexGuard};
use rustc_hash::FxHashSet;
use crate::backend::{Backend, HandleKind, RawHandle};
use crate::error::{Error, Result};
use crate::{engine_debug, engine_error};

#[derive(Default)]
struct ReleaseQueueState {
    /// Handles waiting for the next drain, in enqueue order
    pending: Vec<(RawHandle, HandleKind)>,
    /// Same handles, for duplicate detection
    pending_set: FxHashSet<RawHandle>,
    /// Duplicate enqueues rejected so far
    rejected: usize,
    /// Handles released by all drains so far
    released_total: u64,
}

/// Process-wide deferred release queue.
///
/// A handle may enter the queue at most once; a second enqueue of the same
/// raw handle before the drain is rejected with `LifecycleError`.
#[derive(Default)]
pub struct ReleaseQueue {
    state: Mutex<ReleaseQueueState>,
}

impl ReleaseQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the state half-updated
    // (every mutation is a single push/insert), so poisoning is ignored.
    fn state(&self) -> MutexGuard<'_, ReleaseQueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enqueue a raw handle for release at the next drain
    pub(crate) fn push(&self, handle: RawHandle, kind: HandleKind) -> Result<()> {
        let mut state = self.state();
        if !state.pending_set.insert(handle) {
            state.rejected += 1;
            drop(state);
            engine_error!("vista3d::ReleaseQueue",
                "Handle {} ({:?}) enqueued twice for release", handle, kind);
            return Err(Error::LifecycleError(format!(
                "handle {} is already pending release",
                handle
            )));
        }
        state.pending.push((handle, kind));
        Ok(())
    }

    /// Whether `handle` is waiting for the next drain
    pub fn is_pending(&self, handle: RawHandle) -> bool {
        self.state().pending_set.contains(&handle)
    }

    /// Number of handles waiting for the next drain
    pub fn len(&self) -> usize {
        self.state().pending.len()
    }

    /// Whether no handle is waiting
    pub fn is_empty(&self) -> bool {
        self.state().pending.is_empty()
    }

    /// Number of duplicate enqueues rejected so far
    pub fn rejected_count(&self) -> usize {
        self.state().rejected
    }

    /// Total number of handles released by `drain`
    pub fn released_total(&self) -> u64 {
        self.state().released_total
    }

    /// Release every pending handle through the backend.
    ///
    /// Must be called on the rendering thread, once per frame. The lock is
    /// not held while the backend runs, so handles dropped during the drain
    /// land in the next frame's batch.
    ///
    /// Every handle is attempted; the first failure is returned after the
    /// whole batch has been processed.
    pub fn drain(&self, backend: &mut dyn Backend) -> Result<usize> {
        let batch = {
            let mut state = self.state();
            state.pending_set.clear();
            std::mem::take(&mut state.pending)
        };
        if batch.is_empty() {
            return Ok(0);
        }

        let mut released = 0usize;
        let mut first_error = None;
        for (handle, kind) in batch {
            match backend.destroy_handle(handle) {
                Ok(()) => released += 1,
                Err(err) => {
                    engine_error!("vista3d::ReleaseQueue",
                        "Failed to release {:?} handle {}: {}", kind, handle, err);
                    first_error.get_or_insert(err);
                }
            }
        }

        self.state().released_total += released as u64;
        engine_debug!("vista3d::ReleaseQueue", "Released {} native handle(s)", released);

        match first_error {
            Some(err) => Err(err),
            None => Ok(released),
        }
    }
}

#[cfg(test)]
#[path = "release_queue_tests.rs"]
mod tests;
