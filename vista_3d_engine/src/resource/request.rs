/// Resource request identity and lifecycle state

use std::sync::Arc;
use crate::error::Result;
use super::loader::{AsyncLoader, LoadedResource};
use super::resource_key::ResourceKey;

/// Lifecycle of one resource request.
///
/// `Queued -> Loading -> Converting -> Completed`, with `Cancelled`
/// reachable from `Queued` or `Loading` and `Failed` reachable from
/// `Loading` or `Converting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Waiting for a free pipeline slot
    Queued,
    /// Decoding on a worker thread
    Loading,
    /// Waiting for, or running, conversion on the rendering thread
    Converting,
    Completed,
    Cancelled,
    Failed,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Completed | RequestState::Cancelled | RequestState::Failed)
    }

    /// Whether `self -> next` is an edge of the state machine
    pub fn can_transition_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Queued, Loading)
                | (Queued, Cancelled)
                | (Loading, Converting)
                | (Loading, Cancelled)
                | (Loading, Failed)
                | (Converting, Completed)
                | (Converting, Failed)
        )
    }
}

/// Identifies one load of a key; a later load of the same key gets a new id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

/// Identifies one waiter of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterId(pub(crate) u64);

/// Returned by `Throttler::request`; pass it to `Throttler::withdraw` to
/// give up interest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    pub(crate) key: ResourceKey,
    pub(crate) request: RequestId,
    pub(crate) waiter: WaiterId,
}

impl RequestTicket {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn request_id(&self) -> RequestId {
        self.request
    }
}

/// Terminal outcome delivered to every waiter
pub type LoadOutcome = Result<LoadedResource>;

pub(crate) type LoadCallback = Box<dyn FnOnce(LoadOutcome) + Send>;

/// In-flight entry of the request table
pub(crate) struct ResourceRequest {
    pub(crate) id: RequestId,
    pub(crate) key: ResourceKey,
    /// Lower value is served first
    pub(crate) priority: i32,
    /// Submission order, FIFO tie-break among equal priorities
    pub(crate) seq: u64,
    pub(crate) state: RequestState,
    pub(crate) loader: Arc<dyn AsyncLoader>,
    pub(crate) waiters: Vec<(WaiterId, LoadCallback)>,
}

impl ResourceRequest {
    pub(crate) fn set_state(&mut self, next: RequestState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid request transition {:?} -> {:?} for {}",
            self.state, next, self.key
        );
        self.state = next;
    }

    /// Take every callback, leaving the waiter set empty
    pub(crate) fn take_callbacks(&mut self) -> Vec<LoadCallback> {
        self.waiters.drain(..).map(|(_, callback)| callback).collect()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
