/// Throttler: bounded, deduplicating, prioritized resource loading.
///
/// Requests are coalesced by `ResourceKey` in a single mutex-guarded
/// table. At most `max_in_flight` requests are loading or converting at
/// once. Loading runs on a pool of worker threads fed through a flume
/// channel; finished loads come back on a second channel and are converted
/// and delivered by `process_frame` on the rendering thread.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread::{self, JoinHandle};
use rustc_hash::FxHashMap;
use crate::backend::{self, Backend};
use crate::error::{Error, Result};
use crate::native::ReleaseQueue;
use crate::{engine_debug, engine_error, engine_info, engine_warn};
use super::asset_source::AssetSource;
use super::loader::{AsyncLoader, DecodedResource};
use super::loaders::{CubemapTextureLoader, ImageTextureLoader, ObjMeshLoader};
use super::request::{
    LoadCallback, LoadOutcome, RequestId, RequestState, RequestTicket, ResourceRequest, WaiterId,
};
use super::resource_key::{ResourceKey, ResourceKind};

// ===== CONFIG =====

/// Throttler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlerConfig {
    /// Maximum number of requests loading or converting at once
    pub max_in_flight: usize,
    /// Number of worker threads; raised to `max_in_flight` so that every
    /// `Loading` request is running on a worker
    pub worker_count: usize,
    /// Worker thread name prefix
    pub thread_name: String,
}

impl Default for ThrottlerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            worker_count: 4,
            thread_name: "vista3d-loader".to_string(),
        }
    }
}

impl ThrottlerConfig {
    /// Clamp counts to at least 1, with one worker per slot
    pub fn normalized(mut self) -> Self {
        self.max_in_flight = self.max_in_flight.max(1);
        self.worker_count = self.worker_count.max(self.max_in_flight);
        self
    }
}

/// Counters since creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottlerStats {
    /// Requests that entered `Loading`
    pub loads_started: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Finished loads whose request had been cancelled meanwhile
    pub discarded: u64,
}

// ===== INTERNALS =====

struct LoadJob {
    id: RequestId,
    key: ResourceKey,
    loader: Arc<dyn AsyncLoader>,
}

struct LoadMessage {
    id: RequestId,
    key: ResourceKey,
    result: Result<DecodedResource>,
}

/// Heap entry. Entries are never removed from the heap; an entry whose
/// request was cancelled or re-prioritized is skipped when popped.
struct QueueEntry {
    priority: i32,
    seq: u64,
    id: RequestId,
    key: ResourceKey,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // BinaryHeap is a max-heap: lowest priority value, then oldest, pops first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

type Delivery = (Vec<LoadCallback>, LoadOutcome);

#[derive(Default)]
struct RequestTable {
    requests: FxHashMap<ResourceKey, ResourceRequest>,
    heap: BinaryHeap<QueueEntry>,
    /// Loads holding a pipeline slot (including cancelled ones still running)
    active: usize,
    next_id: u64,
    next_seq: u64,
    next_waiter: u64,
    jobs: Option<flume::Sender<LoadJob>>,
    /// Failures detected outside `process_frame`, delivered by the next one
    undelivered: Vec<Delivery>,
    closed: bool,
    stats: ThrottlerStats,
}

impl RequestTable {
    /// Remove a request from the table and collect its callbacks
    fn retire(&mut self, key: &ResourceKey, state: RequestState) -> Vec<LoadCallback> {
        match self.requests.remove(key) {
            Some(mut request) => {
                request.set_state(state);
                request.take_callbacks()
            }
            None => Vec::new(),
        }
    }
}

// ===== THROTTLER =====

pub struct Throttler {
    config: ThrottlerConfig,
    backend: Arc<Mutex<dyn Backend>>,
    release_queue: Arc<ReleaseQueue>,
    loaders: RwLock<FxHashMap<ResourceKind, Arc<dyn AsyncLoader>>>,
    table: Mutex<RequestTable>,
    done: flume::Receiver<LoadMessage>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Throttler {
    /// Create a throttler with no loaders and start its worker threads
    pub fn new(
        config: ThrottlerConfig,
        backend: Arc<Mutex<dyn Backend>>,
        source: Arc<dyn AssetSource>,
        release_queue: Arc<ReleaseQueue>,
    ) -> Result<Self> {
        let config = config.normalized();
        let (job_tx, job_rx) = flume::unbounded::<LoadJob>();
        let (done_tx, done_rx) = flume::unbounded::<LoadMessage>();

        let mut workers = Vec::with_capacity(config.worker_count);
        for index in 0..config.worker_count {
            let jobs = job_rx.clone();
            let done = done_tx.clone();
            let source = Arc::clone(&source);
            let worker = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, index))
                .spawn(move || worker_loop(jobs, done, source))
                .map_err(|e| {
                    Error::InitializationFailed(format!("failed to spawn loader thread: {}", e))
                })?;
            workers.push(worker);
        }

        engine_info!("vista3d::Throttler",
            "Started {} loader thread(s), {} slot(s)", config.worker_count, config.max_in_flight);

        Ok(Self {
            config,
            backend,
            release_queue,
            loaders: RwLock::new(FxHashMap::default()),
            table: Mutex::new(RequestTable {
                jobs: Some(job_tx),
                ..Default::default()
            }),
            done: done_rx,
            workers: Mutex::new(workers),
        })
    }

    /// Create a throttler with the built-in texture, cubemap and OBJ loaders
    pub fn with_default_loaders(
        config: ThrottlerConfig,
        backend: Arc<Mutex<dyn Backend>>,
        source: Arc<dyn AssetSource>,
        release_queue: Arc<ReleaseQueue>,
    ) -> Result<Self> {
        let throttler = Self::new(config, backend, source, release_queue)?;
        throttler.register_loader(ResourceKind::Texture, Arc::new(ImageTextureLoader))?;
        throttler.register_loader(ResourceKind::CubemapTexture, Arc::new(CubemapTextureLoader))?;
        throttler.register_loader(ResourceKind::Mesh, Arc::new(ObjMeshLoader))?;
        Ok(throttler)
    }

    pub fn config(&self) -> &ThrottlerConfig {
        &self.config
    }

    /// Register the loader for a resource kind, returning the one it replaces.
    ///
    /// Requests already in flight keep the loader they started with.
    pub fn register_loader(
        &self,
        kind: ResourceKind,
        loader: Arc<dyn AsyncLoader>,
    ) -> Result<Option<Arc<dyn AsyncLoader>>> {
        let mut loaders = self
            .loaders
            .write()
            .map_err(|_| Error::BackendError("loader registry lock poisoned".to_string()))?;
        Ok(loaders.insert(kind, loader))
    }

    fn loader_for(&self, kind: ResourceKind) -> Result<Arc<dyn AsyncLoader>> {
        let loaders = self
            .loaders
            .read()
            .map_err(|_| Error::BackendError("loader registry lock poisoned".to_string()))?;
        loaders
            .get(&kind)
            .cloned()
            .ok_or_else(|| Error::InvalidResource(format!("no loader registered for {:?}", kind)))
    }

    fn table(&self) -> Result<MutexGuard<'_, RequestTable>> {
        self.table
            .lock()
            .map_err(|_| Error::BackendError("request table lock poisoned".to_string()))
    }

    // ===== REQUESTS =====

    /// Register interest in `key`. Never blocks on I/O.
    ///
    /// Joins the in-flight request for `key` if there is one (no new load
    /// starts; a more urgent priority raises a still-queued request),
    /// otherwise queues a new request. `callback` runs exactly once on the
    /// thread calling `process_frame`, unless the ticket is withdrawn first.
    pub fn request<F>(&self, key: ResourceKey, priority: i32, callback: F) -> Result<RequestTicket>
    where
        F: FnOnce(LoadOutcome) + Send + 'static,
    {
        let loader = self.loader_for(key.kind())?;
        let mut guard = self.table()?;
        let table = &mut *guard;
        if table.closed {
            return Err(Error::LifecycleError(format!(
                "request for {} after throttler shutdown",
                key
            )));
        }

        table.next_waiter += 1;
        let waiter = WaiterId(table.next_waiter);

        if let Some(request) = table.requests.get_mut(&key) {
            request.waiters.push((waiter, Box::new(callback)));
            if request.state == RequestState::Queued && priority < request.priority {
                request.priority = priority;
                table.heap.push(QueueEntry {
                    priority,
                    seq: request.seq,
                    id: request.id,
                    key: key.clone(),
                });
            }
            engine_debug!("vista3d::Throttler",
                "Joined in-flight request for {} ({} waiter(s))", key, request.waiters.len());
            return Ok(RequestTicket { key, request: request.id, waiter });
        }

        table.next_id += 1;
        table.next_seq += 1;
        let id = RequestId(table.next_id);
        let seq = table.next_seq;
        table.heap.push(QueueEntry { priority, seq, id, key: key.clone() });
        table.requests.insert(key.clone(), ResourceRequest {
            id,
            key: key.clone(),
            priority,
            seq,
            state: RequestState::Queued,
            loader,
            waiters: vec![(waiter, Box::new(callback))],
        });
        self.dispatch(table);

        Ok(RequestTicket { key, request: id, waiter })
    }

    /// Withdraw one waiter. Returns false if the ticket is no longer
    /// waiting (already delivered or withdrawn).
    ///
    /// When the last waiter leaves a `Queued` request it is cancelled and
    /// never starts. A `Loading` request is cancelled too, but the load
    /// keeps its slot until it finishes and its result is discarded.
    pub fn withdraw(&self, ticket: &RequestTicket) -> bool {
        let Ok(mut guard) = self.table() else { return false };
        let table = &mut *guard;
        let Some(request) = table.requests.get_mut(&ticket.key) else { return false };
        if request.id != ticket.request {
            return false;
        }

        let before = request.waiters.len();
        request.waiters.retain(|(waiter, _)| *waiter != ticket.waiter);
        if request.waiters.len() == before {
            return false;
        }

        if request.waiters.is_empty()
            && matches!(request.state, RequestState::Queued | RequestState::Loading)
        {
            let state = request.state;
            table.retire(&ticket.key, RequestState::Cancelled);
            table.stats.cancelled += 1;
            engine_debug!("vista3d::Throttler", "Cancelled {:?} request for {}", state, ticket.key);
        }
        true
    }

    /// Move queued requests into free slots
    fn dispatch(&self, table: &mut RequestTable) {
        while table.active < self.config.max_in_flight {
            let Some(entry) = table.heap.pop() else { break };
            let Some(request) = table.requests.get_mut(&entry.key) else { continue };
            if request.id != entry.id
                || request.state != RequestState::Queued
                || request.priority != entry.priority
            {
                continue;
            }

            request.set_state(RequestState::Loading);
            let job = LoadJob {
                id: request.id,
                key: entry.key.clone(),
                loader: Arc::clone(&request.loader),
            };
            let sent = match &table.jobs {
                Some(jobs) => jobs.send(job).is_ok(),
                None => false,
            };

            if sent {
                table.active += 1;
                table.stats.loads_started += 1;
            } else {
                engine_error!("vista3d::Throttler", "No loader thread accepts {}", entry.key);
                let callbacks = table.retire(&entry.key, RequestState::Failed);
                table.stats.failed += 1;
                table.undelivered.push((
                    callbacks,
                    Err(Error::LoadError(format!("{}: loader threads are gone", entry.key))),
                ));
            }
        }
    }

    // ===== FRAME DRAIN =====

    /// Convert finished loads and deliver outcomes. Rendering thread only,
    /// once per frame.
    ///
    /// Callbacks run after every internal lock has been released. Returns
    /// the number of callbacks invoked.
    pub fn process_frame(&self) -> usize {
        let mut deliveries: Vec<Delivery> = Vec::new();

        for message in self.done.try_iter() {
            if let Some(delivery) = self.finish(message) {
                deliveries.push(delivery);
            }
        }

        match self.table() {
            Ok(mut guard) => {
                let table = &mut *guard;
                deliveries.append(&mut table.undelivered);
                if !table.closed {
                    self.dispatch(table);
                }
            }
            Err(err) => engine_error!("vista3d::Throttler", "{}", err),
        }

        let mut delivered = 0usize;
        for (callbacks, outcome) in deliveries {
            for callback in callbacks {
                callback(outcome.clone());
                delivered += 1;
            }
        }
        delivered
    }

    /// Handle one finished load: fail, discard, or convert it
    fn finish(&self, message: LoadMessage) -> Option<Delivery> {
        let LoadMessage { id, key, result } = message;

        let (loader, decoded) = {
            let mut guard = self.table().ok()?;
            let table = &mut *guard;
            let current = table.requests.get_mut(&key).filter(|request| request.id == id);
            let Some(request) = current else {
                table.active = table.active.saturating_sub(1);
                table.stats.discarded += 1;
                engine_debug!("vista3d::Throttler", "Discarded result of cancelled load {}", key);
                return None;
            };

            match result {
                Ok(decoded) => {
                    request.set_state(RequestState::Converting);
                    (Arc::clone(&request.loader), decoded)
                }
                Err(err) => {
                    let err = match err {
                        Error::LoadError(_) => err,
                        other => Error::LoadError(other.to_string()),
                    };
                    engine_warn!("vista3d::Throttler", "Load of {} failed: {}", key, err);
                    table.active = table.active.saturating_sub(1);
                    table.stats.failed += 1;
                    return Some((table.retire(&key, RequestState::Failed), Err(err)));
                }
            }
        };

        // The table lock is not held while the backend converts
        let converted = backend::lock_backend(&self.backend)
            .and_then(|mut backend| loader.convert(&mut *backend, &self.release_queue, decoded))
            .map_err(|err| match err {
                Error::ConversionError(_) => err,
                other => Error::ConversionError(other.to_string()),
            });

        let mut guard = self.table().ok()?;
        let table = &mut *guard;
        table.active = table.active.saturating_sub(1);
        let (state, outcome) = match converted {
            Ok(resource) => {
                table.stats.completed += 1;
                (RequestState::Completed, Ok(resource))
            }
            Err(err) => {
                engine_warn!("vista3d::Throttler", "Conversion of {} failed: {}", key, err);
                table.stats.failed += 1;
                (RequestState::Failed, Err(err))
            }
        };
        Some((table.retire(&key, state), outcome))
    }

    // ===== INTROSPECTION =====

    /// State of the in-flight request for `key`; `None` once retired
    pub fn state(&self, key: &ResourceKey) -> Option<RequestState> {
        self.table().ok()?.requests.get(key).map(|request| request.state)
    }

    /// Number of waiters on the in-flight request for `key`
    pub fn waiter_count(&self, key: &ResourceKey) -> usize {
        self.table()
            .ok()
            .and_then(|table| table.requests.get(key).map(|request| request.waiters.len()))
            .unwrap_or(0)
    }

    /// Requests not yet retired
    pub fn in_flight_count(&self) -> usize {
        self.table().map_or(0, |table| table.requests.len())
    }

    /// Pipeline slots in use
    pub fn active_count(&self) -> usize {
        self.table().map_or(0, |table| table.active)
    }

    /// Requests waiting for a slot
    pub fn queued_count(&self) -> usize {
        self.table().map_or(0, |table| {
            table
                .requests
                .values()
                .filter(|request| request.state == RequestState::Queued)
                .count()
        })
    }

    pub fn stats(&self) -> ThrottlerStats {
        self.table().map_or_else(|_| ThrottlerStats::default(), |table| table.stats)
    }

    // ===== SHUTDOWN =====

    /// Stop accepting requests, fail every pending one with
    /// `LifecycleError` and join the worker threads. Idempotent.
    pub fn shutdown(&self) {
        let (jobs, pending) = match self.table() {
            Ok(mut guard) => {
                let table = &mut *guard;
                table.closed = true;
                table.heap.clear();
                let pending: Vec<Delivery> = table
                    .requests
                    .drain()
                    .map(|(key, mut request)| {
                        (
                            request.take_callbacks(),
                            Err(Error::LifecycleError(format!("{}: throttler shut down", key))),
                        )
                    })
                    .chain(table.undelivered.drain(..))
                    .collect();
                (table.jobs.take(), pending)
            }
            Err(err) => {
                engine_error!("vista3d::Throttler", "{}", err);
                return;
            }
        };
        // Closing the job channel stops the workers once they are idle
        drop(jobs);

        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => Vec::new(),
        };
        let joined = workers.len();
        for worker in workers {
            if worker.join().is_err() {
                engine_error!("vista3d::Throttler", "Loader thread panicked");
            }
        }

        for (callbacks, outcome) in pending {
            for callback in callbacks {
                callback(outcome.clone());
            }
        }
        if joined > 0 {
            engine_info!("vista3d::Throttler", "Stopped {} loader thread(s)", joined);
        }
    }
}

impl Drop for Throttler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ===== WORKERS =====

fn worker_loop(
    jobs: flume::Receiver<LoadJob>,
    done: flume::Sender<LoadMessage>,
    source: Arc<dyn AssetSource>,
) {
    while let Ok(job) = jobs.recv() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| run_load(source.as_ref(), &job)))
            .unwrap_or_else(|_| Err(Error::LoadError(format!("{}: loader panicked", job.key))));
        let message = LoadMessage { id: job.id, key: job.key, result };
        if done.send(message).is_err() {
            break;
        }
    }
}

/// open -> load -> close; the stream is closed even when loading fails
fn run_load(source: &dyn AssetSource, job: &LoadJob) -> Result<DecodedResource> {
    let mut stream = source.open(job.key.source())?;
    let loaded = job.loader.load(&job.key, stream.as_mut());
    let closed = stream.close();
    let decoded = loaded?;
    closed?;
    Ok(decoded)
}

#[cfg(test)]
#[path = "throttler_tests.rs"]
mod tests;
