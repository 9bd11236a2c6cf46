/// Vista3D Engine - Singleton manager for engine subsystems
///
/// Holds the process-wide backend, release queue, throttler and scene
/// manager in thread-safe static storage, and drives the per-frame work
/// that must happen on the rendering thread.

use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::SystemTime;
use crate::backend::{self, Backend};
use crate::error::{Error, Result};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::native::ReleaseQueue;
use crate::resource::{AssetSource, Throttler, ThrottlerConfig};
use crate::scene::SceneManager;

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure holding all engine singletons
struct EngineState {
    /// Rendering backend (Mutex: only one thread talks to it at a time)
    backend: RwLock<Option<Arc<Mutex<dyn Backend>>>>,
    /// Deferred release queue, lives as long as the engine
    release_queue: Arc<ReleaseQueue>,
    /// Resource loading throttler
    throttler: RwLock<Option<Arc<Throttler>>>,
    /// Scene manager
    scene_manager: RwLock<Option<Arc<Mutex<SceneManager>>>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            backend: RwLock::new(None),
            release_queue: Arc::new(ReleaseQueue::new()),
            throttler: RwLock::new(None),
            scene_manager: RwLock::new(None),
        }
    }
}

/// Work done by one call to `Engine::frame()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Load callbacks invoked
    pub delivered: usize,
    /// Render states pushed to the backend
    pub synced: usize,
    /// Native handles released
    pub released: usize,
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use vista_3d_engine::vista3d::Engine;
/// use vista_3d_engine::vista3d::backend::MockBackend;
/// use vista_3d_engine::vista3d::resource::{FileAssetSource, ThrottlerConfig};
///
/// Engine::initialize()?;
/// Engine::create_backend(MockBackend::new())?;
/// Engine::create_throttler(ThrottlerConfig::default(), Arc::new(FileAssetSource::new("assets")))?;
/// Engine::create_scene_manager()?;
///
/// loop {
///     let stats = Engine::frame()?;
///     # break;
/// }
///
/// Engine::shutdown();
/// # Ok::<(), vista_3d_engine::vista3d::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("vista3d::Engine", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!("vista3d::Engine", "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!("vista3d::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    fn state() -> Result<&'static EngineState> {
        ENGINE_STATE.get().ok_or_else(|| Self::log_and_return_error(
            Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
        ))
    }

    fn read_slot<T: Clone>(slot: &RwLock<Option<T>>, name: &str) -> Result<T> {
        let lock = slot.read().map_err(|_| Self::log_and_return_error(
            Error::BackendError(format!("{} lock poisoned", name))
        ))?;
        lock.clone().ok_or_else(|| Self::log_and_return_error(
            Error::InitializationFailed(format!("{} not created", name))
        ))
    }

    fn fill_slot<T>(slot: &RwLock<Option<T>>, name: &str, value: T) -> Result<()> {
        let mut lock = slot.write().map_err(|_| Self::log_and_return_error(
            Error::BackendError(format!("{} lock poisoned", name))
        ))?;
        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed(format!("{} already exists", name))
            ));
        }
        *lock = Some(value);
        Ok(())
    }

    fn take_slot<T>(slot: &RwLock<Option<T>>, name: &str) -> Result<Option<T>> {
        let mut lock = slot.write().map_err(|_| Self::log_and_return_error(
            Error::BackendError(format!("{} lock poisoned", name))
        ))?;
        Ok(lock.take())
    }

    /// Initialize the engine
    ///
    /// Must be called once at startup before creating any subsystem.
    /// Calling it again is a no-op.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Shutdown the engine and destroy all singletons
    ///
    /// Order: throttler (fails pending requests), scene manager (drops
    /// nodes, enqueuing their handles), then the backend after a final
    /// drain of the release queue.
    pub fn shutdown() {
        let Some(state) = ENGINE_STATE.get() else { return };

        if let Ok(mut throttler) = state.throttler.write() {
            if let Some(throttler) = throttler.take() {
                throttler.shutdown();
            }
        }
        if let Ok(mut scene_manager) = state.scene_manager.write() {
            *scene_manager = None;
        }
        if let Ok(mut slot) = state.backend.write() {
            if let Some(backend) = slot.take() {
                if let Ok(mut backend) = backend::lock_backend(&backend) {
                    let _ = state.release_queue.drain(&mut *backend);
                }
            }
        }
        crate::engine_info!("vista3d::Engine", "Engine shut down");
    }

    // ===== BACKEND API =====

    /// Create and register the backend singleton
    pub fn create_backend<B: Backend + 'static>(backend: B) -> Result<Arc<Mutex<dyn Backend>>> {
        let backend: Arc<Mutex<dyn Backend>> = Arc::new(Mutex::new(backend));
        Self::register_backend(Arc::clone(&backend))?;
        crate::engine_info!("vista3d::Engine", "Backend singleton created successfully");
        Ok(backend)
    }

    /// Register a backend the caller keeps a typed handle to
    pub fn register_backend(backend: Arc<Mutex<dyn Backend>>) -> Result<()> {
        Self::fill_slot(&Self::state()?.backend, "Backend", backend)
    }

    /// Get the backend singleton
    pub fn backend() -> Result<Arc<Mutex<dyn Backend>>> {
        Self::read_slot(&Self::state()?.backend, "Backend")
    }

    /// Destroy the backend singleton
    ///
    /// Pending handles are released through it first. Fails with
    /// `LifecycleError` while a throttler or scene manager still uses it.
    pub fn destroy_backend() -> Result<()> {
        let state = Self::state()?;
        let in_use = state.throttler.read().map(|t| t.is_some()).unwrap_or(false)
            || state.scene_manager.read().map(|s| s.is_some()).unwrap_or(false);
        if in_use {
            return Err(Self::log_and_return_error(Error::LifecycleError(
                "Backend still in use. Destroy the throttler and scene manager first.".to_string()
            )));
        }

        if let Some(backend) = Self::take_slot(&state.backend, "Backend")? {
            let mut guard = backend::lock_backend(&backend)?;
            state.release_queue.drain(&mut *guard)?;
        }
        crate::engine_info!("vista3d::Engine", "Backend singleton destroyed");
        Ok(())
    }

    /// Process-wide release queue
    pub fn release_queue() -> Result<Arc<ReleaseQueue>> {
        Ok(Arc::clone(&Self::state()?.release_queue))
    }

    // ===== THROTTLER API =====

    /// Create the throttler singleton with the default loaders registered
    ///
    /// Requires the backend singleton.
    pub fn create_throttler(
        config: ThrottlerConfig,
        source: Arc<dyn AssetSource>,
    ) -> Result<Arc<Throttler>> {
        let state = Self::state()?;
        let backend = Self::backend()?;
        let throttler = Arc::new(Throttler::with_default_loaders(
            config,
            backend,
            source,
            Arc::clone(&state.release_queue),
        )?);
        Self::fill_slot(&state.throttler, "Throttler", Arc::clone(&throttler))?;
        crate::engine_info!("vista3d::Engine", "Throttler singleton created successfully");
        Ok(throttler)
    }

    /// Get the throttler singleton
    pub fn throttler() -> Result<Arc<Throttler>> {
        Self::read_slot(&Self::state()?.throttler, "Throttler")
    }

    /// Shut down and destroy the throttler singleton
    pub fn destroy_throttler() -> Result<()> {
        if let Some(throttler) = Self::take_slot(&Self::state()?.throttler, "Throttler")? {
            throttler.shutdown();
        }
        crate::engine_info!("vista3d::Engine", "Throttler singleton destroyed");
        Ok(())
    }

    // ===== SCENE MANAGER API =====

    /// Create the scene manager singleton
    ///
    /// Requires the backend singleton.
    pub fn create_scene_manager() -> Result<Arc<Mutex<SceneManager>>> {
        let state = Self::state()?;
        let manager = Arc::new(Mutex::new(SceneManager::new(
            Self::backend()?,
            Arc::clone(&state.release_queue),
        )));
        Self::fill_slot(&state.scene_manager, "SceneManager", Arc::clone(&manager))?;
        crate::engine_info!("vista3d::Engine", "SceneManager singleton created successfully");
        Ok(manager)
    }

    /// Get the scene manager singleton
    pub fn scene_manager() -> Result<Arc<Mutex<SceneManager>>> {
        Self::read_slot(&Self::state()?.scene_manager, "SceneManager")
    }

    /// Destroy the scene manager singleton
    pub fn destroy_scene_manager() -> Result<()> {
        Self::take_slot(&Self::state()?.scene_manager, "SceneManager")?;
        crate::engine_info!("vista3d::Engine", "SceneManager singleton destroyed");
        Ok(())
    }

    // ===== FRAME =====

    /// Run the once-per-frame work. Rendering thread only.
    ///
    /// 1. Convert finished loads and invoke their callbacks
    /// 2. Push changed render states of every scene to the backend
    /// 3. Release every handle enqueued since the last frame
    ///
    /// Missing throttler or scene manager steps are skipped; the backend
    /// is required.
    pub fn frame() -> Result<FrameStats> {
        let state = Self::state()?;
        let backend = Self::backend()?;
        let mut stats = FrameStats::default();

        if let Some(throttler) = Self::try_slot(&state.throttler) {
            stats.delivered = throttler.process_frame();
        }

        if let Some(manager) = Self::try_slot(&state.scene_manager) {
            let manager = manager.lock().map_err(|_| Self::log_and_return_error(
                Error::BackendError("SceneManager lock poisoned".to_string())
            ))?;
            stats.synced = manager.sync_all()?;
        }

        let mut guard = backend::lock_backend(&backend)?;
        stats.released = state.release_queue.drain(&mut *guard)?;

        crate::engine_trace!("vista3d::Engine",
            "Frame: {} delivered, {} synced, {} released",
            stats.delivered, stats.synced, stats.released);
        Ok(stats)
    }

    fn try_slot<T: Clone>(slot: &RwLock<Option<T>>) -> Option<T> {
        slot.read().ok().and_then(|lock| lock.clone())
    }

    /// Reset all singletons for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        Self::shutdown();
    }

    // ===== LOGGING API =====

    fn logger() -> &'static RwLock<Box<dyn Logger>> {
        LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::new())))
    }

    /// Replace the default logger with a custom implementation
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vista_3d_engine::vista3d::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = Self::logger().write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        if let Ok(mut lock) = Self::logger().write() {
            *lock = Box::new(DefaultLogger::new());
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = Self::logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// Used by engine_error! macro to include source location.
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = Self::logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
