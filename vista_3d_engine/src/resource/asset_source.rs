/// Byte-producing asset sources.
///
/// A source opens one stream per load; the throttler always calls
/// `close()` on the stream once the loader is done with it, whether the
/// load succeeded or not.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};

// ===== TRAITS =====

/// Readable stream with an explicit close
pub trait AssetStream: Read + Send {
    /// Release the underlying resource. Reading after close is an error.
    fn close(&mut self) -> Result<()>;
}

/// Opens streams by source identifier
pub trait AssetSource: Send + Sync {
    fn open(&self, source: &str) -> Result<Box<dyn AssetStream>>;
}

// ===== FILE SOURCE =====

/// Opens files relative to a root directory
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FileAssetSource {
    fn open(&self, source: &str) -> Result<Box<dyn AssetStream>> {
        let path = self.root.join(source);
        let file = File::open(&path)
            .map_err(|e| Error::LoadError(format!("cannot open '{}': {}", path.display(), e)))?;
        Ok(Box::new(FileStream { file: Some(file) }))
    }
}

struct FileStream {
    file: Option<File>,
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.read(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "stream is closed")),
        }
    }
}

impl AssetStream for FileStream {
    fn close(&mut self) -> Result<()> {
        self.file.take();
        Ok(())
    }
}

// ===== MEMORY SOURCE =====

#[derive(Default)]
struct MemoryCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// In-memory source, keyed by identifier.
///
/// Counts opened and closed streams so callers can check that every
/// stream gets closed.
#[derive(Default)]
pub struct MemoryAssetSource {
    assets: RwLock<FxHashMap<String, Arc<[u8]>>>,
    counters: Arc<MemoryCounters>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset
    pub fn insert(&self, source: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let bytes: Vec<u8> = bytes.into();
        let bytes: Arc<[u8]> = bytes.into();
        if let Ok(mut assets) = self.assets.write() {
            assets.insert(source.into(), bytes);
        }
    }

    pub fn remove(&self, source: &str) -> bool {
        self.assets
            .write()
            .map(|mut assets| assets.remove(source).is_some())
            .unwrap_or(false)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.assets
            .read()
            .map(|assets| assets.contains_key(source))
            .unwrap_or(false)
    }

    /// Streams opened so far
    pub fn opened_count(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Streams closed so far
    pub fn closed_count(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

impl AssetSource for MemoryAssetSource {
    fn open(&self, source: &str) -> Result<Box<dyn AssetStream>> {
        let bytes = self
            .assets
            .read()
            .map_err(|_| Error::LoadError("memory source lock poisoned".to_string()))?
            .get(source)
            .cloned()
            .ok_or_else(|| Error::LoadError(format!("no asset named '{}'", source)))?;
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryStream {
            cursor: Some(Cursor::new(bytes)),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MemoryStream {
    cursor: Option<Cursor<Arc<[u8]>>>,
    counters: Arc<MemoryCounters>,
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.read(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "stream is closed")),
        }
    }
}

impl AssetStream for MemoryStream {
    fn close(&mut self) -> Result<()> {
        if self.cursor.take().is_none() {
            return Err(Error::LoadError("stream closed twice".to_string()));
        }
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[path = "asset_source_tests.rs"]
mod tests;
