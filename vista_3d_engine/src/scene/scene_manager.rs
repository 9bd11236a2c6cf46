//! Named scenes sharing one backend and release queue.

use std::sync::{Arc, Mutex, RwLock};
use rustc_hash::FxHashMap;
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::native::ReleaseQueue;
use crate::{engine_bail, engine_error};
use super::scene::Scene;

pub struct SceneManager {
    backend: Arc<Mutex<dyn Backend>>,
    release_queue: Arc<ReleaseQueue>,
    scenes: FxHashMap<String, Arc<RwLock<Scene>>>,
}

impl SceneManager {
    /// Create an empty scene manager
    pub fn new(backend: Arc<Mutex<dyn Backend>>, release_queue: Arc<ReleaseQueue>) -> Self {
        Self {
            backend,
            release_queue,
            scenes: FxHashMap::default(),
        }
    }

    /// Create a named scene. Fails if the name is taken.
    pub fn create_scene(&mut self, name: &str) -> Result<Arc<RwLock<Scene>>> {
        if self.scenes.contains_key(name) {
            engine_bail!("vista3d::SceneManager", "Scene '{}' already exists", name);
        }
        let scene = Arc::new(RwLock::new(Scene::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.release_queue),
        )));
        self.scenes.insert(name.to_string(), Arc::clone(&scene));
        Ok(scene)
    }

    pub fn scene(&self, name: &str) -> Option<Arc<RwLock<Scene>>> {
        self.scenes.get(name).cloned()
    }

    /// Forget a scene. Its nodes are released once the last `Arc` is dropped.
    pub fn remove_scene(&mut self, name: &str) -> Option<Arc<RwLock<Scene>>> {
        self.scenes.remove(name)
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn scene_names(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.scenes.clear();
    }

    /// Push dirty render states of every scene. Returns the number of
    /// attachments synced; the first failure is returned after all scenes
    /// have been attempted.
    pub fn sync_all(&self) -> Result<usize> {
        let mut synced = 0usize;
        let mut first_error = None;
        for (name, scene) in &self.scenes {
            let result = scene
                .write()
                .map_err(|_| Error::BackendError(format!("scene '{}' lock poisoned", name)))
                .and_then(|mut scene| scene.sync_render_state());
            match result {
                Ok(count) => synced += count,
                Err(err) => {
                    engine_error!("vista3d::SceneManager", "Sync of scene '{}' failed: {}", name, err);
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(synced),
        }
    }
}

#[cfg(test)]
#[path = "scene_manager_tests.rs"]
mod tests;
