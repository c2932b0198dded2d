//! Servables and the cached servable manager.
//!
//! A servable is a loaded program addressed by an identifier (for
//! [`ScriptServable`], the artifact path). [`ServableManager`] keeps recently
//! used servables in an LRU cache, loads on a miss, and evicts a servable
//! whenever a request against it fails so the next request starts from a
//! fresh load.

mod cache;

#[cfg(test)]
mod tests;

pub use cache::LruCache;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ArtifactError, InferenceError, ServingError};
use crate::script::ScriptModule;
use crate::value::Value;

/// Backend used to execute served programs.
pub type ServingBackend = burn::backend::NdArray;

/// Requests with an invalidation probability at or below this always hit the
/// cache normally.
const INVALIDATION_EPSILON: f32 = 1e-5;

/// Something the manager can load by identifier and run inference on.
pub trait Servable: Sized + Send + Sync + 'static {
    type LoadError: std::fmt::Display;

    fn load(identifier: &str) -> Result<Self, Self::LoadError>;

    fn run_inference(&self, inputs: Vec<Value>) -> Result<Value, InferenceError>;
}

// ─── Script Servable ───────────────────────────────────────────────

/// A compiled artifact loaded from disk onto the CPU backend.
pub struct ScriptServable {
    path: PathBuf,
    module: Mutex<ScriptModule<ServingBackend>>,
}

impl ScriptServable {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Servable for ScriptServable {
    type LoadError = ArtifactError;

    fn load(identifier: &str) -> Result<Self, ArtifactError> {
        let device = Default::default();
        debug!(target: "servable", "Running on CPU only.");
        let module = ScriptModule::<ServingBackend>::load(identifier, &device)?;
        debug!(
            target: "servable",
            "Loaded {} with signature {}",
            identifier,
            module.signature()
        );
        Ok(Self {
            path: PathBuf::from(identifier),
            module: Mutex::new(module),
        })
    }

    fn run_inference(&self, inputs: Vec<Value>) -> Result<Value, InferenceError> {
        // Parameters are reference counted, so the clone is shallow and the
        // forward pass runs outside the lock.
        let module = self
            .module
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        module.forward(inputs)
    }
}

// ─── Manager ───────────────────────────────────────────────────────

pub struct ServableManager<S: Servable> {
    cache: Mutex<LruCache<String, Arc<S>>>,
}

impl<S: Servable> Default for ServableManager<S> {
    fn default() -> Self {
        Self::new(5, 0)
    }
}

impl<S: Servable> ServableManager<S> {
    /// `capacity` servables stay resident; up to `buffer` more are tolerated
    /// before a batch eviction.
    pub fn new(capacity: usize, buffer: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity, buffer)),
        }
    }

    fn cache(&self) -> MutexGuard<'_, LruCache<String, Arc<S>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch from the cache, loading from disk on a miss.
    pub fn get_servable(&self, identifier: &str) -> Result<Arc<S>, ServingError> {
        info!(target: "servable_manager", "Loading servable from servable_identifier: {}", identifier);
        let key = identifier.to_string();
        if let Some(servable) = self.cache().get(&key) {
            info!(target: "servable_manager", "Found model with servable_identifier: {} in cache", identifier);
            return Ok(servable);
        }
        info!(target: "servable_manager", "Cache miss detected for servable_identifier: {}", identifier);

        let servable = match S::load(identifier) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                warn!(target: "servable_manager", "Failed to load from servable_identifier: {}", identifier);
                return Err(ServingError::InvalidServable {
                    identifier: key,
                    reason: e.to_string(),
                });
            }
        };

        let size = {
            let mut cache = self.cache();
            cache.insert(key, Arc::clone(&servable));
            cache.len()
        };
        info!(target: "servable_manager", "Cache is now of size: {}", size);
        Ok(servable)
    }

    /// Like [`get_servable`](Self::get_servable), but first evicts the entry
    /// with probability `invalidation_prob`.
    pub fn get_servable_with_invalidation(
        &self,
        identifier: &str,
        invalidation_prob: f32,
    ) -> Result<Arc<S>, ServingError> {
        if rand::random::<f32>() < invalidation_prob {
            info!(
                target: "servable_manager",
                "Bypassing cache and invalidating for servable_identifier: {}",
                identifier
            );
            self.cache().remove(&identifier.to_string());
        }
        self.get_servable(identifier)
    }

    pub fn size(&self) -> usize {
        self.cache().len()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.cache().contains(&identifier.to_string())
    }

    /// Run `inputs` through the servable. Any failure evicts it.
    pub fn inference_request(
        &self,
        identifier: &str,
        inputs: Vec<Value>,
        invalidation_prob: f32,
    ) -> Result<Value, ServingError> {
        let servable = if invalidation_prob > INVALIDATION_EPSILON {
            self.get_servable_with_invalidation(identifier, invalidation_prob)
        } else {
            self.get_servable(identifier)
        };
        let result =
            servable.and_then(|s| s.run_inference(inputs).map_err(ServingError::from));

        if result.is_err() {
            self.evict(identifier);
        }
        result
    }

    /// Drop `identifier` from the cache after a failure. Returns whether it
    /// was cached.
    pub fn evict(&self, identifier: &str) -> bool {
        let removed = self.cache().remove(&identifier.to_string()).is_some();
        if removed {
            warn!(
                target: "servable_manager",
                "Removing servable_identifier: {} from cache due to caught error.",
                identifier
            );
        }
        removed
    }

    /// Run [`inference_request`](Self::inference_request) on tokio's blocking
    /// pool. Must be called from within a tokio runtime.
    pub fn async_inference_request(
        self: &Arc<Self>,
        identifier: impl Into<String>,
        inputs: Vec<Value>,
        invalidation_prob: f32,
    ) -> JoinHandle<Result<Value, ServingError>> {
        debug!(target: "servable_manager", "Launching async inference request");
        let manager = Arc::clone(self);
        let identifier = identifier.into();
        tokio::task::spawn_blocking(move || {
            debug!(target: "servable_manager", "Running inference on the blocking pool.");
            manager.inference_request(&identifier, inputs, invalidation_prob)
        })
    }
}
