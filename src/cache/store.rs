//! Best-effort façade over a cache backend.
//!
//! Backend failures stop here: reads degrade to `None`, writes are logged.
//! A write in progress is abandoned once its cancellation token fires.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cache::backend::CacheBackend;
use crate::cache::file::FileCacheBackend;
use crate::config::CacheConfig;
use crate::model::{ConfigSnapshot, Namespace};

/// Last-known-good snapshot storage used by repositories.
#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    backend: Option<Arc<dyn CacheBackend>>,
}

impl LocalCacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend: Some(backend) }
    }

    /// A store that remembers nothing.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Disk store under `config.dir`, or a disabled one.
    pub fn from_config(config: &CacheConfig) -> Self {
        if config.enabled {
            Self::on_disk(config.dir.clone())
        } else {
            Self::disabled()
        }
    }

    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileCacheBackend::new(dir)))
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn read(&self, namespace: &Namespace) -> Option<ConfigSnapshot> {
        let backend = self.backend.as_ref()?;
        match backend.read(namespace).await {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    namespace = %namespace,
                    release_key = %snapshot.release_key,
                    keys = snapshot.configurations.len(),
                    "Loaded config from local cache"
                );
                Some(snapshot)
            }
            Ok(None) => {
                tracing::debug!(namespace = %namespace, "No local cache entry");
                None
            }
            Err(e) => {
                tracing::warn!(namespace = %namespace, error = %e, "Local cache read failed");
                None
            }
        }
    }

    /// Returns whether the write landed. Failures never propagate.
    pub async fn write(&self, namespace: &Namespace, snapshot: &ConfigSnapshot, cancel: &CancellationToken) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        let result = tokio::select! {
            result = backend.write(namespace, snapshot) => result,
            _ = cancel.cancelled() => {
                tracing::debug!(namespace = %namespace, "Local cache write cancelled");
                return false;
            }
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(namespace = %namespace, error = %e, "Local cache write failed");
                false
            }
        }
    }
}
