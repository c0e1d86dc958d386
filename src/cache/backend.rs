//! Cache backend abstraction and the persisted entry format.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ConfigSnapshot, Namespace, Properties};

/// Errors raised by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache entry could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache backend error: {0}")]
    Backend(String),

    /// Optimistic concurrency check failed.
    #[error("version conflict on {0}")]
    Conflict(String),

    #[error("cache write gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

/// Durable storage for last-known-good snapshots.
#[async_trait]
pub trait CacheBackend: Send + Sync + Debug {
    /// `Ok(None)` when nothing was ever stored for `namespace`.
    async fn read(&self, namespace: &Namespace) -> Result<Option<ConfigSnapshot>, CacheError>;

    async fn write(&self, namespace: &Namespace, snapshot: &ConfigSnapshot) -> Result<(), CacheError>;
}

/// Serialized form of a snapshot. Deltas are not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(default)]
    pub release_key: String,
    pub configurations: Properties,
}

impl From<&ConfigSnapshot> for CacheEntry {
    fn from(snapshot: &ConfigSnapshot) -> Self {
        Self {
            release_key: snapshot.release_key.clone(),
            configurations: snapshot.configurations.clone(),
        }
    }
}

impl From<CacheEntry> for ConfigSnapshot {
    fn from(entry: CacheEntry) -> Self {
        ConfigSnapshot::new(entry.release_key, entry.configurations)
    }
}
