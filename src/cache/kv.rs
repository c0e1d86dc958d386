//! Versioned key-value cache backend.
//!
//! All namespaces of an application share one entry named
//! `apollo-configcache-{appId}`. Each namespace is a data key built from the
//! escaped `(cluster, namespace)` pair, holding the JSON-encoded snapshot.
//!
//! # Write Protocol
//! ```text
//! read entry (data + version)
//!     → absent: create        → conflict: back off, start over
//!     → present: merge key, replace_if_version(version)
//!                             → conflict: back off, start over
//! give up after `max_attempts` with RetriesExhausted
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cache::backend::{CacheBackend, CacheEntry, CacheError};
use crate::model::{ConfigSnapshot, Namespace};
use crate::resilience::calculate_backoff;

const KEY_DELIMITER: &str = "_-_";
const WRITE_ATTEMPTS: u32 = 5;
const WRITE_BASE_DELAY_MS: u64 = 100;
const WRITE_MAX_DELAY_MS: u64 = 1000;

/// Stored entry plus the version used for optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedEntry {
    pub data: BTreeMap<String, String>,
    pub version: u64,
}

/// A store of named, versioned string maps (e.g. a cluster config map).
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    async fn read(&self, name: &str) -> Result<Option<VersionedEntry>, CacheError>;

    /// Fails with `Conflict` if `name` already exists.
    async fn create(&self, name: &str, data: BTreeMap<String, String>) -> Result<(), CacheError>;

    /// Fails with `Conflict` unless the stored version equals `expected_version`.
    async fn replace_if_version(
        &self,
        name: &str,
        data: BTreeMap<String, String>,
        expected_version: u64,
    ) -> Result<(), CacheError>;
}

/// In-process `KeyValueStore`.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, VersionedEntry>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn read(&self, name: &str) -> Result<Option<VersionedEntry>, CacheError> {
        Ok(self.entries.lock().get(name).cloned())
    }

    async fn create(&self, name: &str, data: BTreeMap<String, String>) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(name) {
            return Err(CacheError::Conflict(name.to_string()));
        }
        entries.insert(name.to_string(), VersionedEntry { data, version: 1 });
        Ok(())
    }

    async fn replace_if_version(
        &self,
        name: &str,
        data: BTreeMap<String, String>,
        expected_version: u64,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        match entries.get_mut(name) {
            Some(entry) if entry.version == expected_version => {
                entry.data = data;
                entry.version += 1;
                Ok(())
            }
            _ => Err(CacheError::Conflict(name.to_string())),
        }
    }
}

/// Escape and join a `(cluster, namespace)` pair into one data key.
///
/// `_` is doubled and the parts are joined with `_-_`. Since every `_` in the
/// output starts either `__` or `_-_`, the split point is never ambiguous.
pub fn encode_key(cluster: &str, namespace: &str) -> String {
    format!("{}{}{}", escape(cluster), KEY_DELIMITER, escape(namespace))
}

/// Inverse of [`encode_key`]. `None` if `key` was not produced by it.
pub fn decode_key(key: &str) -> Option<(String, String)> {
    let mut parts = vec![String::new()];
    let mut chars = key.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' {
            parts.last_mut()?.push(c);
            continue;
        }
        match chars.next() {
            Some('_') => parts.last_mut()?.push('_'),
            Some('-') if chars.next() == Some('_') => parts.push(String::new()),
            _ => return None,
        }
    }

    let mut parts = parts.into_iter();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(cluster), Some(namespace), None) => Some((cluster, namespace)),
        _ => None,
    }
}

fn escape(part: &str) -> String {
    part.replace('_', "__")
}

/// `CacheBackend` on top of a versioned key-value store.
#[derive(Debug, Clone)]
pub struct ConfigMapCacheBackend {
    store: Arc<dyn KeyValueStore>,
    max_attempts: u32,
}

impl ConfigMapCacheBackend {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            max_attempts: WRITE_ATTEMPTS,
        }
    }

    pub fn entry_name(app_id: &str) -> String {
        format!("apollo-configcache-{}", app_id)
    }
}

#[async_trait]
impl CacheBackend for ConfigMapCacheBackend {
    async fn read(&self, namespace: &Namespace) -> Result<Option<ConfigSnapshot>, CacheError> {
        let name = Self::entry_name(namespace.app_id());
        let Some(entry) = self.store.read(&name).await? else {
            return Ok(None);
        };
        let key = encode_key(namespace.cluster(), namespace.name());
        match entry.data.get(&key) {
            Some(json) => Ok(Some(serde_json::from_str::<CacheEntry>(json)?.into())),
            None => Ok(None),
        }
    }

    async fn write(&self, namespace: &Namespace, snapshot: &ConfigSnapshot) -> Result<(), CacheError> {
        let name = Self::entry_name(namespace.app_id());
        let key = encode_key(namespace.cluster(), namespace.name());
        let value = serde_json::to_string(&CacheEntry::from(snapshot))?;

        for attempt in 1..=self.max_attempts {
            let result = match self.store.read(&name).await? {
                None => {
                    let data = BTreeMap::from([(key.clone(), value.clone())]);
                    self.store.create(&name, data).await
                }
                Some(mut entry) => {
                    entry.data.insert(key.clone(), value.clone());
                    self.store.replace_if_version(&name, entry.data, entry.version).await
                }
            };

            match result {
                Ok(()) => {
                    tracing::debug!(namespace = %namespace, entry = %name, attempt, "Wrote cache entry");
                    return Ok(());
                }
                Err(CacheError::Conflict(_)) if attempt < self.max_attempts => {
                    let delay = calculate_backoff(attempt, WRITE_BASE_DELAY_MS, WRITE_MAX_DELAY_MS);
                    tracing::debug!(entry = %name, attempt, delay_ms = delay.as_millis() as u64, "Cache entry conflict, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(CacheError::Conflict(_)) => break,
                Err(e) => return Err(e),
            }
        }

        Err(CacheError::RetriesExhausted {
            attempts: self.max_attempts,
        })
    }
}
