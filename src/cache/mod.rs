//! Local cache subsystem.
//!
//! # Data Flow
//! ```text
//! Successful remote fetch:
//!     → store.rs (write-through, failures logged)
//!     → backend: file.rs (one JSON file per namespace)
//!              | kv.rs (one versioned entry per app, CAS with retry)
//!
//! Remote unavailable on first load:
//!     → store.rs read → snapshot or None
//! ```
//!
//! # Design Decisions
//! - The cache is a fallback, never a source of truth while the remote answers
//! - Backend errors never reach the config API
//! - Versioned writes return a definite result after a bounded number of retries

pub mod backend;
pub mod file;
pub mod kv;
pub mod store;

pub use backend::{CacheBackend, CacheEntry, CacheError};
pub use file::FileCacheBackend;
pub use kv::{decode_key, encode_key, ConfigMapCacheBackend, InMemoryKeyValueStore, KeyValueStore, VersionedEntry};
pub use store::LocalCacheStore;
