//! Apollo-compatible configuration sync client.
//!
//! Keeps an application's key-value configuration in step with a remote
//! config service: meta-server discovery, signed conditional fetches, change
//! notifications by long polling, a local fallback cache, and live views that
//! emit change events.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod registry;
pub mod remote;
pub mod repository;
pub mod resilience;
pub mod security;
pub mod view;

#[cfg(test)]
mod testing;

pub use config::ClientConfig;
pub use model::{ChangeType, ConfigSnapshot, Namespace, PropertyDelta, SourceType};
pub use registry::{ConfigRegistry, ConfigRegistryBuilder, RegistryError};
pub use view::{ConfigChangeEvent, ConfigChangeListener, ConfigView, Interest, ListenerId};
