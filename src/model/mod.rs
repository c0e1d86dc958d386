//! Core data model shared by every subsystem.
//!
//! # Data Flow
//! ```text
//! Namespace (appId, cluster, name)
//!     → addresses a ConfigSnapshot (releaseKey + properties)
//!     → two snapshots diff into PropertyDeltas
//!     → deltas become ConfigChangeEvents in the view layer
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable and shared behind `Arc`
//! - Properties are a sorted map so iteration order is deterministic
//! - Diffing is total: every differing key yields exactly one delta

pub mod namespace;
pub mod snapshot;

pub use namespace::{ConfigFileFormat, Namespace};
pub use snapshot::{diff_properties, ChangeType, ConfigSnapshot, Properties, PropertyDelta, SourceType};
