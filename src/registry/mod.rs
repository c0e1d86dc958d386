//! Registry subsystem: the public entry point.
//!
//! # Data Flow
//! ```text
//! ConfigRegistry::get("application")
//!     → views map (one OnceCell per namespace)
//!     → first call: RemoteConfigRepository::initialize (remote → cache → empty)
//!     → ConfigView over [repository, fallback sources...]
//!     → repository.start() (long poll) + shared periodic refresh
//!     → later calls: the same Arc<ConfigView>
//! ```
//!
//! # Design Decisions
//! - Transport and cache are injected through the builder, never discovered
//! - Identity (app, cluster, env) is fixed per registry; discovery settings hot-reload

pub mod builder;
#[allow(clippy::module_inception)]
pub mod registry;

pub use builder::{ConfigRegistryBuilder, RegistryError};
pub use registry::ConfigRegistry;
