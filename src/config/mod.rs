//! Client configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + environment variables
//!     → loader.rs (parse, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to ConfigRegistry::builder()
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → registry applies meta-server candidates atomically
//! ```
//!
//! # Design Decisions
//! - A loaded ClientConfig is never mutated; reloads produce a new value
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CacheConfig, ClientConfig, Env, LongPollConfig, MetaCacheConfig, ObservabilityConfig, RefreshConfig,
    RetryConfig, TimeoutConfig,
};
pub use validation::ValidationError;
