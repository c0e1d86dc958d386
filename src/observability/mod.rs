//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (namespace, release_key, ...)
//!     → logging.rs subscriber (pretty or JSON, EnvFilter)
//!     → or the host application's own subscriber
//! ```
//!
//! # Design Decisions
//! - The library only emits events; installing a subscriber is opt-in
//! - Secrets are never logged

pub mod logging;

pub use logging::{init_logging, LoggingError};
