//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! ClientConfig (env → "http://m1, http://m2")
//!     → locator.rs (probe candidates in order, cache pick with TTL)
//!     → services.rs (GET {meta}/services/config → config-service URLs)
//!     → fetcher / notification client try each URL in turn
//!
//! Remote failure reported back:
//!     → address.rs (consecutive failure count)
//!     → threshold reached: cached meta pick and service list dropped
//! ```
//!
//! # Design Decisions
//! - Best effort: an unreachable meta server still yields an address
//! - Locks guard only in-memory state; probes run unlocked
//! - A configured config-service URL bypasses discovery entirely

pub mod address;
pub mod locator;
pub mod services;

pub use address::{HealthState, MetaServerAddress};
pub use locator::{MetaServerLocator, MetaSources};
pub use services::ServiceLocator;
