//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! ConfigRegistry::shutdown() → Shutdown::trigger()
//!     → repository tokens (long polls, in-flight fetches, retry sleeps)
//!     → periodic refresh task
//!     → config reload task
//! ```
//!
//! # Design Decisions
//! - One root token per registry, a child token per background task
//! - Shutdown stops background work only; views stay readable

pub mod shutdown;

pub use shutdown::Shutdown;
