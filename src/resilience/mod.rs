//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Config fetch:
//!     → retries.rs (bounded attempts, only for retryable failures)
//!     → backoff.rs (exponential delay with jitter between attempts)
//!
//! Long-poll loop:
//!     → backoff.rs SchedulePolicy (unbounded, grows on failure, resets on success)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every remote call has a deadline
//! - Jittered backoff prevents thundering herd across clients
//! - Every sleep observes cancellation

pub mod backoff;
pub mod retries;

pub use backoff::{calculate_backoff, SchedulePolicy};
pub use retries::{retry_with_backoff, RetryOutcome, RetryPolicy};
