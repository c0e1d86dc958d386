//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing request (fetch, long poll, meta probe, discovery):
//!     → signer.rs (HMAC-SHA1 over "{timestamp}\n{path?query}")
//!     → Authorization: Apollo {appId}:{signature}
//!     → Timestamp: {millis}
//! ```
//!
//! # Design Decisions
//! - Signing is skipped entirely when no secret is configured
//! - The secret never appears in logs or errors

pub mod signer;
