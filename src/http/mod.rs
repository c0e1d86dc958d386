//! HTTP plumbing subsystem.
//!
//! # Data Flow
//! ```text
//! fetcher / notifier / locator
//!     → urls.rs (build endpoint URL with percent-encoded segments)
//!     → security::signer (optional Authorization + Timestamp headers)
//!     → request.rs (HttpRequest with per-request timeout)
//!     → client.rs (HttpClient trait, reqwest implementation)
//!     → response.rs (status classification, JSON decoding)
//! ```
//!
//! # Design Decisions
//! - Only GET is needed; the trait stays that small
//! - Transport errors and HTTP status codes are distinct outcomes
//! - Cancellation is by dropping the request future

pub mod client;
pub mod request;
pub mod response;
pub mod urls;

pub use client::{HttpClient, ReqwestHttpClient, TransportError};
pub use request::HttpRequest;
pub use response::HttpResponse;
pub use urls::ClientIdentity;
