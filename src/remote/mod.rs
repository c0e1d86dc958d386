//! Config service protocol subsystem.
//!
//! # Data Flow
//! ```text
//! Initial load / refresh / notification:
//!     → fetcher.rs (GET /configs/{app}/{cluster}/{ns}?releaseKey=...)
//!     → 200 full or incremental body → ConfigSnapshot
//!     → 304 → NotModified
//!
//! Change detection:
//!     → notification.rs (GET /notifications/v2, held open by the server)
//!     → newer id accepted → NotificationHandler::on_notified
//!     → handler re-fetches through fetcher.rs
//! ```
//!
//! # Design Decisions
//! - 404 is final for a fetch; everything else may be retried
//! - Each config service is tried once per fetch, in discovery order
//! - Messages from notifications are echoed on the next fetch

pub mod fetcher;
pub mod notification;
pub mod types;

pub use fetcher::RemoteFetcher;
pub use notification::{NotificationClient, NotificationHandler, NotificationState, PollOutcome};
pub use types::{FetchError, FetchOutcome, FetchResult, NotificationMessages, INIT_NOTIFICATION_ID};
