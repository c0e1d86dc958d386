//! Repository subsystem.
//!
//! # Data Flow
//! ```text
//! initialize():
//!     → RemoteFetcher (bounded retries with backoff)
//!     → on failure: LocalCacheStore → on miss: empty snapshot
//!
//! NotificationClient / periodic refresh:
//!     → trigger_sync() (coalesced, one fetch in flight)
//!     → RemoteFetcher (conditional on the current release key)
//!     → diff against current → swap snapshot → cache write-through
//!     → SourceListener::on_source_change (views recompute)
//! ```
//!
//! # Design Decisions
//! - The current snapshot is swapped atomically; readers never lock
//! - Failures after the first load keep serving the last good snapshot
//! - Background work hangs off a child cancellation token of the registry

pub mod remote;

pub use remote::{RemoteConfigRepository, RepositoryContext};
