//! Configuration view subsystem.
//!
//! # Data Flow
//! ```text
//! PropertySource (remote repository, local overrides, defaults)
//!     → source.rs (change callback via SourceListener)
//!     → config.rs (merge in priority order, diff old vs new merged map)
//!     → event.rs (ConfigChangeEvent, filtered by each listener's Interest)
//!     → application listeners
//! ```
//!
//! # Design Decisions
//! - One view type composed of ordered sources instead of specialised subtypes
//! - Sources hold only weak references to views
//! - Reads never block on updates

pub mod config;
pub mod event;
pub mod source;

pub use config::ConfigView;
pub use event::{ConfigChangeEvent, ConfigChangeListener, Interest, ListenerId};
pub use source::{MapSource, PropertySource, SourceListener};
