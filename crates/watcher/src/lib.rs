//! File location watching for Pathwatch
//!
//! This crate provides:
//! - [`LocationWatcher`]: Created/Updated/Deleted events for a single path,
//!   whether or not it (or its parent directories) exist yet
//! - [`debounce`]: time-windowed coalescing of event bursts, with four
//!   output shapes (signal, grouped, last value, count)
//! - Self-healing on lost notifications (re-resolve, reconcile, backoff)

pub mod backoff;
pub mod cancel;
pub mod debounce;
pub mod error;
pub mod event;
pub mod info;
pub mod location;
mod reconcile;
pub mod resolve;

// Re-exports
pub use backoff::BackoffConfig;
pub use cancel::{cancel_pair, CancelSignal, Canceller};
pub use debounce::DebounceConfig;
pub use error::{Result, WatchError};
pub use event::LocationEvent;
pub use info::{FileIdentity, FileInfo};
pub use location::{LocationWatcher, WatchOptions};
pub use resolve::ResolvedLocation;
