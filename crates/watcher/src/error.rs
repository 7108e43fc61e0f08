//! Error types for location watching.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned when constructing a [`LocationWatcher`](crate::LocationWatcher).
///
/// Everything that goes wrong after construction is handled inside the
/// worker (retry, re-resolve) and never reaches the caller.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Cannot resolve watch target {path:?}: {source}")]
    Resolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialize file system notifications: {0}")]
    Subsystem(#[from] notify::Error),

    #[error("Failed to start watcher thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Result type for watcher construction
pub type Result<T> = std::result::Result<T, WatchError>;
