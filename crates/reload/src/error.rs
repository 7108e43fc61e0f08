//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;
use watcher::WatchError;

use crate::format::Format;

#[derive(Error, Debug)]
pub enum ReloadError {
    #[error("Cannot resolve config path {path:?}: {source}")]
    Resolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to watch config file: {0}")]
    Watch(#[from] WatchError),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {format} in {path:?}: {message}")]
    Parse {
        path: PathBuf,
        format: Format,
        message: String,
    },

    #[error("Unknown keys in {path:?}: {}", keys.join(", "))]
    UnknownKeys { path: PathBuf, keys: Vec<String> },

    #[error("Config in {path:?} does not match the expected shape: {message}")]
    Shape { path: PathBuf, message: String },

    #[error("Config rejected: {0}")]
    Validation(String),

    #[error("Defaults cannot be serialized: {0}")]
    Defaults(#[source] serde_json::Error),

    #[error("Failed to start reload thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Result type for config loading
pub type Result<T> = std::result::Result<T, ReloadError>;
