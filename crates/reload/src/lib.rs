//! Live-reloading configuration files for Pathwatch
//!
//! [`ConfigLoader`] reads a YAML, TOML or JSON file into a typed config,
//! overlays it on defaults, and reloads it whenever the file is created,
//! changed or deleted. Bursts of changes are debounced into one reload.
//!
//! ```no_run
//! use reload::ConfigLoader;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Settings {
//!     port: u16,
//! }
//!
//! let loader = ConfigLoader::builder("settings.yaml", Settings { port: 8080 })
//!     .on_reload(|settings: &Settings| println!("port is now {}", settings.port))
//!     .build()?;
//! println!("port {}", loader.get().port);
//! # Ok::<(), reload::ReloadError>(())
//! ```

pub mod error;
pub mod format;
pub mod loader;
pub mod options;

// Re-exports
pub use error::{ReloadError, Result};
pub use format::Format;
pub use loader::{ConfigLoader, LoaderBuilder};
pub use options::LoaderOptions;
