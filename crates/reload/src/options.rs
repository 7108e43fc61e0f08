//! Loader settings that can themselves come from a config file

use serde::Deserialize;
use std::time::Duration;

use crate::format::Format;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Reject files containing keys the config type does not know
    pub strict: bool,
    /// On a failed reload keep the previous config instead of the defaults
    pub keep_last_valid: bool,
    /// Quiet period before a burst of changes triggers a reload (0: reload
    /// on every change)
    pub debounce_interval_ms: u64,
    /// Upper bound on the delay added by debouncing (0: unbounded)
    pub debounce_max_delay_ms: u64,
    /// Force a format instead of guessing from the extension
    pub format: Option<Format>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            strict: false,
            keep_last_valid: false,
            debounce_interval_ms: 1_000,
            debounce_max_delay_ms: 3_000,
            format: None,
        }
    }
}

impl LoaderOptions {
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_interval_ms)
    }

    pub fn debounce_max_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_max_delay_ms)
    }
}
