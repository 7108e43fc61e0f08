//! Retry pacing for watch registration
//!
//! Registering a watch on the anchor directory can fail transiently (the
//! directory vanished between resolve and register, inotify watch limit hit,
//! ...). The outer loop retries, doubling the delay each time up to a cap.

use serde::Deserialize;
use std::time::Duration;

/// Backoff bounds, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First retry delay (default: 10ms)
    pub initial_ms: u64,
    /// Upper bound for the delay (default: 2s)
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 10,
            max_ms: 2_000,
        }
    }
}

/// Exponential backoff state owned by one worker
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Delay before the next retry; grows with each call
    pub(crate) fn next_delay(&mut self) -> Duration {
        let factor = 1u64.checked_shl(self.attempt).unwrap_or(u64::MAX);
        let delay_ms = self
            .config
            .initial_ms
            .saturating_mul(factor)
            .min(self.config.max_ms);
        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(delay_ms)
    }

    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }
}
