//! Interval and max-delay timers for one debounce stage
//!
//! The interval restarts on every input; the max delay is armed once per
//! burst and cleared with it. A zero max delay never fires.

use crossbeam_channel::{after, never, Receiver};
use std::time::Instant;

use super::DebounceConfig;

/// Deadlines of the burst in progress
///
/// An unarmed deadline is a receiver that never fires, so the worker can
/// always select over both.
pub(super) struct Timers {
    config: DebounceConfig,
    interval: Receiver<Instant>,
    max_delay: Receiver<Instant>,
    max_delay_armed: bool,
}

impl Timers {
    pub(super) fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            interval: never(),
            max_delay: never(),
            max_delay_armed: false,
        }
    }

    pub(super) fn interval(&self) -> Receiver<Instant> {
        self.interval.clone()
    }

    pub(super) fn max_delay(&self) -> Receiver<Instant> {
        self.max_delay.clone()
    }

    pub(super) fn restart_interval(&mut self) {
        self.interval = after(self.config.interval);
    }

    /// Arm the upper bound on the first input of a burst
    pub(super) fn arm_max_delay(&mut self) {
        if self.max_delay_armed || self.config.max_delay.is_zero() {
            return;
        }
        self.max_delay = after(self.config.max_delay);
        self.max_delay_armed = true;
    }

    pub(super) fn clear(&mut self) {
        self.interval = never();
        self.max_delay = never();
        self.max_delay_armed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(max_delay_ms: u64) -> DebounceConfig {
        DebounceConfig::new(Duration::from_millis(5), Duration::from_millis(max_delay_ms))
    }

    #[test]
    fn test_unarmed_timers_never_fire() {
        let timers = Timers::new(config(5));
        assert!(timers.interval().recv_timeout(Duration::from_millis(20)).is_err());
        assert!(timers.max_delay().recv_timeout(Duration::from_millis(20)).is_err());
    }

    #[test]
    fn test_max_delay_armed_once_per_burst() {
        let mut timers = Timers::new(config(30));
        timers.arm_max_delay();
        let first = timers.max_delay();
        timers.arm_max_delay();
        let rearmed = timers.max_delay();
        let deadline = first.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(deadline <= Instant::now());
        assert!(rearmed.same_channel(&first));

        timers.clear();
        timers.arm_max_delay();
        assert!(timers.max_delay().recv_timeout(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_zero_max_delay_stays_unarmed() {
        let mut timers = Timers::new(config(0));
        timers.arm_max_delay();
        assert!(timers.max_delay().recv_timeout(Duration::from_millis(20)).is_err());
    }

    #[test]
    fn test_restart_interval_fires() {
        let mut timers = Timers::new(config(0));
        timers.restart_interval();
        assert!(timers.interval().recv_timeout(Duration::from_secs(1)).is_ok());
    }
}
