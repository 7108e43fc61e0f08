//! Shared helpers for watcher integration tests

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tempfile::TempDir;
use watcher::LocationEvent;

/// How long to wait for an event that must arrive
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to listen when no event may arrive
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Scratch directory with a canonical root
///
/// Some backends report canonical paths (`/private/var/...` on macOS), so
/// targets are built from the canonical form.
pub struct Sandbox {
    _dir: TempDir,
    root: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        Self { _dir: dir, root }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Give the worker time to register its watches
pub fn settle() {
    thread::sleep(Duration::from_millis(150));
}

pub fn expect_event(events: &Receiver<LocationEvent>) -> LocationEvent {
    match events.recv_timeout(EVENT_TIMEOUT) {
        Ok(event) => event,
        Err(e) => panic!("expected a location event: {e}"),
    }
}

/// Skip follow-up `Updated` events caused by the same write
pub fn expect_event_skipping_updates(events: &Receiver<LocationEvent>) -> LocationEvent {
    loop {
        let event = expect_event(events);
        if event != LocationEvent::Updated {
            return event;
        }
    }
}

pub fn expect_silence(events: &Receiver<LocationEvent>) {
    match events.recv_timeout(QUIET_PERIOD) {
        Ok(event) => panic!("unexpected location event: {event}"),
        Err(RecvTimeoutError::Timeout) => {}
        Err(RecvTimeoutError::Disconnected) => panic!("event stream closed"),
    }
}

/// Drain until the stream closes; panics if it stays open
pub fn expect_closed(events: &Receiver<LocationEvent>) {
    loop {
        match events.recv_timeout(EVENT_TIMEOUT) {
            Ok(_) => continue,
            Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => panic!("event stream still open"),
        }
    }
}
