//! Location watcher
//!
//! Watches a single filesystem *location* (a path, not an inode) and reports
//! when a file appears there, changes, or disappears. The location does not
//! have to exist: the watcher anchors itself on the nearest existing ancestor
//! and follows the tree as directories are created, deleted or renamed.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher --raw events--> worker thread --LocationEvent--> events()
//!                                              |
//!                                              +-- outer loop: resolve, snapshot, register, reconcile
//!                                              +-- inner loop: dispatch raw events until the tree shape changes
//! ```

use crossbeam_channel::{select, Receiver, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::backoff::{Backoff, BackoffConfig};
use crate::cancel::{cancel_pair, CancelSignal, Canceller};
use crate::error::{Result, WatchError};
use crate::event::{classify, LocationEvent, RawChange};
use crate::info::{probe_target, FileInfo};
use crate::reconcile::{rescan_ticker, Drift};
use crate::resolve::{absolutize, ResolvedLocation};

/// Tuning knobs for a [`LocationWatcher`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Re-stat the target on this period to catch missed notifications
    /// (default: disabled)
    pub rescan_interval_ms: Option<u64>,
    /// Pacing for watch registration retries
    pub retry: BackoffConfig,
}

impl WatchOptions {
    fn rescan_interval(&self) -> Option<Duration> {
        self.rescan_interval_ms.map(Duration::from_millis)
    }
}

/// Handle to a running location watcher
///
/// Events are delivered on [`events`](Self::events). The stream disconnects
/// once the watcher is closed, either through [`close`](Self::close), by
/// dropping the handle, or through the external [`CancelSignal`].
pub struct LocationWatcher {
    target: PathBuf,
    events: Receiver<LocationEvent>,
    info: Arc<RwLock<Option<FileInfo>>>,
    canceller: Canceller,
}

impl LocationWatcher {
    /// Watch `path` until the handle is closed or dropped
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, None, WatchOptions::default())
    }

    /// Watch `path` until the handle is closed or `cancel` fires
    pub fn with_cancel(path: impl AsRef<Path>, cancel: CancelSignal) -> Result<Self> {
        Self::with_options(path, Some(cancel), WatchOptions::default())
    }

    pub fn with_options(
        path: impl AsRef<Path>,
        cancel: Option<CancelSignal>,
        options: WatchOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let target = absolutize(path).map_err(|source| WatchError::Resolution {
            path: path.to_path_buf(),
            source,
        })?;

        // Unbounded: the notify thread must never block while the worker
        // is (un)registering watches.
        let (raw_tx, raw_rx) = crossbeam_channel::unbounded();
        let notifier = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = raw_tx.send(res);
        })?;

        let (events_tx, events_rx) = crossbeam_channel::bounded(1);
        let (canceller, closed) = cancel_pair();
        let info = Arc::new(RwLock::new(probe_target(&target)));

        let worker = Worker {
            target: target.clone(),
            notifier,
            raw_rx,
            events_tx,
            info: Arc::clone(&info),
            closed,
            external: cancel.unwrap_or_default(),
            rescan: rescan_ticker(options.rescan_interval()),
            backoff: Backoff::new(options.retry),
            watched: Vec::new(),
        };

        thread::Builder::new()
            .name("pathwatch-location".to_string())
            .spawn(move || worker.run())
            .map_err(WatchError::Spawn)?;

        info!("Watching location {}", target.display());

        Ok(Self {
            target,
            events: events_rx,
            info,
            canceller,
        })
    }

    /// Absolute, normalised path being watched
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Stream of location events
    pub fn events(&self) -> &Receiver<LocationEvent> {
        &self.events
    }

    /// Metadata of the file at the location, or `None` if it is absent
    pub fn info(&self) -> Option<FileInfo> {
        self.info.read().clone()
    }

    /// Stop watching. Safe to call more than once.
    pub fn close(&self) {
        if !self.canceller.is_cancelled() {
            debug!("Closing watcher for {}", self.target.display());
        }
        self.canceller.cancel();
    }
}

impl Drop for LocationWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LocationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationWatcher")
            .field("target", &self.target)
            .field("info", &*self.info.read())
            .finish()
    }
}

/// What the outer loop does once a step returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Keep dispatching in the current location
    Continue,
    /// Tree shape changed; resolve the location again
    Resolve,
    /// Closed or cancelled
    Stop,
}

impl Flow {
    fn then_resolve(self) -> Flow {
        match self {
            Flow::Stop => Flow::Stop,
            _ => Flow::Resolve,
        }
    }
}

/// Background worker owning the OS watches and all observed state
struct Worker {
    target: PathBuf,
    notifier: RecommendedWatcher,
    raw_rx: Receiver<notify::Result<notify::Event>>,
    events_tx: Sender<LocationEvent>,
    info: Arc<RwLock<Option<FileInfo>>>,
    closed: CancelSignal,
    external: CancelSignal,
    rescan: Receiver<Instant>,
    backoff: Backoff,
    watched: Vec<PathBuf>,
}

impl Worker {
    fn run(mut self) {
        loop {
            // 1. Find where to watch in the current shape of the tree
            let location = ResolvedLocation::resolve(&self.target);

            // 2. Identity of the path whose changes matter this cycle
            let snapshot = FileInfo::stat(&location.expected_child);

            // 3-4. Watch the anchor and every ancestor up to the root
            if let Err(e) = self.register(&location) {
                let delay = self.backoff.next_delay();
                warn!(
                    "Failed to watch {} ({e}), retrying in {delay:?}",
                    location.anchor_dir.display()
                );
                if self.wait_cancelled(delay) {
                    break;
                }
                continue;
            }
            self.backoff.reset();

            debug!(
                "Anchored {} at {} (expecting {})",
                self.target.display(),
                location.anchor_dir.display(),
                location.expected_child.display()
            );

            // 5. Catch transitions that happened while nothing was watched
            if self.reconcile(false) == Flow::Stop {
                break;
            }
            if ResolvedLocation::resolve(&self.target) != location {
                // The tree moved on before the watch was in place
                continue;
            }

            if self.dispatch(&location, snapshot) == Flow::Stop {
                break;
            }
        }

        self.unregister();
        debug!("Watcher for {} stopped", self.target.display());
        // Dropping self closes the event stream and the notify handle.
    }

    /// Inner loop: handle raw notifications until the location must be re-resolved
    fn dispatch(&self, location: &ResolvedLocation, mut snapshot: Option<FileInfo>) -> Flow {
        let complete = location.is_complete(&self.target);

        loop {
            select! {
                recv(self.raw_rx) -> msg => {
                    let event = match msg {
                        Ok(Ok(event)) => event,
                        Ok(Err(e)) => {
                            debug!("Notification error for {}: {e}", self.target.display());
                            return Flow::Resolve;
                        }
                        Err(_) => return Flow::Stop,
                    };

                    if event.need_rescan() {
                        debug!("Notification queue overflowed, rescanning {}", self.target.display());
                        return self.reconcile(true).then_resolve();
                    }

                    if !event.paths.is_empty()
                        && !event.paths.iter().any(|p| location.is_relevant(&self.target, p))
                    {
                        continue;
                    }

                    debug!("Raw event {:?} {:?}", event.kind, event.paths);

                    match classify(&event.kind) {
                        RawChange::Removed => return self.on_removed().then_resolve(),
                        RawChange::Created => {
                            if self.on_created() == Flow::Stop {
                                return Flow::Stop;
                            }
                            if !complete {
                                return Flow::Resolve;
                            }
                            snapshot = FileInfo::stat(&location.expected_child);
                        }
                        RawChange::Renamed => return self.reconcile(true).then_resolve(),
                        RawChange::Modified => {
                            let touched = event.paths.iter().any(|p| {
                                match (&snapshot, FileInfo::stat(p)) {
                                    (Some(known), Some(now)) => known.same_file(&now),
                                    _ => false,
                                }
                            });
                            if !touched {
                                continue;
                            }
                            if !complete {
                                return Flow::Resolve;
                            }
                            let Some(now) = probe_target(&self.target) else {
                                return self.on_removed().then_resolve();
                            };
                            snapshot = Some(now.clone());
                            if self.publish(Some(now), Some(LocationEvent::Updated)) == Flow::Stop {
                                return Flow::Stop;
                            }
                        }
                        RawChange::Ignored => {}
                    }
                }
                recv(self.closed.receiver()) -> _ => return Flow::Stop,
                recv(self.external.receiver()) -> _ => return Flow::Stop,
                recv(self.rescan) -> _ => {
                    let was_present = self.info.read().is_some();
                    if self.reconcile(true) == Flow::Stop {
                        return Flow::Stop;
                    }
                    if self.info.read().is_some() != was_present {
                        return Flow::Resolve;
                    }
                    snapshot = FileInfo::stat(&location.expected_child);
                }
            }
        }
    }

    /// Remove-class notification: report the target gone if it is
    ///
    /// Renaming a staged file over the target first shows up as the staged
    /// name being removed; by then the target already is the new file.
    fn on_removed(&self) -> Flow {
        let last = self.info.read().clone();
        match Drift::detect(last.as_ref(), probe_target(&self.target)) {
            Drift::Vanished => self.publish(None, Some(LocationEvent::Deleted)),
            Drift::Replaced(now) | Drift::Changed(now) => {
                self.publish(Some(now), Some(LocationEvent::Updated))
            }
            _ => Flow::Continue,
        }
    }

    /// Create-class notification: report the target if it appeared
    ///
    /// A different file replacing a present one (rename over the target)
    /// is reported as an update.
    fn on_created(&self) -> Flow {
        let last = self.info.read().clone();
        match Drift::detect(last.as_ref(), probe_target(&self.target)) {
            Drift::Appeared(now) => self.publish(Some(now), Some(LocationEvent::Created)),
            Drift::Replaced(now) => self.publish(Some(now), Some(LocationEvent::Updated)),
            _ => Flow::Continue,
        }
    }

    /// Compare the disk with the last observed state and report the difference
    ///
    /// With `full` unset only presence transitions and replacements produce
    /// events; the stored metadata is refreshed either way.
    fn reconcile(&self, full: bool) -> Flow {
        let last = self.info.read().clone();
        let drift = Drift::detect(last.as_ref(), probe_target(&self.target));
        let event = if full {
            drift.event()
        } else {
            drift.shape_event()
        };
        if let Some(event) = event {
            debug!("Reconciled {} ({event})", self.target.display());
        }
        self.publish(drift.into_current(), event)
    }

    /// Store the new state, then hand the event to the consumer
    ///
    /// Blocks until the consumer takes the event, the watcher is closed, or
    /// the consumer is gone.
    fn publish(&self, current: Option<FileInfo>, event: Option<LocationEvent>) -> Flow {
        *self.info.write() = current;

        let Some(event) = event else {
            return Flow::Continue;
        };

        info!("{} {}", event, self.target.display());

        select! {
            send(self.events_tx, event) -> res => match res {
                Ok(()) => Flow::Continue,
                Err(_) => Flow::Stop,
            },
            recv(self.closed.receiver()) -> _ => Flow::Stop,
            recv(self.external.receiver()) -> _ => Flow::Stop,
        }
    }

    /// Replace all OS watches with the ones `location` needs
    fn register(&mut self, location: &ResolvedLocation) -> notify::Result<()> {
        self.unregister();

        self.notifier
            .watch(&location.anchor_dir, RecursiveMode::NonRecursive)?;
        self.watched.push(location.anchor_dir.clone());

        // Any ancestor may be deleted or renamed away; watch them all.
        for dir in location.watch_dirs().skip(1) {
            match self.notifier.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => self.watched.push(dir.to_path_buf()),
                Err(e) => debug!("Cannot watch ancestor {}: {e}", dir.display()),
            }
        }

        Ok(())
    }

    fn unregister(&mut self) {
        for dir in self.watched.drain(..) {
            // Fails for directories that no longer exist; nothing to release then.
            let _ = self.notifier.unwatch(&dir);
        }
    }

    /// Sleep for `delay` unless cancelled first; returns true when cancelled
    fn wait_cancelled(&self, delay: Duration) -> bool {
        select! {
            recv(self.closed.receiver()) -> _ => true,
            recv(self.external.receiver()) -> _ => true,
            default(delay) => false,
        }
    }
}
