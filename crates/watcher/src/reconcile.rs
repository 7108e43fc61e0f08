//! Reconciliation of the observed state with the disk
//!
//! Notifications can be lost: the kernel queue overflows, a directory is
//! replaced between resolve and register, or the backend coalesces events.
//! Reconciling re-stats the target and derives the transition the watcher
//! would have reported had it seen everything.

use crossbeam_channel::Receiver;
use std::time::{Duration, Instant};

use crate::event::LocationEvent;
use crate::info::FileInfo;

/// Difference between the last observed state and the current one
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Drift {
    /// Absent before, present now
    Appeared(FileInfo),
    /// Present before, absent now
    Vanished,
    /// Present before and now, but a different file
    Replaced(FileInfo),
    /// Same file, size or mtime moved
    Changed(FileInfo),
    /// Nothing that would produce an event
    Unchanged(Option<FileInfo>),
}

impl Drift {
    pub(crate) fn detect(last: Option<&FileInfo>, current: Option<FileInfo>) -> Self {
        match (last, current) {
            (None, Some(now)) => Drift::Appeared(now),
            (Some(_), None) => Drift::Vanished,
            (None, None) => Drift::Unchanged(None),
            (Some(before), Some(now)) if !before.same_file(&now) => Drift::Replaced(now),
            (Some(before), Some(now)) if now.changed_since(before) => Drift::Changed(now),
            (Some(_), Some(now)) => Drift::Unchanged(Some(now)),
        }
    }

    /// Event for a full reconcile (periodic rescan)
    pub(crate) fn event(&self) -> Option<LocationEvent> {
        match self {
            Drift::Appeared(_) => Some(LocationEvent::Created),
            Drift::Vanished => Some(LocationEvent::Deleted),
            Drift::Replaced(_) | Drift::Changed(_) => Some(LocationEvent::Updated),
            Drift::Unchanged(_) => None,
        }
    }

    /// Event after re-anchoring: in-place edits are left to notifications,
    /// but a different file at the target is always reported
    pub(crate) fn shape_event(&self) -> Option<LocationEvent> {
        match self {
            Drift::Appeared(_) => Some(LocationEvent::Created),
            Drift::Vanished => Some(LocationEvent::Deleted),
            Drift::Replaced(_) => Some(LocationEvent::Updated),
            Drift::Changed(_) | Drift::Unchanged(_) => None,
        }
    }

    /// State to remember after this drift has been handled
    pub(crate) fn into_current(self) -> Option<FileInfo> {
        match self {
            Drift::Appeared(info)
            | Drift::Replaced(info)
            | Drift::Changed(info) => Some(info),
            Drift::Vanished => None,
            Drift::Unchanged(info) => info,
        }
    }
}

/// Periodic rescan ticks, or a receiver that never fires when disabled
pub(crate) fn rescan_ticker(interval: Option<Duration>) -> Receiver<Instant> {
    match interval {
        Some(interval) if !interval.is_zero() => crossbeam_channel::tick(interval),
        _ => crossbeam_channel::never(),
    }
}
