//! Location events and interpretation of raw notify events

use notify::event::{ModifyKind, RenameMode};
use notify::EventKind;
use serde::Serialize;
use std::fmt;

/// Transition of the watched location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LocationEvent {
    /// A file appeared at the watched location
    Created,
    /// The file at the watched location changed
    Updated,
    /// The file at the watched location is gone
    Deleted,
}

impl LocationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationEvent::Created => "Created",
            LocationEvent::Updated => "Updated",
            LocationEvent::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for LocationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// How the dispatch loop reacts to a raw notification
///
/// notify reports the two ends of a rename separately on most backends
/// (`Name(From)`, `Name(To)`); they map onto removal and creation. A
/// notification carrying both ends, or an end the backend cannot tell
/// (FSEvents reports `Name(Any)`), is a rename in its own right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawChange {
    Removed,
    Created,
    Renamed,
    Modified,
    Ignored,
}

pub(crate) fn classify(kind: &EventKind) -> RawChange {
    match kind {
        EventKind::Remove(_) => RawChange::Removed,
        EventKind::Create(_) => RawChange::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => RawChange::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => RawChange::Created,
        EventKind::Modify(ModifyKind::Name(_)) => RawChange::Renamed,
        EventKind::Modify(_) | EventKind::Any => RawChange::Modified,
        EventKind::Access(_) | EventKind::Other => RawChange::Ignored,
    }
}
