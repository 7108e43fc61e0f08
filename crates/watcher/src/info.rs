//! Metadata snapshots for the watched location
//!
//! A [`FileInfo`] is what the watcher remembers about the file at its target:
//! enough to tell "still the same file, modified" apart from "a different file
//! now lives here", and to report size/mtime to consumers.

use serde::Serialize;
use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

/// Stable identity of a filesystem object
///
/// On Unix this is the (device, inode) pair, which survives renames and
/// in-place writes but changes when a file is replaced. Elsewhere it is a
/// digest of the volume and file index reported by an open handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    fn of(_path: &Path, metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }

    #[cfg(not(unix))]
    fn of(path: &Path, _metadata: &Metadata) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        // Unopenable files share one identity, as if nothing distinguished them
        let ino = match same_file::Handle::from_path(path) {
            Ok(handle) => {
                let mut hasher = DefaultHasher::new();
                handle.hash(&mut hasher);
                hasher.finish()
            }
            Err(_) => 0,
        };
        Self { dev: 0, ino }
    }
}

/// Snapshot of a file's metadata at the time it was observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    len: u64,
    modified: Option<SystemTime>,
    is_dir: bool,
    identity: FileIdentity,
}

impl FileInfo {
    /// Stat a path, following symlinks
    ///
    /// Any failure (missing file, permission denied, dangling link) is
    /// reported as `None`: the watcher treats an unreadable location the same
    /// as an absent one.
    pub fn stat(path: &Path) -> Option<Self> {
        std::fs::metadata(path).ok().map(|m| Self::from_metadata(path, &m))
    }

    fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
            is_dir: metadata.is_dir(),
            identity: FileIdentity::of(path, metadata),
        }
    }

    /// Size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True when the file has zero length
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Last modification time, when the platform reports one
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn identity(&self) -> FileIdentity {
        self.identity
    }

    /// Whether both snapshots describe the same underlying file
    pub fn same_file(&self, other: &FileInfo) -> bool {
        self.identity == other.identity
    }

    /// Whether the file changed in place since `earlier` was taken
    pub fn changed_since(&self, earlier: &FileInfo) -> bool {
        self.len != earlier.len || self.modified != earlier.modified
    }
}

/// Stat the watch target itself
///
/// A directory at the target path does not count as the target being
/// present.
pub(crate) fn probe_target(target: &Path) -> Option<FileInfo> {
    FileInfo::stat(target).filter(|info| !info.is_dir())
}
