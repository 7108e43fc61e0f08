//! Resolution of a watch target to something the OS can actually watch
//!
//! The OS subsystem can only watch paths that exist. For a target such as
//! `/srv/app/conf/app.yaml` where `conf/` is missing, the watcher watches the
//! nearest existing ancestor (`/srv/app`, the anchor) and waits for the next
//! path segment (`/srv/app/conf`, the expected child) to appear.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute and lexically normalised (`.` and `..` removed)
///
/// Symlinks are not resolved: the watcher follows the location, not
/// whatever it currently points to.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "watch target path is empty",
        ));
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    Ok(normalized)
}

/// Where to watch for a target in the current shape of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// Nearest existing ancestor directory of the target
    pub anchor_dir: PathBuf,
    /// Path directly below `anchor_dir` on the way to the target
    pub expected_child: PathBuf,
}

impl ResolvedLocation {
    /// Walk upward from `target` until an existing directory is found
    pub fn resolve(target: &Path) -> Self {
        let mut anchor_dir = target.to_path_buf();
        let mut expected_child = target.to_path_buf();

        loop {
            if is_dir(&anchor_dir) {
                break;
            }
            let Some(parent) = anchor_dir.parent() else {
                // Only reachable when even the root is gone.
                break;
            };
            expected_child = anchor_dir.clone();
            anchor_dir = parent.to_path_buf();
        }

        Self {
            anchor_dir,
            expected_child,
        }
    }

    /// True once the expected child is the target itself
    pub fn is_complete(&self, target: &Path) -> bool {
        self.expected_child == target
    }

    /// Directories to watch: the anchor first, then each ancestor up to the root
    pub fn watch_dirs(&self) -> impl Iterator<Item = &Path> {
        self.anchor_dir.ancestors()
    }

    /// Whether a notification about `path` can affect `target`
    ///
    /// Ancestor watches also report unrelated siblings of every ancestor;
    /// only paths on the chain down to the target, or inside the anchor
    /// directory, matter.
    pub fn is_relevant(&self, target: &Path, path: &Path) -> bool {
        target.starts_with(path) || path.starts_with(&self.anchor_dir)
    }
}

fn is_dir(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}
