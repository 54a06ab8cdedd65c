//! Destination collision detection.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::input::InputError;
use crate::task::DownloadTask;

/// Lexically normalizes a path: drops `.` and folds `..` into its parent.
/// Does not touch the filesystem, so symlinks are not resolved.
pub(super) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Fails on the first pair of tasks that share a destination.
pub(super) fn check_destinations<'a>(
    tasks: impl IntoIterator<Item = &'a DownloadTask>,
) -> Result<(), InputError> {
    let mut seen: HashMap<PathBuf, &DownloadTask> = HashMap::new();
    for task in tasks {
        let key = normalize(task.destination());
        if let Some(first) = seen.get(&key) {
            return Err(InputError::DestinationCollision {
                path: key,
                first: first.source().to_string(),
                second: task.source().to_string(),
            });
        }
        seen.insert(key, task);
    }
    Ok(())
}
