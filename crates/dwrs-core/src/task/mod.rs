//! Download task model: what to fetch, where to put it, and its runtime state.

mod error;
mod state;

use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::input::InputError;
use crate::url_model;

pub use error::{ErrorClass, TransferError};
pub use state::{TransferState, TransferStatus};

/// Identifier of a task within one run: its position in the input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One requested download. Immutable once built; consumed by exactly one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTask {
    source: String,
    destination: PathBuf,
    resume_requested: bool,
}

impl DownloadTask {
    /// Validates `source` (absolute http/https URL) and resolves the destination.
    ///
    /// Without an explicit `destination` the name is derived from the URL's last
    /// path segment. Relative destinations are placed under `output_dir`; an
    /// explicit destination with a `..` component is refused.
    pub fn new(
        source: &str,
        destination: Option<&Path>,
        output_dir: &Path,
        resume_requested: bool,
    ) -> Result<Self, InputError> {
        let parsed = url::Url::parse(source).map_err(|e| InputError::InvalidUrl {
            url: source.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(InputError::InvalidUrl {
                url: source.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(InputError::InvalidUrl {
                url: source.to_string(),
                reason: "missing host".to_string(),
            });
        }

        if let Some(path) = destination {
            if path.components().any(|c| c == Component::ParentDir) {
                return Err(InputError::UnsafeDestination {
                    path: path.to_path_buf(),
                });
            }
        }

        Ok(Self {
            source: source.to_string(),
            destination: resolve_destination(source, destination, output_dir),
            resume_requested,
        })
    }

    /// Task for a request whose URL failed validation. Never scheduled; only
    /// carried into the run report next to its failed state.
    pub(crate) fn rejected(source: &str, destination: Option<&Path>, output_dir: &Path) -> Self {
        Self {
            source: source.to_string(),
            destination: resolve_destination(source, destination, output_dir),
            resume_requested: false,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn resume_requested(&self) -> bool {
        self.resume_requested
    }
}

fn resolve_destination(source: &str, destination: Option<&Path>, output_dir: &Path) -> PathBuf {
    let path = match destination {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(url_model::derive_filename(source)),
    };
    if path.is_absolute() {
        path
    } else {
        output_dir.join(path)
    }
}
