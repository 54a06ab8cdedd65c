//! Validator sidecar persisted next to a partial download.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::probe::ResponseMeta;

/// Suffix appended to the destination path for the sidecar file.
pub const SIDECAR_SUFFIX: &str = ".dwrs-resume";

/// Path for the sidecar: appends `.dwrs-resume` (e.g. `file.iso` → `file.iso.dwrs-resume`).
pub fn sidecar_path(destination: &Path) -> PathBuf {
    let mut o = destination.as_os_str().to_owned();
    o.push(SIDECAR_SUFFIX);
    PathBuf::from(o)
}

/// What the server told us about the resource when the partial file was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub url: String,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl ResumeRecord {
    /// Builds a record from a full (200) response; `None` if it carries no validator.
    pub fn from_response(url: &str, meta: &ResponseMeta) -> Option<Self> {
        if meta.etag.is_none() && meta.last_modified.is_none() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            etag: meta.etag.clone(),
            last_modified: meta.last_modified.clone(),
            total: meta.resource_length(),
        })
    }

    /// Value for `If-Range`: a strong ETag, else Last-Modified.
    pub fn if_range_value(&self) -> Option<&str> {
        self.etag
            .as_deref()
            .filter(|e| !e.starts_with("W/"))
            .or(self.last_modified.as_deref())
    }

    /// Loads the sidecar for `destination`. Missing or unreadable sidecars yield `None`.
    pub fn load(destination: &Path) -> Option<Self> {
        let path = sidecar_path(destination);
        let data = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&data) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring unreadable resume sidecar: {}", e);
                None
            }
        }
    }

    pub fn save(&self, destination: &Path) -> Result<()> {
        let path = sidecar_path(destination);
        let data = serde_json::to_vec_pretty(self)?;
        std::fs::write(&path, data)
            .with_context(|| format!("write resume sidecar {}", path.display()))?;
        Ok(())
    }

    /// Removes the sidecar for `destination` if present.
    pub fn remove(destination: &Path) -> Result<()> {
        let path = sidecar_path(destination);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove resume sidecar {}", path.display())),
        }
    }
}
