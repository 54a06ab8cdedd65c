//! Error types for safe-resume validation.

use std::fmt;

/// The remote resource no longer matches the partial file on disk.
#[derive(Debug)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
}

#[derive(Debug)]
pub enum ValidationErrorKind {
    /// Remote ETag, Last-Modified, or size changed since the partial file was written.
    RemoteChanged {
        etag_changed: bool,
        last_modified_changed: bool,
        size_changed: bool,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidationErrorKind::RemoteChanged {
                etag_changed,
                last_modified_changed,
                size_changed,
            } => {
                let changed: Vec<&str> = [
                    (*etag_changed, "ETag"),
                    (*last_modified_changed, "Last-Modified"),
                    (*size_changed, "size"),
                ]
                .iter()
                .filter(|(hit, _)| *hit)
                .map(|(_, name)| *name)
                .collect();
                write!(f, "remote resource changed")?;
                if !changed.is_empty() {
                    write!(f, " ({})", changed.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}
