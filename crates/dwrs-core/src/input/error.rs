//! Errors in the task set itself, reported before any transfer starts.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// URL is not an absolute http/https URL.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// An explicit output name climbs out of its directory with `..`.
    #[error("output name {} may not contain '..'", path.display())]
    UnsafeDestination { path: PathBuf },

    /// Two tasks resolve to the same destination path.
    #[error("destination {} is used by both {first} and {second}", path.display())]
    DestinationCollision {
        path: PathBuf,
        first: String,
        second: String,
    },

    /// `--output` was given, but not once per URL.
    #[error("{outputs} output name(s) given for {urls} URL(s)")]
    OutputCountMismatch { urls: usize, outputs: usize },

    /// The list file could not be read.
    #[error("cannot read list file {}: {source}", path.display())]
    ListFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The list file contained no requests.
    #[error("no URLs found in {}", path.display())]
    EmptyList { path: PathBuf },
}
