//! Destination file lifecycle.
//!
//! The destination is written in place: its length on disk is the resume
//! offset, so every write is followed by a counter update only once it has
//! succeeded, and `sync` is called at the end of every attempt.

mod file;

pub use file::DestinationFile;

/// Current size of `path`, or 0 if it does not exist.
pub fn local_len(path: &std::path::Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
