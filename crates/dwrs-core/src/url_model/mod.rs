//! Destination naming.
//!
//! Derives a safe local filename from the last path segment of a URL,
//! sanitized so it cannot escape the output directory.

mod path;
mod sanitize;

pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename;

/// Default filename when the URL path yields nothing usable.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Derives a safe filename for saving a download.
///
/// Uses the last non-empty path segment of `url` (query and fragment are
/// ignored). The result is sanitized (no `/`, `\`, NUL, or control chars; no
/// leading/trailing dots or spaces); unusable names fall back to
/// [`DEFAULT_FILENAME`].
///
/// # Examples
///
/// - `derive_filename("https://example.com/archive.zip")` → `"archive.zip"`
/// - `derive_filename("https://example.com/")` → `"download.bin"`
pub fn derive_filename(url: &str) -> String {
    let raw = match filename_from_url_path(url) {
        Some(c) => c,
        None => return DEFAULT_FILENAME.to_string(),
    };

    let sanitized = sanitize_filename(&raw);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}
