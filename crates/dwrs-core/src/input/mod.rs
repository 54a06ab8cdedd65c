//! Task input: URLs from the command line or from a list file.
//!
//! Produces raw [`TaskRequest`]s; validation into
//! [`DownloadTask`](crate::task::DownloadTask)s happens in the orchestrator.

mod error;
mod list_file;

use std::path::PathBuf;

pub use error::InputError;
pub use list_file::{parse_list, read_list_file};

/// One unvalidated download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub url: String,
    /// Explicit output name; derived from the URL when absent.
    pub output: Option<PathBuf>,
}

impl TaskRequest {
    pub fn new(url: impl Into<String>, output: Option<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output,
        }
    }
}

/// Pairs URLs with output names by position.
///
/// `outputs` may be empty (all names derived from URLs); otherwise it must
/// have exactly one entry per URL.
pub fn requests_from_args(urls: &[String], outputs: &[String]) -> Result<Vec<TaskRequest>, InputError> {
    if !outputs.is_empty() && outputs.len() != urls.len() {
        return Err(InputError::OutputCountMismatch {
            urls: urls.len(),
            outputs: outputs.len(),
        });
    }
    Ok(urls
        .iter()
        .enumerate()
        .map(|(i, url)| TaskRequest::new(url.clone(), outputs.get(i).map(PathBuf::from)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn urls_without_outputs() {
        let reqs = requests_from_args(&strings(&["https://a/x", "https://b/y"]), &[]).unwrap();
        assert_eq!(reqs.len(), 2);
        assert!(reqs.iter().all(|r| r.output.is_none()));
    }

    #[test]
    fn urls_paired_with_outputs() {
        let reqs = requests_from_args(
            &strings(&["https://a/x", "https://b/y"]),
            &strings(&["one", "two"]),
        )
        .unwrap();
        assert_eq!(reqs[0].output.as_deref(), Some(std::path::Path::new("one")));
        assert_eq!(reqs[1].output.as_deref(), Some(std::path::Path::new("two")));
    }

    #[test]
    fn output_count_mismatch() {
        let err = requests_from_args(&strings(&["https://a/x", "https://b/y"]), &strings(&["one"]))
            .unwrap_err();
        assert!(matches!(
            err,
            InputError::OutputCountMismatch { urls: 2, outputs: 1 }
        ));
    }
}
