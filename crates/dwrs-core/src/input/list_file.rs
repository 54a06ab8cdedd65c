//! List file format: one `<url> [output-name]` per line.
//!
//! Blank lines and lines starting with `#` are ignored. Fields are separated
//! by whitespace; anything after the output name is ignored.

use std::path::{Path, PathBuf};

use super::{InputError, TaskRequest};

/// Parses the contents of a list file.
pub fn parse_list(text: &str) -> Vec<TaskRequest> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let url = fields.next()?;
            let output = fields.next().map(PathBuf::from);
            Some(TaskRequest::new(url, output))
        })
        .collect()
}

/// Reads and parses a list file. Fails if the file is unreadable or lists nothing.
pub fn read_list_file(path: &Path) -> Result<Vec<TaskRequest>, InputError> {
    let text = std::fs::read_to_string(path).map_err(|source| InputError::ListFile {
        path: path.to_path_buf(),
        source,
    })?;
    let requests = parse_list(&text);
    if requests.is_empty() {
        return Err(InputError::EmptyList {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(path = %path.display(), count = requests.len(), "parsed list file");
    Ok(requests)
}
