//! Sequential writer for a destination file.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Open destination file with its current write position.
///
/// Owned by exactly one transfer unit; never shared.
#[derive(Debug)]
pub struct DestinationFile {
    file: File,
    path: PathBuf,
    position: u64,
}

impl DestinationFile {
    /// Create (or truncate) the destination, creating missing parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to create destination: {}", path.display()))?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            position: 0,
        })
    }

    /// Open an existing partial file for appending at `offset`.
    /// Anything past `offset` is cut off so the file length equals the position.
    pub fn open_append(path: &Path, offset: u64) -> Result<Self> {
        let mut file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("failed to open partial file: {}", path.display()))?;
        file.set_len(offset)
            .with_context(|| format!("failed to set length of {}", path.display()))?;
        file.seek(SeekFrom::Start(offset))
            .context("seek to resume offset failed")?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            position: offset,
        })
    }

    /// Append `data` at the current position.
    ///
    /// On failure the file is cut back to the old position, so `position()`
    /// still matches the file length. If that is impossible, the position is
    /// taken from the file instead.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
        if let Err(e) = self.file.write_all(data) {
            self.roll_back();
            return Err(e).with_context(|| format!("write to {} failed", self.path.display()));
        }
        self.position += data.len() as u64;
        Ok(())
    }

    fn roll_back(&mut self) {
        let restored = self
            .file
            .set_len(self.position)
            .and_then(|()| self.file.seek(SeekFrom::Start(self.position)));
        if let Err(e) = restored {
            let on_disk = self.file.metadata().map(|m| m.len()).unwrap_or(self.position);
            tracing::warn!(
                path = %self.path.display(),
                kept = on_disk,
                "could not cut partial write back: {}",
                e
            );
            self.position = on_disk;
        }
    }

    /// Discard everything written so far and continue from byte 0.
    pub fn truncate(&mut self) -> Result<()> {
        self.file
            .set_len(0)
            .with_context(|| format!("failed to truncate {}", self.path.display()))?;
        self.file.seek(SeekFrom::Start(0)).context("seek to start failed")?;
        self.position = 0;
        Ok(())
    }

    /// Flush file data to disk.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().context("storage sync failed")?;
        Ok(())
    }

    /// Bytes present in the file (the next write offset).
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
