//! Runtime state of a transfer, as published to the progress aggregator.

use serde::Serialize;

use super::error::TransferError;

/// Lifecycle of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Connecting,
    Downloading,
    Resuming,
    Completed,
    Failed,
    Skipped,
}

impl TransferStatus {
    /// Completed, Failed and Skipped are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// States that occupy a worker slot.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Downloading | Self::Resuming)
    }
}

/// Snapshot of one transfer's progress.
///
/// `bytes_transferred` counts bytes present in the destination file. It never
/// decreases within a `generation`; the generation is bumped when the file is
/// truncated and the transfer restarts from byte 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferState {
    pub bytes_total: Option<u64>,
    pub bytes_transferred: u64,
    pub status: TransferStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TransferError>,
    pub attempts: u32,
    pub generation: u32,
}

impl Default for TransferState {
    fn default() -> Self {
        Self::pending()
    }
}

impl TransferState {
    pub fn pending() -> Self {
        Self {
            bytes_total: None,
            bytes_transferred: 0,
            status: TransferStatus::Pending,
            error: None,
            attempts: 0,
            generation: 0,
        }
    }

    /// Terminal failed state carrying `error`; counters are kept as they are.
    pub fn failed(mut self, error: TransferError) -> Self {
        self.status = TransferStatus::Failed;
        self.error = Some(error);
        self
    }

    pub fn with_status(mut self, status: TransferStatus) -> Self {
        self.status = status;
        if status != TransferStatus::Failed {
            self.error = None;
        }
        self
    }

    /// Ordering key used to discard stale progress events.
    pub fn progress_key(&self) -> (u32, u64) {
        (self.generation, self.bytes_transferred)
    }

    /// Fraction complete in [0.0, 1.0], if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.bytes_total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_transferred as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}
