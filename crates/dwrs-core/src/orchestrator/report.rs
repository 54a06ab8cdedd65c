//! Final outcome of a run.

use serde::Serialize;

use crate::task::{DownloadTask, TaskId, TransferState, TransferStatus};

/// One task with its final state.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub id: TaskId,
    pub task: DownloadTask,
    pub state: TransferState,
}

/// Tasks in input order with their final states, plus counts.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    entries: Vec<ReportEntry>,
    completed: usize,
    skipped: usize,
    failed: usize,
}

impl RunReport {
    /// Builds the report; `entries` are sorted by task id.
    pub fn new(mut entries: Vec<ReportEntry>) -> Self {
        entries.sort_by_key(|e| e.id);
        let count = |status| entries.iter().filter(|e| e.state.status == status).count();
        let completed = count(TransferStatus::Completed);
        let skipped = count(TransferStatus::Skipped);
        let failed = count(TransferStatus::Failed);
        Self {
            entries,
            completed,
            skipped,
            failed,
        }
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Completed or Skipped.
    pub fn succeeded(&self) -> usize {
        self.completed + self.skipped
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Entries that ended Failed.
    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|e| e.state.status == TransferStatus::Failed)
    }
}
