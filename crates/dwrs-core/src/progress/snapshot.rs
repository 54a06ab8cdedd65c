//! Point-in-time view of all transfers, with derived totals, rate and ETA.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::task::{TaskId, TransferState, TransferStatus};

/// Consistent copy of the aggregator's state map.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
    states: BTreeMap<TaskId, TransferState>,
    totals: ProgressTotals,
    /// Time since the aggregator was created.
    #[serde(skip)]
    elapsed: Duration,
}

/// Derived sums and counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressTotals {
    pub tasks: usize,
    pub pending: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub bytes_transferred: u64,
    /// Sum of all totals; `None` while any task's total is unknown.
    pub bytes_total: Option<u64>,
}

impl ProgressTotals {
    fn from_states(states: &BTreeMap<TaskId, TransferState>) -> Self {
        let mut t = ProgressTotals {
            tasks: states.len(),
            bytes_total: Some(0),
            ..Self::default()
        };
        for state in states.values() {
            match state.status {
                TransferStatus::Pending => t.pending += 1,
                TransferStatus::Completed => t.completed += 1,
                TransferStatus::Failed => t.failed += 1,
                TransferStatus::Skipped => t.skipped += 1,
                TransferStatus::Connecting
                | TransferStatus::Downloading
                | TransferStatus::Resuming => t.active += 1,
            }
            t.bytes_transferred = t.bytes_transferred.saturating_add(state.bytes_transferred);
            t.bytes_total = match (t.bytes_total, state.bytes_total) {
                (Some(sum), Some(n)) => sum.checked_add(n),
                _ => None,
            };
        }
        t
    }

    /// Tasks in a terminal state.
    pub fn finished(&self) -> usize {
        self.completed + self.failed + self.skipped
    }
}

impl ProgressSnapshot {
    pub(crate) fn new(states: BTreeMap<TaskId, TransferState>, elapsed: Duration) -> Self {
        let totals = ProgressTotals::from_states(&states);
        Self {
            states,
            totals,
            elapsed,
        }
    }

    pub fn get(&self, id: TaskId) -> Option<&TransferState> {
        self.states.get(&id)
    }

    /// Entries in task order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &TransferState)> {
        self.states.iter().map(|(id, s)| (*id, s))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn totals(&self) -> &ProgressTotals {
        &self.totals
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// True once every task is Completed, Failed or Skipped.
    pub fn is_finished(&self) -> bool {
        self.states.values().all(|s| s.status.is_terminal())
    }

    /// Average rate in bytes per second since start (0 if no time has passed).
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.totals.bytes_transferred as f64 / secs
    }

    /// Estimated seconds remaining (None if the total is unknown or nothing has moved yet).
    pub fn eta_secs(&self) -> Option<f64> {
        let total = self.totals.bytes_total?;
        let remaining = total.saturating_sub(self.totals.bytes_transferred);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Overall fraction complete in [0.0, 1.0], if every total is known.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.totals.bytes_total?;
        if total == 0 {
            return Some(1.0);
        }
        Some((self.totals.bytes_transferred as f64 / total as f64).min(1.0))
    }
}
