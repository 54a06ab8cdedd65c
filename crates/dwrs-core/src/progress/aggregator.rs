//! Shared per-task state map with coalesced change notification.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use tokio::sync::watch;

use crate::task::{TaskId, TransferState};

use super::snapshot::ProgressSnapshot;

#[derive(Debug)]
struct Table {
    states: BTreeMap<TaskId, TransferState>,
    started: Instant,
}

#[derive(Debug)]
struct Inner {
    table: Mutex<Table>,
    /// Bumped on every accepted record; receivers only see the latest value.
    version: watch::Sender<u64>,
}

impl Inner {
    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> ProgressSnapshot {
        let table = self.table();
        ProgressSnapshot::new(table.states.clone(), table.started.elapsed())
    }
}

/// Cheap to clone; all clones share one state map.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    inner: Arc<Inner>,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressAggregator {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(Table {
                    states: BTreeMap::new(),
                    started: Instant::now(),
                }),
                version,
            }),
        }
    }

    /// Seeds a Pending entry for `id`. An existing entry is left untouched.
    pub fn register(&self, id: TaskId) {
        let inserted = {
            let mut table = self.inner.table();
            match table.states.entry(id) {
                std::collections::btree_map::Entry::Vacant(v) => {
                    v.insert(TransferState::pending());
                    true
                }
                std::collections::btree_map::Entry::Occupied(_) => false,
            }
        };
        if inserted {
            self.notify();
        }
    }

    /// Replaces the stored state for `id` unless `state` is older than it.
    ///
    /// Older means a smaller `(generation, bytes_transferred)` key, or a
    /// non-terminal state arriving after a terminal one with the same key.
    /// Returns whether the event was applied.
    pub fn record(&self, id: TaskId, state: TransferState) -> bool {
        let applied = {
            let mut table = self.inner.table();
            let stale = table
                .states
                .get(&id)
                .map_or(false, |prev| is_stale(prev, &state));
            if !stale {
                table.states.insert(id, state);
            }
            !stale
        };
        if applied {
            self.notify();
        } else {
            tracing::trace!(task = %id, "discarded out-of-order progress event");
        }
        applied
    }

    /// Forgets every task and restarts the elapsed clock, so a new run can
    /// reuse task ids from zero.
    pub fn reset(&self) {
        {
            let mut table = self.inner.table();
            table.states.clear();
            table.started = Instant::now();
        }
        self.notify();
    }

    /// Point-in-time copy of every task's state.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner.snapshot()
    }

    /// Change notifications; intermediate updates are skipped when the consumer lags.
    pub fn subscribe(&self) -> ProgressWatcher {
        ProgressWatcher {
            rx: self.inner.version.subscribe(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn notify(&self) {
        self.inner.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

fn is_stale(prev: &TransferState, next: &TransferState) -> bool {
    let (prev_key, next_key) = (prev.progress_key(), next.progress_key());
    next_key < prev_key
        || (next_key == prev_key && prev.status.is_terminal() && !next.status.is_terminal())
}

/// Receiver side of [`ProgressAggregator::subscribe`].
#[derive(Debug)]
pub struct ProgressWatcher {
    rx: watch::Receiver<u64>,
    inner: Weak<Inner>,
}

impl ProgressWatcher {
    /// Waits for the next change and returns the latest snapshot.
    /// Returns `None` once every aggregator handle has been dropped.
    pub async fn changed(&mut self) -> Option<ProgressSnapshot> {
        self.rx.changed().await.ok()?;
        self.inner.upgrade().map(|inner| inner.snapshot())
    }

    /// Latest snapshot without waiting.
    pub fn current(&self) -> Option<ProgressSnapshot> {
        self.inner.upgrade().map(|inner| inner.snapshot())
    }
}
