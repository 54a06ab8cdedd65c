//! The lazy result sequence of one scheduling run.

use std::collections::{HashMap, VecDeque};

use tokio::task::{Id as SlotId, JoinError, JoinSet};

use crate::task::{DownloadTask, ErrorClass, TaskId, TransferError, TransferState};
use crate::transfer::TransferUnit;

/// One finished task.
pub type Finished = (TaskId, DownloadTask, TransferState);

/// Finite, non-restartable sequence of finished tasks.
///
/// The queue is owned here and only popped by `next`.
#[derive(Debug)]
pub struct Schedule {
    unit: TransferUnit,
    queue: VecDeque<(TaskId, DownloadTask)>,
    running: JoinSet<Finished>,
    /// Task behind each running slot, for slots that end without a result.
    slots: HashMap<SlotId, (TaskId, DownloadTask)>,
    concurrency: usize,
    resume: bool,
}

impl Schedule {
    pub(super) fn new(
        unit: TransferUnit,
        tasks: Vec<(TaskId, DownloadTask)>,
        concurrency: usize,
        resume: bool,
    ) -> Self {
        Self {
            unit,
            queue: tasks.into(),
            running: JoinSet::new(),
            slots: HashMap::new(),
            concurrency,
            resume,
        }
    }

    /// Tasks not dispatched yet.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Units currently occupying a slot.
    pub fn active(&self) -> usize {
        self.running.len()
    }

    /// Waits for the next task to finish. Returns `None` once the queue is
    /// empty and every slot is idle.
    pub async fn next(&mut self) -> Option<Finished> {
        loop {
            if self.unit.control().is_cancelled() {
                if let Some((id, task)) = self.queue.pop_front() {
                    return Some((id, task, self.never_started(id)));
                }
            } else {
                self.fill_slots();
            }

            match self.running.join_next_with_id().await {
                Some(Ok((slot, finished))) => {
                    self.slots.remove(&slot);
                    tracing::debug!(task = %finished.0, status = ?finished.2.status, "transfer finished");
                    return Some(finished);
                }
                Some(Err(e)) => {
                    tracing::warn!("transfer slot ended abnormally: {}", e);
                    if let Some((id, task)) = self.slots.remove(&e.id()) {
                        let state = crashed(&self.unit, id, &e);
                        return Some((id, task, state));
                    }
                }
                None if self.queue.is_empty() => return None,
                None => {}
            }
        }
    }

    /// Starts queued tasks while slots are free.
    fn fill_slots(&mut self) {
        while self.running.len() < self.concurrency {
            let Some((id, task)) = self.queue.pop_front() else {
                break;
            };
            tracing::debug!(task = %id, url = task.source(), "dispatching");
            let unit = self.unit.clone();
            let resume = self.resume;
            let handle = self.running.spawn(run_in_slot(unit, id, task.clone(), resume));
            self.slots.insert(handle.id(), (id, task));
        }
    }

    #[cfg(test)]
    pub(super) fn dispatch_and_abort(&mut self) {
        self.fill_slots();
        self.running.abort_all();
    }

    fn never_started(&self, id: TaskId) -> TransferState {
        let state = TransferState::pending().failed(TransferError::new(
            ErrorClass::Cancelled,
            "run cancelled before the transfer started",
        ));
        self.unit.progress().record(id, state.clone());
        state
    }
}

/// Runs one unit in its own task so a panic becomes a Failed state.
async fn run_in_slot(unit: TransferUnit, id: TaskId, task: DownloadTask, resume: bool) -> Finished {
    let inner = {
        let unit = unit.clone();
        let task = task.clone();
        tokio::spawn(async move { unit.run(id, &task, resume).await })
    };
    let state = match inner.await {
        Ok(state) => state,
        Err(e) => crashed(&unit, id, &e),
    };
    (id, task, state)
}

/// Failed(Internal) state for a unit that ended without reporting, keeping
/// the last recorded byte counts.
fn crashed(unit: &TransferUnit, id: TaskId, e: &JoinError) -> TransferState {
    let last = unit
        .progress()
        .snapshot()
        .get(id)
        .cloned()
        .unwrap_or_default();
    tracing::error!(task = %id, "transfer unit crashed: {}", e);
    let state = last.failed(TransferError::new(
        ErrorClass::Internal,
        format!("transfer unit crashed: {}", e),
    ));
    unit.progress().record(id, state.clone());
    state
}
