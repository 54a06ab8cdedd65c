//! Worker pool: runs queued transfers with at most N in flight.
//!
//! `Scheduler::schedule` returns a [`Schedule`], a lazy sequence of finished
//! transfers. Polling it starts queued tasks in order whenever a slot is free
//! and yields results in completion order.

mod schedule;

pub use schedule::Schedule;

use crate::task::{DownloadTask, TaskId};
use crate::transfer::TransferUnit;

/// Dispatches transfer units. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Scheduler {
    unit: TransferUnit,
}

impl Scheduler {
    pub fn new(unit: TransferUnit) -> Self {
        Self { unit }
    }

    /// Queues `tasks` (in order) to run with up to `concurrency` units at once.
    ///
    /// Nothing starts until the returned schedule is polled. A concurrency of 0
    /// is treated as 1.
    pub fn schedule(
        &self,
        tasks: Vec<(TaskId, DownloadTask)>,
        concurrency: usize,
        resume: bool,
    ) -> Schedule {
        Schedule::new(self.unit.clone(), tasks, concurrency.max(1), resume)
    }
}
