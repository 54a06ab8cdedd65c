//! Job Orchestrator: turns requests into tasks, runs them, builds the report.

mod dedupe;
mod report;

use std::path::PathBuf;

use crate::config::DwrsConfig;
use crate::control::RunControl;
use crate::input::{InputError, TaskRequest};
use crate::progress::{ProgressAggregator, ProgressWatcher};
use crate::scheduler::Scheduler;
use crate::task::{DownloadTask, ErrorClass, TaskId, TransferError, TransferState};
use crate::transfer::{TransferSettings, TransferUnit};

pub use report::{ReportEntry, RunReport};

/// Owns the aggregator, the cancel token and the scheduler for one run.
#[derive(Debug)]
pub struct Orchestrator {
    scheduler: Scheduler,
    progress: ProgressAggregator,
    control: RunControl,
    output_dir: PathBuf,
}

impl Orchestrator {
    /// Relative destinations are placed under `output_dir`.
    pub fn new(settings: TransferSettings, output_dir: impl Into<PathBuf>) -> Self {
        let progress = ProgressAggregator::new();
        let control = RunControl::new();
        let unit = TransferUnit::new(settings, progress.clone(), control.clone());
        Self {
            scheduler: Scheduler::new(unit),
            progress,
            control,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(cfg: &DwrsConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self::new(TransferSettings::from_config(cfg), output_dir)
    }

    /// Live progress for a renderer.
    pub fn progress(&self) -> ProgressWatcher {
        self.progress.subscribe()
    }

    pub fn aggregator(&self) -> &ProgressAggregator {
        &self.progress
    }

    /// Token that cancels this run when triggered.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    /// Runs every request to a terminal state.
    ///
    /// Progress from an earlier `execute` on this orchestrator is discarded
    /// first, since task ids restart at zero. Invalid URLs end as Failed(InvalidInput) entries without being
    /// scheduled. Two valid tasks with the same destination abort the whole
    /// run with [`InputError::DestinationCollision`] before any request is sent.
    pub async fn execute(
        &self,
        requests: Vec<TaskRequest>,
        concurrency: usize,
        resume: bool,
    ) -> Result<RunReport, InputError> {
        self.progress.reset();
        let mut runnable = Vec::new();
        let mut entries = Vec::new();

        for (i, req) in requests.into_iter().enumerate() {
            let id = TaskId(i);
            let output = req.output.as_deref();
            match DownloadTask::new(&req.url, output, &self.output_dir, resume) {
                Ok(task) => runnable.push((id, task)),
                Err(e) => {
                    tracing::warn!(task = %id, "{}", e);
                    let task = DownloadTask::rejected(&req.url, output, &self.output_dir);
                    let state = TransferState::pending()
                        .failed(TransferError::new(ErrorClass::InvalidInput, e.to_string()));
                    entries.push(ReportEntry { id, task, state });
                }
            }
        }

        dedupe::check_destinations(runnable.iter().map(|(_, task)| task))?;

        for (id, _) in &runnable {
            self.progress.register(*id);
        }
        for entry in &entries {
            self.progress.register(entry.id);
            self.progress.record(entry.id, entry.state.clone());
        }

        tracing::info!(
            tasks = runnable.len(),
            rejected = entries.len(),
            concurrency,
            resume,
            "starting run"
        );
        let expected = runnable.len();
        let mut schedule = self.scheduler.schedule(runnable, concurrency, resume);
        let mut finished = 0usize;
        while let Some((id, task, state)) = schedule.next().await {
            finished += 1;
            entries.push(ReportEntry { id, task, state });
        }
        debug_assert_eq!(finished, expected);

        let report = RunReport::new(entries);
        tracing::info!(
            completed = report.completed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TransferStatus;
    use std::path::Path;

    fn requests(urls: &[&str]) -> Vec<TaskRequest> {
        urls.iter().map(|u| TaskRequest::new(*u, None)).collect()
    }

    #[tokio::test]
    async fn invalid_urls_are_reported_not_scheduled() {
        let dir = tempfile::tempdir().unwrap();
        let orch = Orchestrator::new(TransferSettings::default(), dir.path());
        let report = orch
            .execute(requests(&["ftp://example.com/a", "not a url"]), 2, false)
            .await
            .unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.failed(), 2);
        for entry in report.entries() {
            assert_eq!(entry.state.status, TransferStatus::Failed);
            assert_eq!(
                entry.state.error.as_ref().unwrap().class,
                ErrorClass::InvalidInput
            );
        }
        assert_eq!(orch.aggregator().snapshot().totals().failed, 2);
    }

    #[tokio::test]
    async fn collision_fails_before_any_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let orch = Orchestrator::new(TransferSettings::default(), dir.path());
        let err = orch
            .execute(
                requests(&[
                    "http://127.0.0.1:9/a/file.bin",
                    "http://127.0.0.1:9/b/file.bin",
                ]),
                2,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InputError::DestinationCollision { .. }));
        assert!(!dir.path().join("file.bin").exists());
        assert!(orch.aggregator().snapshot().is_empty());
    }

    #[tokio::test]
    async fn empty_request_list_gives_empty_report() {
        let orch = Orchestrator::new(TransferSettings::default(), Path::new("."));
        let report = orch.execute(Vec::new(), 1, false).await.unwrap();
        assert!(report.is_empty());
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn second_execute_starts_from_clean_progress() {
        let dir = tempfile::tempdir().unwrap();
        let orch = Orchestrator::new(TransferSettings::default(), dir.path());
        orch.execute(requests(&["ftp://example.com/a"]), 1, false)
            .await
            .unwrap();
        assert_eq!(
            orch.aggregator().snapshot().get(TaskId(0)).unwrap().status,
            TransferStatus::Failed
        );

        orch.execute(Vec::new(), 1, false).await.unwrap();
        assert!(orch.aggregator().snapshot().is_empty());
        // A fresh task 0 is no longer shadowed by the old terminal entry.
        assert!(orch.aggregator().record(
            TaskId(0),
            TransferState::pending().with_status(TransferStatus::Connecting)
        ));
    }
}
