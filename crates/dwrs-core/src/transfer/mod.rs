//! Transfer Unit: moves one resource from its URL into its destination file.
//!
//! `TransferUnit::run` plans resume (probe + sidecar), then drives the attempt
//! loop: each attempt is one curl GET on the blocking pool, resuming at the
//! last byte confirmed on disk. Every chunk written is recorded into the
//! progress aggregator; the final state is returned, never an error.

mod attempt;
mod handler;

use std::time::Duration;

use crate::config::{DwrsConfig, ResumeValidation};
use crate::control::RunControl;
use crate::probe::{self, HeaderLines};
use crate::progress::ProgressAggregator;
use crate::retry::{failure_class, AttemptError, RetryPolicy};
use crate::safe_resume::{plan_resume, FreshReason, ResumePlan, ResumeRecord};
use crate::storage::{self, DestinationFile};
use crate::task::{DownloadTask, ErrorClass, TaskId, TransferError, TransferState, TransferStatus};

use attempt::{run_attempt, AttemptOutcome};
use handler::{AttemptHandler, Verdict};

/// Per-transfer knobs, taken from the config file.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub chunk_size: usize,
    pub connect_timeout: Duration,
    pub attempt_timeout: Duration,
    pub stall_timeout: Duration,
    pub resume_validation: ResumeValidation,
    pub retry: RetryPolicy,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self::from_config(&DwrsConfig::default())
    }
}

impl TransferSettings {
    pub fn from_config(cfg: &DwrsConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size.max(1),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            attempt_timeout: Duration::from_secs(cfg.attempt_timeout_secs),
            stall_timeout: Duration::from_secs(cfg.stall_timeout_secs),
            resume_validation: cfg.resume_validation,
            retry: cfg.retry.to_policy(),
        }
    }
}

/// Executes transfers. Cheap to clone; clones share the aggregator and cancel token.
#[derive(Debug, Clone)]
pub struct TransferUnit {
    settings: TransferSettings,
    progress: ProgressAggregator,
    control: RunControl,
}

/// Where the first attempt starts.
struct Start {
    file: DestinationFile,
    if_range: Option<String>,
}

impl TransferUnit {
    pub fn new(settings: TransferSettings, progress: ProgressAggregator, control: RunControl) -> Self {
        Self {
            settings,
            progress,
            control,
        }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    pub fn progress(&self) -> &ProgressAggregator {
        &self.progress
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    /// Runs `task` to a terminal state (Completed, Failed or Skipped).
    ///
    /// `resume` is the run-wide resume flag; the task's own flag also enables it.
    pub async fn run(&self, id: TaskId, task: &DownloadTask, resume: bool) -> TransferState {
        let mut state = TransferState::pending().with_status(TransferStatus::Connecting);
        self.publish(id, &state);

        if self.control.is_cancelled() {
            return self.fail(id, state, ErrorClass::Cancelled, "run cancelled before start");
        }

        let resume = resume || task.resume_requested();
        let start = match self.plan(id, task, resume, &mut state).await {
            Ok(Some(start)) => start,
            Ok(None) => return state,
            Err(e) => {
                return self.fail(id, state, ErrorClass::Filesystem, format!("{:#}", e));
            }
        };
        self.attempt_loop(id, task, state, start).await
    }

    /// Opens the destination according to the resume plan.
    /// `Ok(None)` means the task ended Skipped and `state` holds its final value.
    async fn plan(
        &self,
        id: TaskId,
        task: &DownloadTask,
        resume: bool,
        state: &mut TransferState,
    ) -> anyhow::Result<Option<Start>> {
        let destination = task.destination();
        let local_len = storage::local_len(destination);
        let validators = self.settings.resume_validation == ResumeValidation::Validators;

        let plan = if resume && local_len > 0 {
            let record = if validators {
                ResumeRecord::load(destination)
            } else {
                None
            };
            let head = self.probe(id, task.source()).await;
            plan_resume(
                resume,
                local_len,
                record.as_ref(),
                head.as_ref(),
                self.settings.resume_validation,
            )
        } else {
            plan_resume(resume, local_len, None, None, self.settings.resume_validation)
        };

        match plan {
            ResumePlan::Skip { total } => {
                tracing::info!(task = %id, path = %destination.display(), total, "already complete, skipping");
                if let Err(e) = ResumeRecord::remove(destination) {
                    tracing::warn!(task = %id, "{:#}", e);
                }
                state.bytes_total = Some(total);
                state.bytes_transferred = total;
                state.status = TransferStatus::Skipped;
                self.publish(id, state);
                Ok(None)
            }
            ResumePlan::Resume { offset, if_range } => {
                tracing::info!(task = %id, offset, validated = if_range.is_some(), "resuming partial file");
                let file = DestinationFile::open_append(destination, offset)?;
                state.bytes_transferred = offset;
                self.publish(id, state);
                Ok(Some(Start { file, if_range }))
            }
            ResumePlan::Fresh(reason) => {
                match &reason {
                    FreshReason::RemoteChanged(e) => {
                        tracing::warn!(task = %id, "{}; downloading again from byte 0", e);
                    }
                    FreshReason::LocalLarger { local, remote } => {
                        tracing::warn!(task = %id, local, remote, "partial file larger than remote resource; downloading again");
                    }
                    FreshReason::NotRequested | FreshReason::NoPartialFile => {}
                }
                if let Err(e) = ResumeRecord::remove(destination) {
                    tracing::warn!(task = %id, "{:#}", e);
                }
                let file = DestinationFile::create(destination)?;
                Ok(Some(Start {
                    file,
                    if_range: None,
                }))
            }
        }
    }

    /// HEAD probe on the blocking pool. Failure only disables validation.
    async fn probe(&self, id: TaskId, url: &str) -> Option<probe::ResponseMeta> {
        let url = url.to_string();
        let connect_timeout = self.settings.connect_timeout;
        match tokio::task::spawn_blocking(move || probe::probe(&url, connect_timeout)).await {
            Ok(Ok(meta)) => Some(meta),
            Ok(Err(e)) => {
                tracing::debug!(task = %id, "probe failed, resuming without validation: {:#}", e);
                None
            }
            Err(e) => {
                tracing::debug!(task = %id, "probe task failed: {}", e);
                None
            }
        }
    }

    async fn attempt_loop(
        &self,
        id: TaskId,
        task: &DownloadTask,
        mut state: TransferState,
        start: Start,
    ) -> TransferState {
        let policy = self.settings.retry;
        let keep_validators = self.settings.resume_validation == ResumeValidation::Validators;
        let Start { mut file, mut if_range } = start;
        let mut retry_attempt: u32 = 0;
        let mut restart_used = false;

        loop {
            retry_attempt += 1;
            state.attempts += 1;
            tracing::debug!(task = %id, attempt = state.attempts, offset = file.position(), "starting attempt");

            let handler = AttemptHandler {
                id,
                url: task.source().to_string(),
                requested_offset: file.position(),
                file: Some(file),
                state: state.clone(),
                progress: self.progress.clone(),
                control: self.control.clone(),
                chunk_size: self.settings.chunk_size,
                allow_restart: !restart_used,
                keep_validators,
                headers: HeaderLines::default(),
                verdict: Verdict::Pending,
                restarted: false,
                if_range: if_range.clone(),
                storage_error: None,
            };
            let settings = self.settings.clone();
            let outcome =
                match tokio::task::spawn_blocking(move || run_attempt(handler, &settings)).await {
                    Ok(Some(outcome)) => outcome,
                    Ok(None) => {
                        return self.fail(id, state, ErrorClass::Filesystem, "destination handle lost");
                    }
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(e) => {
                        return self.fail(id, state, ErrorClass::Cancelled, e.to_string());
                    }
                };

            let AttemptOutcome {
                file: f,
                state: s,
                restarted,
                if_range: validator,
                result,
            } = outcome;
            file = f;
            state = s;
            if_range = validator;
            restart_used |= restarted;

            if let Err(e) = file.sync() {
                return self.fail(id, state, ErrorClass::Filesystem, format!("{:#}", e));
            }

            let err = match result {
                Ok(()) => return self.complete(id, task, state),
                Err(e) => e,
            };

            if self.control.is_cancelled() || matches!(err, AttemptError::Cancelled) {
                return self.fail(id, state, ErrorClass::Cancelled, "run cancelled");
            }

            if let AttemptError::RangeNotSatisfiable { complete_length } = err {
                if complete_length == Some(file.position()) {
                    tracing::info!(task = %id, "server reports the file is already complete");
                    state.bytes_total = complete_length;
                    state.status = TransferStatus::Skipped;
                    if let Err(e) = ResumeRecord::remove(task.destination()) {
                        tracing::warn!(task = %id, "{:#}", e);
                    }
                    self.publish(id, &state);
                    return state;
                }
            }

            // 416 on a longer file, a misplaced Content-Range or a changed
            // validator: the partial file is discarded once per run.
            if matches!(
                err,
                AttemptError::RangeNotSatisfiable { .. } | AttemptError::ResourceChanged(_)
            ) {
                if restart_used {
                    return self.fail(
                        id,
                        state,
                        ErrorClass::ResourceChanged,
                        format!("{} after a full restart", err),
                    );
                }
                tracing::warn!(task = %id, offset = file.position(), "{}, restarting from byte 0", err);
                if let Err(e) = file.truncate() {
                    return self.fail(id, state, ErrorClass::Filesystem, format!("{:#}", e));
                }
                restart_used = true;
                if_range = None;
                state.generation += 1;
                state.bytes_transferred = 0;
                state.bytes_total = None;
                state.status = TransferStatus::Connecting;
                self.publish(id, &state);
                retry_attempt = 0;
                continue;
            }

            let class = failure_class(&err);
            match policy.next_delay(retry_attempt, class) {
                Some(delay) => {
                    tracing::warn!(
                        task = %id,
                        attempt = state.attempts,
                        ?delay,
                        "attempt failed, retrying: {}",
                        err
                    );
                    state.status = TransferStatus::Connecting;
                    self.publish(id, &state);
                    if !self.control.sleep(delay).await {
                        return self.fail(id, state, ErrorClass::Cancelled, "run cancelled");
                    }
                }
                None => return self.fail(id, state, class, err.to_string()),
            }
        }
    }

    fn complete(&self, id: TaskId, task: &DownloadTask, mut state: TransferState) -> TransferState {
        if let Err(e) = ResumeRecord::remove(task.destination()) {
            tracing::warn!(task = %id, "{:#}", e);
        }
        if state.bytes_total.is_none() {
            state.bytes_total = Some(state.bytes_transferred);
        }
        state.status = TransferStatus::Completed;
        tracing::info!(
            task = %id,
            bytes = state.bytes_transferred,
            attempts = state.attempts,
            path = %task.destination().display(),
            "download completed"
        );
        self.publish(id, &state);
        state
    }

    fn fail(
        &self,
        id: TaskId,
        state: TransferState,
        class: ErrorClass,
        message: impl Into<String>,
    ) -> TransferState {
        let error = TransferError::new(class, message);
        tracing::warn!(task = %id, bytes = state.bytes_transferred, "transfer failed: {}", error);
        let state = state.failed(error);
        self.publish(id, &state);
        state
    }

    fn publish(&self, id: TaskId, state: &TransferState) {
        self.progress.record(id, state.clone());
    }
}
