//! Easy2 Handler for one GET attempt.
//! Inspects the response at the first body byte, then streams the body into
//! the destination file and publishes progress after every chunk.

use std::str;

use crate::control::RunControl;
use crate::probe::{parse_headers, HeaderLines, ResponseMeta};
use crate::progress::ProgressAggregator;
use crate::retry::AttemptError;
use crate::safe_resume::ResumeRecord;
use crate::storage::DestinationFile;
use crate::task::{TaskId, TransferState, TransferStatus};

/// What the handler decided about the response once its headers were complete.
#[derive(Debug)]
pub(super) enum Verdict {
    /// Headers not inspected yet (no body byte seen).
    Pending,
    /// Body is streamed into the file.
    Accepted,
    /// Body is discarded and the attempt ends with this error.
    Rejected(AttemptError),
}

pub(super) struct AttemptHandler {
    pub(super) id: TaskId,
    pub(super) url: String,
    /// Taken back by the caller once the easy handle is done.
    pub(super) file: Option<DestinationFile>,
    pub(super) state: TransferState,
    pub(super) progress: ProgressAggregator,
    pub(super) control: RunControl,
    pub(super) chunk_size: usize,
    /// Offset the Range header asked for (0 = plain GET).
    pub(super) requested_offset: u64,
    /// Whether a 200 with a changed validator may still restart from byte 0.
    pub(super) allow_restart: bool,
    /// Write a validator sidecar when a full response starts the file.
    pub(super) keep_validators: bool,
    pub(super) headers: HeaderLines,
    pub(super) verdict: Verdict,
    /// Set when a changed validator forced a restart from byte 0.
    pub(super) restarted: bool,
    /// Validator to send with `If-Range` on later attempts.
    pub(super) if_range: Option<String>,
    pub(super) storage_error: Option<std::io::Error>,
}

impl AttemptHandler {
    /// Decides what to do with the response described by the collected headers.
    /// Called at the first body byte, or after the transfer when the body was empty.
    pub(super) fn inspect_response(&mut self) {
        if !matches!(self.verdict, Verdict::Pending) {
            return;
        }
        let meta = parse_headers(self.headers.lines());
        self.verdict = match meta.status {
            206 => self.accept_partial(&meta),
            200..=299 => self.accept_full(&meta),
            416 => Verdict::Rejected(AttemptError::RangeNotSatisfiable {
                complete_length: meta.content_range.and_then(|cr| cr.complete_length),
            }),
            status => Verdict::Rejected(AttemptError::Http { status }),
        };
        if matches!(self.verdict, Verdict::Accepted) {
            self.progress.record(self.id, self.state.clone());
        }
    }

    fn accept_partial(&mut self, meta: &ResponseMeta) -> Verdict {
        let first = meta.content_range.and_then(|cr| cr.first);
        if first != Some(self.requested_offset) {
            return Verdict::Rejected(AttemptError::ResourceChanged(format!(
                "server answered range {} with Content-Range starting at {}",
                self.requested_offset,
                first.map_or_else(|| "?".to_string(), |f| f.to_string())
            )));
        }
        let total = match meta.content_range {
            Some(cr) if cr.complete_length.is_some() => cr.complete_length,
            _ => meta
                .content_length
                .and_then(|len| self.requested_offset.checked_add(len)),
        };
        self.state.bytes_total = total;
        self.state.status = TransferStatus::Resuming;
        Verdict::Accepted
    }

    fn accept_full(&mut self, meta: &ResponseMeta) -> Verdict {
        if self.requested_offset > 0 || self.state.bytes_transferred > 0 {
            let changed = self
                .if_range
                .as_deref()
                .is_some_and(|sent| validator_changed(sent, meta));
            if changed {
                if !self.allow_restart {
                    return Verdict::Rejected(AttemptError::ResourceChanged(
                        "validator changed again after a restart".to_string(),
                    ));
                }
                tracing::info!(
                    task = %self.id,
                    offset = self.requested_offset,
                    "resource changed since the partial download, restarting from byte 0"
                );
                self.restarted = true;
            } else {
                tracing::info!(
                    task = %self.id,
                    offset = self.requested_offset,
                    "server ignored the range, downloading from byte 0"
                );
            }
            let truncated = match self.file.as_mut() {
                Some(file) => file.truncate(),
                None => Ok(()),
            };
            if let Err(e) = truncated {
                return Verdict::Rejected(storage_error(e));
            }
            self.state.generation += 1;
            self.state.bytes_transferred = 0;
        }
        self.state.bytes_total = meta.content_length;
        self.state.status = TransferStatus::Downloading;

        if self.keep_validators {
            if let Some(record) = ResumeRecord::from_response(&self.url, meta) {
                let saved = match self.file.as_ref() {
                    Some(file) => record.save(file.path()),
                    None => Ok(()),
                };
                if let Err(e) = saved {
                    tracing::warn!(task = %self.id, "could not write resume sidecar: {:#}", e);
                }
                self.if_range = record.if_range_value().map(str::to_string);
            }
        }
        Verdict::Accepted
    }
}

/// True when the response carries a validator of the same kind as `sent`
/// and it differs. A response without one says nothing about a change.
fn validator_changed(sent: &str, meta: &ResponseMeta) -> bool {
    let current = if sent.starts_with('"') || sent.starts_with("W/") {
        meta.etag.as_deref()
    } else {
        meta.last_modified.as_deref()
    };
    current.is_some_and(|v| v != sent)
}

fn storage_error(e: anyhow::Error) -> AttemptError {
    let io = e
        .downcast::<std::io::Error>()
        .unwrap_or_else(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", e)));
    AttemptError::Storage(io)
}

impl curl::easy::Handler for AttemptHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            self.headers.push(s);
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        if self.control.is_cancelled() {
            return Ok(0);
        }
        self.inspect_response();
        if !matches!(self.verdict, Verdict::Accepted) {
            return Ok(0);
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };
        for chunk in data.chunks(self.chunk_size.max(1)) {
            if let Err(e) = file.write_chunk(chunk) {
                if let AttemptError::Storage(io) = storage_error(e) {
                    self.storage_error = Some(io);
                }
                return Ok(0);
            }
            self.state.bytes_transferred = file.position();
            self.progress.record(self.id, self.state.clone());
        }
        Ok(data.len())
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        !self.control.is_cancelled()
    }
}
