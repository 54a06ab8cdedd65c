//! One blocking GET attempt over a curl easy handle.

use curl::easy::Easy2;

use crate::retry::AttemptError;
use crate::storage::DestinationFile;
use crate::task::TransferState;

use super::handler::{AttemptHandler, Verdict};
use super::TransferSettings;

/// Handler state handed back after an attempt, whatever its result.
pub(super) struct AttemptOutcome {
    pub(super) file: DestinationFile,
    pub(super) state: TransferState,
    pub(super) restarted: bool,
    pub(super) if_range: Option<String>,
    pub(super) result: Result<(), AttemptError>,
}

/// Runs one GET from the file's current position. Blocks; call from `spawn_blocking`.
///
/// Returns `None` only if the handler was built without a file.
pub(super) fn run_attempt(
    handler: AttemptHandler,
    settings: &TransferSettings,
) -> Option<AttemptOutcome> {
    let offset = handler.requested_offset;
    let if_range = handler.if_range.clone();
    let url = handler.url.clone();
    let mut easy = Easy2::new(handler);
    let result = configure(&mut easy, &url, offset, if_range.as_deref(), settings)
        .map_err(AttemptError::Curl)
        .and_then(|()| perform(&mut easy));

    finish(easy, result)
}

fn configure(
    easy: &mut Easy2<AttemptHandler>,
    url: &str,
    offset: u64,
    if_range: Option<&str>,
    settings: &TransferSettings,
) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.useragent(crate::USER_AGENT)?;
    easy.buffer_size(settings.chunk_size)?;
    easy.connect_timeout(settings.connect_timeout)?;
    // Abort if throughput stays below 1 KiB/s for the stall window.
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(settings.stall_timeout)?;
    easy.timeout(settings.attempt_timeout)?;
    easy.progress(true)?;
    if offset > 0 {
        easy.range(&format!("{}-", offset))?;
        if let Some(validator) = if_range {
            let mut list = curl::easy::List::new();
            list.append(&format!("If-Range: {}", validator))?;
            easy.http_headers(list)?;
        }
    }
    Ok(())
}

fn perform(easy: &mut Easy2<AttemptHandler>) -> Result<(), AttemptError> {
    let performed = easy.perform();
    let handler = easy.get_mut();
    if let Err(e) = performed {
        if handler.control.is_cancelled() {
            return Err(AttemptError::Cancelled);
        }
        if e.is_write_error() {
            if let Some(io) = handler.storage_error.take() {
                return Err(AttemptError::Storage(io));
            }
            if let Verdict::Rejected(_) = handler.verdict {
                return Err(take_rejection(handler));
            }
        }
        return Err(AttemptError::Curl(e));
    }

    // Empty bodies never reach the write callback.
    handler.inspect_response();
    if let Verdict::Rejected(_) = handler.verdict {
        return Err(take_rejection(handler));
    }

    let received = handler.state.bytes_transferred;
    match handler.state.bytes_total {
        Some(expected) if received < expected => {
            Err(AttemptError::PartialTransfer { expected, received })
        }
        _ => Ok(()),
    }
}

fn take_rejection(handler: &mut AttemptHandler) -> AttemptError {
    match std::mem::replace(&mut handler.verdict, Verdict::Pending) {
        Verdict::Rejected(e) => e,
        _ => AttemptError::Cancelled,
    }
}

fn finish(
    mut easy: Easy2<AttemptHandler>,
    result: Result<(), AttemptError>,
) -> Option<AttemptOutcome> {
    let handler = easy.get_mut();
    Some(AttemptOutcome {
        file: handler.file.take()?,
        state: std::mem::take(&mut handler.state),
        restarted: handler.restarted,
        if_range: handler.if_range.take(),
        result,
    })
}
