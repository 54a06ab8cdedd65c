//! Error of a single transfer attempt, before retry classification.

/// Error returned by one attempt (one GET). Used so we can classify and decide
/// retries before turning it into a terminal [`TransferError`](crate::task::TransferError).
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    /// Curl reported an error (timeout, connection, TLS, malformed URL, ...).
    #[error("{0}")]
    Curl(#[source] curl::Error),
    /// HTTP response had a non-success status.
    #[error("HTTP {status}")]
    Http { status: u32 },
    /// 416 for the requested resume offset; carries the server's reported length.
    #[error("range not satisfiable (resource length {})", complete_length.map_or_else(|| "unknown".to_string(), |n| n.to_string()))]
    RangeNotSatisfiable { complete_length: Option<u64> },
    /// Transfer ended before the announced length arrived (server closed early).
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Disk/storage write failed (e.g. disk full, permission denied). Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    /// The response describes a different resource than the partial file holds.
    #[error("resource changed while resuming: {0}")]
    ResourceChanged(String),
    /// The run was cancelled mid-attempt.
    #[error("cancelled")]
    Cancelled,
}
