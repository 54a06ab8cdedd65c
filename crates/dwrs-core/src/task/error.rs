//! Terminal error classification carried by a failed transfer.

use serde::Serialize;
use std::fmt;

/// Why a transfer ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ErrorClass {
    /// Malformed or unsupported URL.
    InvalidInput,
    /// DNS, refused/reset connection, TLS failure, truncated body.
    Connection,
    /// No progress within the configured window, or attempt deadline hit.
    Timeout,
    /// Non-success HTTP status.
    Server { status: u16 },
    /// Destination could not be created or written.
    Filesystem,
    /// Remote resource changed while the transfer was being resumed.
    ResourceChanged,
    /// The run was cancelled before this transfer finished.
    Cancelled,
    /// The transfer unit itself crashed.
    Internal,
}

impl ErrorClass {
    /// Whether another attempt may succeed: network trouble, timeouts,
    /// throttling (429) and 5xx answers.
    pub fn is_transient(self) -> bool {
        match self {
            ErrorClass::Connection | ErrorClass::Timeout => true,
            ErrorClass::Server { status } => status == 429 || (500..=599).contains(&status),
            ErrorClass::InvalidInput
            | ErrorClass::Filesystem
            | ErrorClass::ResourceChanged
            | ErrorClass::Cancelled
            | ErrorClass::Internal => false,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::InvalidInput => write!(f, "invalid input"),
            ErrorClass::Connection => write!(f, "connection error"),
            ErrorClass::Timeout => write!(f, "timeout"),
            ErrorClass::Server { status } => write!(f, "server error (HTTP {})", status),
            ErrorClass::Filesystem => write!(f, "filesystem error"),
            ErrorClass::ResourceChanged => write!(f, "resource changed"),
            ErrorClass::Cancelled => write!(f, "cancelled"),
            ErrorClass::Internal => write!(f, "internal error"),
        }
    }
}

/// Classified failure with the underlying message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{class}: {message}")]
pub struct TransferError {
    pub class: ErrorClass,
    pub message: String,
}

impl TransferError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}
