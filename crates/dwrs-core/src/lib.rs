//! dwrs core: parallel, resumable HTTP(S) file downloads.
//!
//! [`orchestrator::Orchestrator`] is the entry point: it validates requests,
//! hands them to the [`scheduler`], which runs one [`transfer::TransferUnit`]
//! per file with bounded concurrency, while [`progress`] collects live state.

pub mod config;
pub mod control;
pub mod input;
pub mod logging;
pub mod orchestrator;
pub mod probe;
pub mod progress;
pub mod retry;
pub mod safe_resume;
pub mod scheduler;
pub mod storage;
pub mod task;
pub mod transfer;
pub mod url_model;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("dwrs/", env!("CARGO_PKG_VERSION"));
