//! Safe resume: decide whether a partial destination file can be continued.
//!
//! The partial file is the checkpoint: its size is the resume offset. Under the
//! `validators` policy a sidecar (`<destination>.dwrs-resume`) records the
//! ETag/Last-Modified/length the partial bytes were fetched against. Before
//! resuming, the transfer unit probes the URL and compares; if anything
//! changed, resume is refused and the file is downloaded again from byte 0.

mod plan;
mod record;
mod validate;

pub use plan::{plan_resume, FreshReason, ResumePlan};
pub use record::{sidecar_path, ResumeRecord, SIDECAR_SUFFIX};
pub use validate::{validate_for_resume, ValidationError, ValidationErrorKind};
