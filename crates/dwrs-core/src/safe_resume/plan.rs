//! Resume planning for one transfer.

use crate::config::ResumeValidation;
use crate::probe::ResponseMeta;

use super::record::ResumeRecord;
use super::validate::{validate_for_resume, ValidationError};

/// Why a transfer starts from byte 0.
#[derive(Debug)]
pub enum FreshReason {
    NotRequested,
    NoPartialFile,
    /// Recorded validators no longer match the server.
    RemoteChanged(ValidationError),
    /// The partial file is longer than the remote resource.
    LocalLarger { local: u64, remote: u64 },
}

/// What the transfer unit does with an existing destination.
#[derive(Debug)]
pub enum ResumePlan {
    /// Create or truncate the destination and download everything.
    Fresh(FreshReason),
    /// Continue at `offset`, optionally conditional on `if_range`.
    Resume { offset: u64, if_range: Option<String> },
    /// The destination already holds the whole resource.
    Skip { total: u64 },
}

/// Decides how to treat an existing destination of `local_len` bytes.
///
/// `record` is the sidecar (ignored under `SizeOnly`); `head` is the result
/// of probing the URL, if the probe succeeded. Without validators the file
/// size alone is trusted.
pub fn plan_resume(
    resume: bool,
    local_len: u64,
    record: Option<&ResumeRecord>,
    head: Option<&ResponseMeta>,
    policy: ResumeValidation,
) -> ResumePlan {
    if !resume {
        return ResumePlan::Fresh(FreshReason::NotRequested);
    }
    if local_len == 0 {
        return ResumePlan::Fresh(FreshReason::NoPartialFile);
    }
    let record = match policy {
        ResumeValidation::Validators => record,
        ResumeValidation::SizeOnly => None,
    };

    if let (Some(record), Some(head)) = (record, head) {
        if let Err(e) = validate_for_resume(record, head) {
            return ResumePlan::Fresh(FreshReason::RemoteChanged(e));
        }
    }

    if let Some(remote) = head.and_then(ResponseMeta::resource_length) {
        if local_len == remote {
            return ResumePlan::Skip { total: remote };
        }
        if local_len > remote {
            return ResumePlan::Fresh(FreshReason::LocalLarger {
                local: local_len,
                remote,
            });
        }
    }

    ResumePlan::Resume {
        offset: local_len,
        if_range: record.and_then(|r| r.if_range_value()).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(len: Option<u64>, etag: Option<&str>) -> ResponseMeta {
        ResponseMeta {
            status: 200,
            content_length: len,
            accept_ranges: true,
            etag: etag.map(String::from),
            ..ResponseMeta::default()
        }
    }

    fn record(total: Option<u64>, etag: Option<&str>) -> ResumeRecord {
        ResumeRecord {
            url: "https://example.com/f".to_string(),
            etag: etag.map(String::from),
            last_modified: None,
            total,
        }
    }

    #[test]
    fn not_requested_or_empty_is_fresh() {
        assert!(matches!(
            plan_resume(false, 10, None, None, ResumeValidation::Validators),
            ResumePlan::Fresh(FreshReason::NotRequested)
        ));
        assert!(matches!(
            plan_resume(true, 0, None, None, ResumeValidation::Validators),
            ResumePlan::Fresh(FreshReason::NoPartialFile)
        ));
    }

    #[test]
    fn complete_file_is_skipped() {
        let h = head(Some(100), None);
        assert!(matches!(
            plan_resume(true, 100, None, Some(&h), ResumeValidation::Validators),
            ResumePlan::Skip { total: 100 }
        ));
    }

    #[test]
    fn partial_file_resumes_with_if_range() {
        let h = head(Some(100), Some("\"v1\""));
        let r = record(Some(100), Some("\"v1\""));
        match plan_resume(true, 40, Some(&r), Some(&h), ResumeValidation::Validators) {
            ResumePlan::Resume { offset, if_range } => {
                assert_eq!(offset, 40);
                assert_eq!(if_range.as_deref(), Some("\"v1\""));
            }
            other => panic!("expected resume, got {:?}", other),
        }
    }

    #[test]
    fn changed_etag_forces_fresh() {
        let h = head(Some(100), Some("\"v2\""));
        let r = record(Some(100), Some("\"v1\""));
        assert!(matches!(
            plan_resume(true, 40, Some(&r), Some(&h), ResumeValidation::Validators),
            ResumePlan::Fresh(FreshReason::RemoteChanged(_))
        ));
    }

    #[test]
    fn size_only_ignores_record() {
        let h = head(Some(100), Some("\"v2\""));
        let r = record(Some(100), Some("\"v1\""));
        match plan_resume(true, 40, Some(&r), Some(&h), ResumeValidation::SizeOnly) {
            ResumePlan::Resume { offset, if_range } => {
                assert_eq!(offset, 40);
                assert!(if_range.is_none());
            }
            other => panic!("expected resume, got {:?}", other),
        }
    }

    #[test]
    fn local_larger_than_remote_is_fresh() {
        let h = head(Some(10), None);
        assert!(matches!(
            plan_resume(true, 40, None, Some(&h), ResumeValidation::Validators),
            ResumePlan::Fresh(FreshReason::LocalLarger { local: 40, remote: 10 })
        ));
    }

    #[test]
    fn probe_failure_still_resumes() {
        let r = record(Some(100), Some("\"v1\""));
        assert!(matches!(
            plan_resume(true, 40, Some(&r), None, ResumeValidation::Validators),
            ResumePlan::Resume { offset: 40, .. }
        ));
    }
}
