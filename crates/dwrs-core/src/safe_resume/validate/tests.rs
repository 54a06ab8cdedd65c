use super::*;

fn record(etag: Option<&str>, last_modified: Option<&str>, total: Option<u64>) -> ResumeRecord {
    ResumeRecord {
        url: "https://example.com/file.iso".to_string(),
        etag: etag.map(String::from),
        last_modified: last_modified.map(String::from),
        total,
    }
}

fn head(etag: Option<&str>, last_modified: Option<&str>, len: Option<u64>) -> ResponseMeta {
    ResponseMeta {
        status: 200,
        content_length: len,
        accept_ranges: true,
        etag: etag.map(String::from),
        last_modified: last_modified.map(String::from),
        content_range: None,
    }
}

const LM: &str = "Wed, 21 Oct 2015 07:28:00 GMT";

#[test]
fn unchanged_resource_validates() {
    let r = record(Some("\"abc\""), Some(LM), Some(1000));
    let h = head(Some("\"abc\""), Some(LM), Some(1000));
    assert!(validate_for_resume(&r, &h).is_ok());
}

#[test]
fn etag_change_is_detected() {
    let r = record(Some("\"abc\""), None, Some(1000));
    let h = head(Some("\"xyz\""), None, Some(1000));
    let err = validate_for_resume(&r, &h).unwrap_err();
    match err.kind {
        ValidationErrorKind::RemoteChanged {
            etag_changed,
            last_modified_changed,
            size_changed,
        } => {
            assert!(etag_changed);
            assert!(!last_modified_changed);
            assert!(!size_changed);
        }
    }
    assert_eq!(err.to_string(), "remote resource changed (ETag)");
}

#[test]
fn size_and_last_modified_change_are_reported_together() {
    let r = record(None, Some(LM), Some(1000));
    let h = head(None, Some("Thu, 22 Oct 2015 08:00:00 GMT"), Some(2000));
    let err = validate_for_resume(&r, &h).unwrap_err();
    assert_eq!(
        err.to_string(),
        "remote resource changed (Last-Modified, size)"
    );
}

#[test]
fn missing_values_are_not_changes() {
    let r = record(Some("\"abc\""), None, None);
    let h = head(None, Some(LM), Some(1000));
    assert!(validate_for_resume(&r, &h).is_ok());
}
