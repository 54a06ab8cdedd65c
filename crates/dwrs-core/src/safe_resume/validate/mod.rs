//! Compares the recorded validators of a partial file with a fresh HEAD probe.

mod error;

use crate::probe::ResponseMeta;

use super::record::ResumeRecord;

pub use error::{ValidationError, ValidationErrorKind};

/// Returns Ok(()) if the partial file can be continued against the current probe.
///
/// Only fields known on both sides are compared: a value missing from either the
/// record or the probe is treated as unknown, not as a change. The ranged GET
/// still carries `If-Range`, so a change the probe cannot see is caught there.
pub fn validate_for_resume(
    record: &ResumeRecord,
    head: &ResponseMeta,
) -> Result<(), ValidationError> {
    let etag_changed = differs(record.etag.as_deref(), head.etag.as_deref());
    let last_modified_changed =
        differs(record.last_modified.as_deref(), head.last_modified.as_deref());
    let size_changed = differs(record.total, head.resource_length());

    if etag_changed || last_modified_changed || size_changed {
        return Err(ValidationError {
            kind: ValidationErrorKind::RemoteChanged {
                etag_changed,
                last_modified_changed,
                size_changed,
            },
        });
    }

    Ok(())
}

fn differs<T: PartialEq>(recorded: Option<T>, current: Option<T>) -> bool {
    matches!((recorded, current), (Some(a), Some(b)) if a != b)
}

#[cfg(test)]
mod tests;
