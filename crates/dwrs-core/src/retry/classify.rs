//! Maps attempt errors to the class reported by a failed transfer.

use super::error::AttemptError;
use crate::task::ErrorClass;

fn curl_class(e: &curl::Error) -> ErrorClass {
    if e.is_operation_timedout() {
        ErrorClass::Timeout
    } else if e.is_url_malformed() || e.is_unsupported_protocol() {
        ErrorClass::InvalidInput
    } else if e.is_aborted_by_callback() {
        ErrorClass::Cancelled
    } else {
        // DNS, refused or reset connections, TLS handshakes, short bodies.
        ErrorClass::Connection
    }
}

pub fn failure_class(e: &AttemptError) -> ErrorClass {
    match e {
        AttemptError::Curl(ce) => curl_class(ce),
        AttemptError::Http { status } => ErrorClass::Server {
            status: u16::try_from(*status).unwrap_or(u16::MAX),
        },
        AttemptError::RangeNotSatisfiable { .. } => ErrorClass::Server { status: 416 },
        AttemptError::PartialTransfer { .. } => ErrorClass::Connection,
        AttemptError::Storage(_) => ErrorClass::Filesystem,
        AttemptError::ResourceChanged(_) => ErrorClass::ResourceChanged,
        AttemptError::Cancelled => ErrorClass::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_requests_is_a_transient_server_error() {
        let class = failure_class(&AttemptError::Http { status: 429 });
        assert_eq!(class, ErrorClass::Server { status: 429 });
        assert!(class.is_transient());
    }

    #[test]
    fn short_body_is_a_connection_failure() {
        let e = AttemptError::PartialTransfer {
            expected: 100,
            received: 40,
        };
        assert_eq!(failure_class(&e), ErrorClass::Connection);
        assert!(failure_class(&e).is_transient());
    }

    #[test]
    fn disk_errors_are_filesystem_and_final() {
        let e = AttemptError::Storage(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(failure_class(&e), ErrorClass::Filesystem);
        assert!(!failure_class(&e).is_transient());
    }

    #[test]
    fn not_found_and_unsatisfiable_range_keep_their_status() {
        assert_eq!(
            failure_class(&AttemptError::Http { status: 404 }),
            ErrorClass::Server { status: 404 }
        );
        let e = AttemptError::RangeNotSatisfiable {
            complete_length: None,
        };
        assert_eq!(failure_class(&e), ErrorClass::Server { status: 416 });
    }

    #[test]
    fn curl_codes() {
        // CURLE_OPERATION_TIMEDOUT, CURLE_COULDNT_CONNECT, CURLE_URL_MALFORMAT,
        // CURLE_UNSUPPORTED_PROTOCOL, CURLE_ABORTED_BY_CALLBACK
        assert_eq!(failure_class(&AttemptError::Curl(curl::Error::new(28))), ErrorClass::Timeout);
        assert_eq!(failure_class(&AttemptError::Curl(curl::Error::new(7))), ErrorClass::Connection);
        assert_eq!(failure_class(&AttemptError::Curl(curl::Error::new(3))), ErrorClass::InvalidInput);
        assert_eq!(failure_class(&AttemptError::Curl(curl::Error::new(1))), ErrorClass::InvalidInput);
        assert_eq!(failure_class(&AttemptError::Curl(curl::Error::new(42))), ErrorClass::Cancelled);
    }
}
