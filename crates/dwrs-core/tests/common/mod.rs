#![allow(dead_code)]

pub mod range_server;

use std::time::Duration;

use dwrs_core::retry::RetryPolicy;
use dwrs_core::transfer::TransferSettings;

/// Settings with short backoff so retry tests stay fast.
pub fn fast_settings() -> TransferSettings {
    TransferSettings {
        connect_timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        },
        ..TransferSettings::default()
    }
}

/// Deterministic body of `len` bytes.
pub fn body(len: usize) -> Vec<u8> {
    (0u8..251).cycle().take(len).collect()
}
