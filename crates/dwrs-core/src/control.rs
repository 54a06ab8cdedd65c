//! Run-wide cancellation.
//!
//! One `RunControl` is shared by the orchestrator, the scheduler and every
//! transfer unit. The scheduler stops dispatching as soon as it is cancelled;
//! running transfers stop at the next chunk boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Polling step used while sleeping in a cancellable way.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Shared cancellation token for one run. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancelled: Arc<AtomicBool>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the whole run (e.g. on Ctrl-C).
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            tracing::info!("run cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Sleeps for `duration` unless the run is cancelled first.
    /// Returns false if the sleep was cut short by cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return true;
            }
            tokio::time::sleep((deadline - now).min(CANCEL_POLL)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_shared_between_clones() {
        let control = RunControl::new();
        let other = control.clone();
        assert!(!other.is_cancelled());
        control.cancel();
        assert!(other.is_cancelled());
    }

    #[tokio::test]
    async fn sleep_completes_when_not_cancelled() {
        let control = RunControl::new();
        assert!(control.sleep(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn sleep_is_cut_short_by_cancel() {
        let control = RunControl::new();
        let other = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            other.cancel();
        });
        let started = std::time::Instant::now();
        assert!(!control.sleep(Duration::from_secs(30)).await);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
