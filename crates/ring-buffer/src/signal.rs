//! Counting wake-up signal between the producer and consumer halves.

use std::time::Duration;
use tokio::sync::Semaphore;

/// Counting wake-up signal with a bounded permit count.
///
/// Plays the role of a counting semaphore sized to the number of whole
/// samples the byte buffer can hold: the producer gives one unit per
/// committed write, the consumer takes one unit per drain pass. The
/// count is advisory; the consumer must re-check `available()` after
/// every wake, since a saturated signal swallows further units.
pub(crate) struct DataSignal {
    sem: Semaphore,
    depth: usize,
}

impl DataSignal {
    pub(crate) fn new(depth: usize) -> Self {
        Self {
            sem: Semaphore::new(0),
            depth,
        }
    }

    /// Signal one unit available. Saturates at `depth` so the signal
    /// can never run ahead of the byte buffer it mirrors.
    pub(crate) fn notify(&self) {
        if self.sem.available_permits() < self.depth {
            self.sem.add_permits(1);
        }
    }

    /// Wait for at least one unit, bounded by `timeout`. Returns false
    /// on timeout, which is an idle tick rather than an error.
    pub(crate) async fn wait(&self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.sem.acquire()).await {
            Ok(Ok(permit)) => {
                permit.forget();
                true
            }
            // The semaphore is never closed, so the only other outcome
            // is the timeout elapsing.
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_then_wait() {
        let signal = DataSignal::new(4);
        signal.notify();
        assert!(signal.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_wait_times_out_when_idle() {
        let signal = DataSignal::new(4);
        assert!(!signal.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_signal_saturates_at_depth() {
        let signal = DataSignal::new(2);
        signal.notify();
        signal.notify();
        signal.notify();

        assert!(signal.wait(Duration::from_millis(10)).await);
        assert!(signal.wait(Duration::from_millis(10)).await);
        // Third unit was swallowed by the bound.
        assert!(!signal.wait(Duration::from_millis(10)).await);
    }
}
