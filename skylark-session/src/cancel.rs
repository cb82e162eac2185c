//! Cooperative cancellation

use skylark_core::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Polling interval for cancellable waits
const POLL_SLICE: Duration = Duration::from_millis(200);

/// Shared cancellation flag.
///
/// Clones observe the same flag. Long waits are built from short sleeps that
/// poll the flag, so cancellation is observed within one slice.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Error out of the current operation if cancelled
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled(operation.to_string()));
        }
        Ok(())
    }

    /// Sleep up to `duration`, waking early on cancellation.
    ///
    /// Returns true when the full duration elapsed, false when cancelled.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        while remaining > Duration::ZERO {
            if self.is_cancelled() {
                return false;
            }
            let slice = remaining.min(POLL_SLICE);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
        }
        !self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_completes_when_not_cancelled() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn sleep_wakes_early_on_cancel() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.sleep(Duration::from_secs(60)).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let start = std::time::Instant::now();
        let completed = handle.await.unwrap();
        assert!(!completed);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn check_errors_after_cancel() {
        let token = CancelToken::new();
        assert!(token.check("scan").is_ok());
        token.cancel();
        assert!(matches!(token.check("scan"), Err(Error::Cancelled(_))));
    }
}
