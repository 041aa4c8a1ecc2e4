//! Cooperative cancellation for job tracking.
//!
//! A screen creates one [`CancelToken`] per tracked job, hands a clone to
//! the tracker, and fires it on unmount or when the operator dismisses the
//! progress dialog. Cancelling stops the client-side poll loop; it never
//! cancels the job on the server.

use std::sync::Arc;
use tokio::sync::watch;

/// Clonable cancellation handle.
///
/// All clones observe the same flag. Cancellation is sticky: once fired it
/// cannot be reset, and a token that is already cancelled resolves
/// [`CancelToken::cancelled`] immediately.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelToken { tx: Arc::new(tx) }
    }

    /// Fire the token. Idempotent.
    pub fn cancel(&self) {
        // send_replace stores the flag even with zero receivers; a waiter
        // that subscribes later still observes the cancellation.
        self.tx.send_replace(true);
    }

    /// True if the token has been fired.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve when the token fires. Pends forever if it never does.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        if *rx.borrow() {
            return;
        }
        // The sender cannot drop while `self` holds it, so `changed` only
        // resolves on an actual flag flip.
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn starts_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_is_observed_by_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
        // Already-cancelled token resolves immediately
        clone.cancelled().await;
    }

    #[tokio::test]
    async fn cancelled_wakes_pending_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancel_with_no_subscribers_is_not_lost() {
        // A screen may unmount before the tracker reaches its first
        // cancellation await; the flag must survive until someone looks.
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());

        let late_waiter = token.clone();
        late_waiter.cancelled().await;
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
