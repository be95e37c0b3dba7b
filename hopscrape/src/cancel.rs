//! Cooperative cancellation for hop negotiation and command collection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shared cancellation flag checked on every poll tick.
///
/// Clones observe the same flag. Cancelling never interrupts a write in
/// flight; the next poll notices it and returns.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleep for `duration`, waking early if cancelled.
    pub async fn sleep(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancelled() => {}
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A fresh [`CancelToken`] wired to an external trigger for the lifetime
/// of the guard.
///
/// Each interactive action arms its own guard, so a trigger that fired
/// during one action does not leave the next one pre-cancelled. Dropping
/// the guard disarms the trigger.
#[derive(Debug)]
pub struct ScopedCancel {
    token: CancelToken,
    watcher: JoinHandle<()>,
}

impl ScopedCancel {
    /// Cancel a new token once `trigger` resolves.
    pub fn arm<F>(trigger: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancelToken::new();
        let fire = token.clone();
        let watcher = tokio::spawn(async move {
            trigger.await;
            fire.cancel();
        });
        Self { token, watcher }
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for ScopedCancel {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
