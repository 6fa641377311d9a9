//! Shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// One-shot shutdown trigger shared by every long-running task.
///
/// Any number of sources may call [`trigger`](Shutdown::trigger); only the
/// first has an effect.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns `true` only for the call that fired it.
    pub fn trigger(&self, source: &str) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            tracing::debug!(source, "Shutdown already triggered");
            return false;
        }
        tracing::info!(source, "Shutdown triggered");
        self.token.cancel();
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }

    /// Token for tasks that take a [`CancellationToken`] directly.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_trigger_wins() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        assert!(!shutdown.is_triggered());

        assert!(other.trigger("test"));
        assert!(!shutdown.trigger("signal"));
        assert!(shutdown.is_triggered());
        shutdown.triggered().await;
    }

    #[tokio::test]
    async fn concurrent_triggers_fire_once() {
        let shutdown = Shutdown::new();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let s = shutdown.clone();
                tokio::spawn(async move { s.trigger("race") })
            })
            .collect();

        let mut fired = 0;
        for h in handles {
            if h.await.unwrap() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }
}
