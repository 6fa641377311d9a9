//! Lifecycle state machine.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::observability::metrics;

/// Where a server is in its life. Ordered: later states compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    /// Nothing bound yet.
    Created = 0,
    /// Listeners bound and serving tasks running.
    Listening = 1,
    /// Shutdown triggered; draining in-flight requests.
    ShuttingDown = 2,
    /// Primary socket closed. Terminal.
    Stopped = 3,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Listening => write!(f, "listening"),
            Self::ShuttingDown => write!(f, "shutting_down"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Shared, forward-only lifecycle state.
#[derive(Debug, Clone)]
pub(crate) struct StateCell {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Created);
        Self { tx: Arc::new(tx) }
    }

    pub(crate) fn get(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Move to `to` if it is ahead of the current state.
    ///
    /// Returns `true` for the single call that performs the transition.
    pub(crate) fn advance(&self, to: LifecycleState) -> bool {
        let mut from = LifecycleState::Created;
        let moved = self.tx.send_if_modified(|state| {
            if *state < to {
                from = *state;
                *state = to;
                true
            } else {
                false
            }
        });
        if moved {
            tracing::info!(from = %from, to = %to, "Lifecycle transition");
            metrics::record_lifecycle_state(to);
        }
        moved
    }
}
