//! Sliding-window access counter.
//!
//! # Responsibilities
//! - Track per-key access instants over a trailing window
//! - Decide whether a new access fits within the policy limit
//! - Report remaining quota and time until the window frees up
//!
//! # Design Decisions
//! - Sliding window, not fixed intervals: the window trails `now`
//! - Check-then-record: a rejected attempt is never logged
//! - One shard lock (DashMap) covers trim, check and append for a key
//! - Uses the tokio clock so tests can pause and advance time

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// How many requests a key may make over a trailing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    limit: u32,
    period: Duration,
}

impl Policy {
    /// Create a policy allowing `limit` requests per `period`.
    ///
    /// Both values must be non-zero.
    pub fn new(limit: u32, period: Duration) -> Result<Self, Error> {
        if limit == 0 || period.is_zero() {
            return Err(Error::InvalidPolicy {
                limit,
                period_ms: period.as_millis(),
            });
        }
        Ok(Self { limit, period })
    }

    /// Shorthand for a period expressed in whole seconds.
    pub fn per_seconds(limit: u32, secs: u64) -> Result<Self, Error> {
        Self::new(limit, Duration::from_secs(secs))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}s", self.limit, self.period.as_secs_f64())
    }
}

/// Outcome of a single [`WindowStore::grant`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantResult {
    /// Whether the access was admitted.
    pub granted: bool,
    /// Accesses left in the current window after this one.
    pub remaining: u32,
    /// Seconds until the oldest logged access leaves the window.
    pub reset_secs: u64,
}

/// Storage backend for admission decisions.
///
/// Implementations must make trim, check and record atomic per key.
pub trait WindowStore: Send + Sync {
    /// Decide whether `key` may make another access under `policy`.
    fn grant(&self, key: &str, policy: Policy) -> GrantResult;
}

/// In-process store; all state is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    logs: DashMap<String, VecDeque<Instant>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with at least one logged access.
    pub fn tracked_keys(&self) -> usize {
        self.logs.len()
    }

    /// Number of accesses currently logged for `key`.
    pub fn logged(&self, key: &str) -> usize {
        self.logs.get(key).map(|log| log.len()).unwrap_or(0)
    }

    /// Drop logs whose newest access is at least `max_period` old.
    ///
    /// `max_period` should be the longest period any policy uses, otherwise
    /// still-relevant history is discarded.
    pub fn purge_idle(&self, max_period: Duration) -> usize {
        let now = Instant::now();
        let before = self.logs.len();
        self.logs.retain(|_, log| match log.back() {
            Some(newest) => now.duration_since(*newest) < max_period,
            None => false,
        });
        let purged = before.saturating_sub(self.logs.len());
        if purged > 0 {
            tracing::debug!(purged, remaining = self.logs.len(), "Purged idle rate limit keys");
        }
        purged
    }

    /// Run [`purge_idle`](Self::purge_idle) every `every` until `cancel` fires.
    pub fn spawn_purge_task(
        self: Arc<Self>,
        every: Duration,
        max_period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let every = every.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.purge_idle(max_period);
                    }
                }
            }
        })
    }
}

impl WindowStore for MemoryStore {
    fn grant(&self, key: &str, policy: Policy) -> GrantResult {
        let now = Instant::now();

        // The entry guard holds the shard lock until the end of this scope.
        let mut log = self.logs.entry(key.to_owned()).or_default();

        while let Some(oldest) = log.front() {
            if now.duration_since(*oldest) < policy.period {
                break;
            }
            log.pop_front();
        }

        let count = log.len();
        let limit = policy.limit as usize;
        let (granted, remaining) = if count < limit {
            log.push_back(now);
            (true, (limit - count - 1) as u32)
        } else {
            (false, 0)
        };

        let reset_secs = log
            .front()
            .map(|oldest| {
                let left = policy.period.saturating_sub(now.duration_since(*oldest));
                left.as_secs_f64().ceil() as u64
            })
            .unwrap_or(0);

        GrantResult {
            granted,
            remaining,
            reset_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(limit: u32, secs: u64) -> Policy {
        Policy::per_seconds(limit, secs).unwrap()
    }

    #[test]
    fn policy_rejects_zero_values() {
        assert!(Policy::new(0, Duration::from_secs(1)).is_err());
        assert!(Policy::new(1, Duration::ZERO).is_err());
        assert_eq!(policy(3, 10).limit(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_counts_down_to_zero() {
        let store = MemoryStore::new();
        let p = policy(5, 60);

        for want in (0..5).rev() {
            let res = store.grant("k", p);
            assert!(res.granted);
            assert_eq!(res.remaining, want);
            assert_eq!(res.reset_secs, 60);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_does_not_consume_capacity() {
        let store = MemoryStore::new();
        let p = policy(2, 10);

        store.grant("k", p);
        store.grant("k", p);
        for _ in 0..3 {
            let res = store.grant("k", p);
            assert!(!res.granted);
            assert_eq!(res.remaining, 0);
        }
        assert_eq!(store.logged("k"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides() {
        let store = MemoryStore::new();
        let p = policy(2, 10);

        assert!(store.grant("k", p).granted);
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store.grant("k", p).granted);

        let res = store.grant("k", p);
        assert!(!res.granted);
        assert_eq!(res.reset_secs, 4);

        // Only the first access has left the window.
        tokio::time::advance(Duration::from_secs(5)).await;
        let res = store.grant("k", p);
        assert!(res.granted);
        assert_eq!(res.remaining, 0);
        assert_eq!(res.reset_secs, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_limit_two_period_two() {
        let store = MemoryStore::new();
        let p = policy(2, 2);

        let first = store.grant("test", p);
        assert_eq!((first.granted, first.remaining), (true, 1));
        let second = store.grant("test", p);
        assert_eq!((second.granted, second.remaining), (true, 0));
        let third = store.grant("test", p);
        assert_eq!((third.granted, third.remaining, third.reset_secs), (false, 0, 2));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.grant("test", p).reset_secs, 1);

        tokio::time::advance(Duration::from_millis(1100)).await;
        let fourth = store.grant("test", p);
        assert_eq!((fourth.granted, fourth.remaining), (true, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let store = MemoryStore::new();
        let p = policy(1, 30);

        assert!(store.grant("a", p).granted);
        assert!(!store.grant("a", p).granted);

        let b = store.grant("b", p);
        assert!(b.granted);
        assert_eq!(b.remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_idle_drops_stale_keys() {
        let store = MemoryStore::new();
        let p = policy(3, 5);

        store.grant("old", p);
        tokio::time::advance(Duration::from_secs(10)).await;
        store.grant("new", p);

        assert_eq!(store.purge_idle(Duration::from_secs(5)), 1);
        assert_eq!(store.tracked_keys(), 1);
        assert_eq!(store.logged("new"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_task_runs_until_cancelled() {
        let store = Arc::new(MemoryStore::new());
        let cancel = CancellationToken::new();
        store.grant("k", policy(1, 1));

        let task = store.clone().spawn_purge_task(
            Duration::from_secs(10),
            Duration::from_secs(1),
            cancel.clone(),
        );
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(store.tracked_keys(), 0);

        cancel.cancel();
        task.await.unwrap();
    }

    #[test]
    fn concurrent_grants_are_exact() {
        let store = Arc::new(MemoryStore::new());
        let p = policy(25, 3600);
        let granted = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|s| {
            for _ in 0..100 {
                let store = store.clone();
                let granted = granted.clone();
                let rejected = rejected.clone();
                s.spawn(move || {
                    if store.grant("shared", p).granted {
                        granted.fetch_add(1, Ordering::SeqCst);
                    } else {
                        rejected.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(granted.load(Ordering::SeqCst), 25);
        assert_eq!(rejected.load(Ordering::SeqCst), 75);
        assert_eq!(store.logged("shared"), 25);
    }
}
