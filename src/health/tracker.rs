//! Per-host connection score.

use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::observability::metrics;

/// Signed success/failure score for every host this process has dialed.
///
/// Entries are created lazily on first observation and never removed.
#[derive(Debug, Default)]
pub struct HostHealthTracker {
    scores: DashMap<String, AtomicI64>,
}

impl HostHealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful connection to `host`.
    pub fn record_success(&self, host: &str) -> i64 {
        self.adjust(host, 1)
    }

    /// Record a failed connection attempt to `host`.
    pub fn record_failure(&self, host: &str) -> i64 {
        self.adjust(host, -1)
    }

    /// Current score, zero for hosts never observed.
    pub fn score(&self, host: &str) -> i64 {
        self.scores
            .get(host)
            .map(|s| s.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// A host is preferred while its score is nonnegative.
    pub fn is_preferred(&self, host: &str) -> bool {
        self.score(host) >= 0
    }

    /// Snapshot of every known host and its score.
    pub fn snapshot(&self) -> Vec<(String, i64)> {
        self.scores
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect()
    }

    fn adjust(&self, host: &str, delta: i64) -> i64 {
        // Fast path avoids allocating the key for hosts already present.
        let updated = match self.scores.get(host) {
            Some(score) => score.fetch_add(delta, Ordering::Relaxed) + delta,
            None => self
                .scores
                .entry(host.to_string())
                .or_insert_with(|| AtomicI64::new(0))
                .fetch_add(delta, Ordering::Relaxed)
                + delta,
        };
        metrics::record_host_score(host, updated);
        updated
    }
}
