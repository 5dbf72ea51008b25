//! Suppression decisions for repeated records.
//!
//! The filter decides whether a fingerprint should be forwarded or suppressed
//! based on when it was last forwarded, and keeps the expiry store current.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, ExpiryStore};
use std::sync::Arc;
use std::time::Duration;

/// How often stale fingerprints are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Age after which a fingerprint is reclaimed, regardless of the suppression window.
pub const EXPIRE_AFTER: Duration = Duration::from_secs(60);

/// Decision about how to handle a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupeDecision {
    /// Hand the record to the next sink
    Forward,
    /// Drop the record as a recent duplicate
    Suppress,
}

impl DedupeDecision {
    /// Check if this decision is Forward.
    pub fn is_forward(&self) -> bool {
        matches!(self, DedupeDecision::Forward)
    }

    /// Check if this decision is Suppress.
    pub fn is_suppress(&self) -> bool {
        matches!(self, DedupeDecision::Suppress)
    }
}

/// Cadence of the background sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSchedule {
    /// Time between sweeps
    pub interval: Duration,
    /// Entries older than this are removed
    pub expire_after: Duration,
}

impl Default for SweepSchedule {
    fn default() -> Self {
        Self {
            interval: SWEEP_INTERVAL,
            expire_after: EXPIRE_AFTER,
        }
    }
}

/// Decides forward-or-suppress for fingerprints.
///
/// Generic over the store so alternative backends can be plugged in.
/// In production, use `Arc<ShardedStorage>`.
#[derive(Debug, Clone)]
pub struct DedupeFilter<S>
where
    S: ExpiryStore,
{
    store: S,
    clock: Arc<dyn Clock>,
    window: Duration,
    metrics: Metrics,
}

impl<S> DedupeFilter<S>
where
    S: ExpiryStore,
{
    /// Create a filter that suppresses repeats within `window`.
    pub fn new(store: S, clock: Arc<dyn Clock>, window: Duration, metrics: Metrics) -> Self {
        Self {
            store,
            clock,
            window,
            metrics,
        }
    }

    /// Decide whether the record with this fingerprint should be forwarded.
    ///
    /// A fingerprint is suppressed only if it was forwarded strictly less
    /// than `window` ago. On `Forward` the store is updated before returning,
    /// so the caller's later forward outcome does not affect bookkeeping.
    ///
    /// Lookup and update are not atomic: two callers racing on a fingerprint
    /// that is not yet stored can both be told to forward.
    pub fn check(&self, fingerprint: &str) -> DedupeDecision {
        let now = self.clock.now();

        if let Some(last) = self.store.lookup(fingerprint) {
            if now.saturating_duration_since(last) < self.window {
                self.metrics.record_suppressed();
                return DedupeDecision::Suppress;
            }
        }

        self.store.record(fingerprint, now);
        self.metrics.record_forwarded();
        DedupeDecision::Forward
    }

    /// Remove fingerprints older than `expire_after`.
    ///
    /// # Returns
    /// The number of fingerprints removed
    pub fn sweep(&self, expire_after: Duration) -> usize {
        let evicted = self.store.sweep(self.clock.now(), expire_after);
        self.metrics.record_evictions(evicted);
        evicted
    }

    /// Get the suppression window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use crate::infrastructure::storage::ShardedStorage;
    use std::time::Instant;

    fn filter(window: Duration) -> (DedupeFilter<Arc<ShardedStorage>>, MockClock) {
        let clock = MockClock::new(Instant::now());
        let filter = DedupeFilter::new(
            Arc::new(ShardedStorage::new()),
            Arc::new(clock.clone()),
            window,
            Metrics::new(),
        );
        (filter, clock)
    }

    #[test]
    fn test_first_occurrence_forwards() {
        let (filter, _clock) = filter(Duration::from_secs(1));
        assert_eq!(filter.check("msg=hello\n"), DedupeDecision::Forward);
        assert_eq!(filter.store().len(), 1);
    }

    #[test]
    fn test_repeat_within_window_suppressed() {
        let (filter, clock) = filter(Duration::from_secs(1));
        assert!(filter.check("msg=hello\n").is_forward());

        clock.advance(Duration::from_millis(999));
        assert!(filter.check("msg=hello\n").is_suppress());
    }

    #[test]
    fn test_window_boundary_forwards() {
        let (filter, clock) = filter(Duration::from_secs(1));
        assert!(filter.check("msg=hello\n").is_forward());

        // Elapsed == window is not strictly less, so it forwards
        clock.advance(Duration::from_secs(1));
        assert!(filter.check("msg=hello\n").is_forward());
    }

    #[test]
    fn test_suppression_does_not_refresh_timestamp() {
        let (filter, clock) = filter(Duration::from_secs(1));
        assert!(filter.check("k=v\n").is_forward());

        clock.advance(Duration::from_millis(600));
        assert!(filter.check("k=v\n").is_suppress());

        // 1.2s after the forward, even though a suppression happened at 0.6s
        clock.advance(Duration::from_millis(600));
        assert!(filter.check("k=v\n").is_forward());
    }

    #[test]
    fn test_zero_window_never_suppresses() {
        let (filter, _clock) = filter(Duration::ZERO);
        for _ in 0..5 {
            assert!(filter.check("k=v\n").is_forward());
        }
    }

    #[test]
    fn test_distinct_fingerprints_independent() {
        let (filter, _clock) = filter(Duration::from_secs(60));
        assert!(filter.check("a=1 b=2\n").is_forward());
        assert!(filter.check("b=2 a=1\n").is_forward());
        assert!(filter.check("a=1 b=2\n").is_suppress());
    }

    #[test]
    fn test_sweep_reclaims_stale_entries() {
        let (filter, clock) = filter(Duration::from_secs(300));
        assert!(filter.check("old\n").is_forward());

        clock.advance(Duration::from_secs(30));
        assert!(filter.check("young\n").is_forward());

        clock.advance(Duration::from_secs(31));
        assert_eq!(filter.sweep(EXPIRE_AFTER), 1);
        assert_eq!(filter.store().len(), 1);
        assert_eq!(filter.metrics().fingerprints_evicted(), 1);

        // Reclaimed even though the window is longer than the expiry threshold
        assert!(filter.check("old\n").is_forward());
        assert!(filter.check("young\n").is_suppress());
    }

    #[test]
    fn test_metrics_follow_decisions() {
        let (filter, _clock) = filter(Duration::from_secs(1));
        for _ in 0..4 {
            filter.check("k=v\n");
        }

        let snapshot = filter.metrics().snapshot();
        assert_eq!(snapshot.events_forwarded, 1);
        assert_eq!(snapshot.events_suppressed, 3);
    }

    #[test]
    fn test_default_schedule() {
        let schedule = SweepSchedule::default();
        assert_eq!(schedule.interval, Duration::from_secs(10));
        assert_eq!(schedule.expire_after, Duration::from_secs(60));
    }
}
