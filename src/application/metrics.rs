//! Observability metrics for the middlewares.
//!
//! Counts what each middleware did with the records it was handed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters describing middleware behavior.
///
/// All counters use atomic operations, and clones share the same counters.
/// The rate limiter only moves `events_forwarded` and `events_suppressed`.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Records handed to the next sink
    events_forwarded: AtomicU64,
    /// Records dropped as duplicates or for lack of tokens
    events_suppressed: AtomicU64,
    /// Records that failed to encode
    records_rejected: AtomicU64,
    /// Fingerprints reclaimed by the sweeper
    fingerprints_evicted: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_forwarded(&self) {
        self.inner.events_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self) {
        self.inner.events_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: usize) {
        self.inner
            .fingerprints_evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get the total number of records forwarded.
    pub fn events_forwarded(&self) -> u64 {
        self.inner.events_forwarded.load(Ordering::Relaxed)
    }

    /// Get the total number of records suppressed.
    pub fn events_suppressed(&self) -> u64 {
        self.inner.events_suppressed.load(Ordering::Relaxed)
    }

    /// Get the total number of records rejected by the encoder.
    pub fn records_rejected(&self) -> u64 {
        self.inner.records_rejected.load(Ordering::Relaxed)
    }

    /// Get the total number of fingerprints evicted by sweeps.
    pub fn fingerprints_evicted(&self) -> u64 {
        self.inner.fingerprints_evicted.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_forwarded: self.events_forwarded(),
            events_suppressed: self.events_suppressed(),
            records_rejected: self.records_rejected(),
            fingerprints_evicted: self.fingerprints_evicted(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.events_forwarded.store(0, Ordering::Relaxed);
        self.inner.events_suppressed.store(0, Ordering::Relaxed);
        self.inner.records_rejected.store(0, Ordering::Relaxed);
        self.inner.fingerprints_evicted.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Records handed to the next sink
    pub events_forwarded: u64,
    /// Records dropped as duplicates or for lack of tokens
    pub events_suppressed: u64,
    /// Records that failed to encode
    pub records_rejected: u64,
    /// Fingerprints reclaimed by the sweeper
    pub fingerprints_evicted: u64,
}

impl MetricsSnapshot {
    /// Calculate the suppression rate (0.0 to 1.0).
    ///
    /// Rejected records are not counted. Returns 0.0 if nothing was processed.
    pub fn suppression_rate(&self) -> f64 {
        let total = self.total_events();
        if total == 0 {
            0.0
        } else {
            self.events_suppressed as f64 / total as f64
        }
    }

    /// Get the number of records that reached a decision (forwarded + suppressed).
    pub fn total_events(&self) -> u64 {
        self.events_forwarded.saturating_add(self.events_suppressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot {
            events_forwarded: 0,
            events_suppressed: 0,
            records_rejected: 0,
            fingerprints_evicted: 0,
        });
    }

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.record_forwarded();
        metrics.record_forwarded();
        metrics.record_suppressed();
        metrics.record_rejected();
        metrics.record_evictions(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.events_forwarded, 2);
        assert_eq!(snapshot.events_suppressed, 1);
        assert_eq!(snapshot.records_rejected, 1);
        assert_eq!(snapshot.fingerprints_evicted, 4);
    }

    #[test]
    fn test_snapshot_suppression_rate() {
        let metrics = Metrics::new();

        assert_eq!(metrics.snapshot().suppression_rate(), 0.0);

        metrics.record_forwarded();
        assert_eq!(metrics.snapshot().suppression_rate(), 0.0);

        metrics.record_suppressed();
        assert!((metrics.snapshot().suppression_rate() - 0.5).abs() < f64::EPSILON);

        // Rejections don't move the rate
        metrics.record_rejected();
        assert!((metrics.snapshot().suppression_rate() - 0.5).abs() < f64::EPSILON);

        metrics.record_suppressed();
        metrics.record_suppressed();
        assert!((metrics.snapshot().suppression_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_forwarded();
        metrics.record_suppressed();
        metrics.record_rejected();
        metrics.record_evictions(1);

        metrics.reset();
        assert_eq!(metrics.snapshot().total_events(), 0);
        assert_eq!(metrics.records_rejected(), 0);
        assert_eq!(metrics.fingerprints_evicted(), 0);
    }

    #[test]
    fn test_metrics_clone_shares_counters() {
        let metrics1 = Metrics::new();
        metrics1.record_forwarded();

        let metrics2 = metrics1.clone();
        metrics2.record_forwarded();

        assert_eq!(metrics1.events_forwarded(), 2);
        assert_eq!(metrics2.events_forwarded(), 2);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let metrics = Metrics::new();
        let mut handles = vec![];

        for _ in 0..10 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.record_forwarded();
                    m.record_suppressed();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.events_forwarded(), 1000);
        assert_eq!(metrics.events_suppressed(), 1000);
    }
}
