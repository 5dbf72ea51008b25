//! Deduplicating sink middleware.
//!
//! Provides a [`Sink`] that forwards each distinct record at most once per
//! suppression window and reclaims stale fingerprints in the background.

use crate::application::{
    dedupe::{DedupeDecision, DedupeFilter, SweepSchedule},
    error::LogError,
    metrics::Metrics,
    ports::{Clock, ExpiryStore, Sink},
};
use crate::domain::value::Value;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::encoder::FingerprintEncoder;
use crate::infrastructure::pool::DEFAULT_POOL_SIZE;
use crate::infrastructure::storage::ShardedStorage;
use crate::infrastructure::sweeper::Sweeper;

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Error returned when building a [`Deduper`] fails.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The sweep interval must be greater than zero
    #[error("sweep interval must be greater than 0")]
    ZeroSweepInterval,
    /// The background sweeper thread could not be started
    #[error("failed to spawn sweeper thread: {0}")]
    SpawnSweeper(#[source] io::Error),
}

/// Error returned when shutting down a [`Deduper`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShutdownError {
    /// The sweeper thread panicked before it could exit cleanly
    #[error("sweeper thread panicked")]
    SweeperPanicked,
}

/// Builder for constructing a [`Deduper`].
pub struct DeduperBuilder<N, S = Arc<ShardedStorage>> {
    next: N,
    store: S,
    window: Duration,
    clock: Option<Arc<dyn Clock>>,
    pool_size: usize,
    schedule: SweepSchedule,
}

impl<N, S> DeduperBuilder<N, S>
where
    N: Sink,
    S: ExpiryStore + Clone + 'static,
{
    /// Set how long repeats of a forwarded record are suppressed.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a different fingerprint store.
    ///
    /// The store is shared with the sweeper thread, so it must be cheap to
    /// clone; wrap it in an `Arc` (see [`ShardedStorage`]).
    pub fn with_store<T>(self, store: T) -> DeduperBuilder<N, T>
    where
        T: ExpiryStore + Clone + 'static,
    {
        DeduperBuilder {
            next: self.next,
            store,
            window: self.window,
            clock: self.clock,
            pool_size: self.pool_size,
            schedule: self.schedule,
        }
    }

    /// Set how many idle encoding buffers are kept for reuse.
    ///
    /// Default: 64
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Override the sweep cadence.
    ///
    /// Production code always sweeps every 10 seconds and reclaims entries
    /// older than 60 seconds; this hook exists so tests don't have to wait.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn with_sweep_schedule(mut self, interval: Duration, expire_after: Duration) -> Self {
        self.schedule = SweepSchedule {
            interval,
            expire_after,
        };
        self
    }

    /// Build the deduper and start its sweeper thread.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid or the sweeper
    /// thread cannot be spawned.
    pub fn build(self) -> Result<Deduper<N, S>, BuildError> {
        if self.schedule.interval.is_zero() {
            return Err(BuildError::ZeroSweepInterval);
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let filter = DedupeFilter::new(self.store, clock, self.window, Metrics::new());
        let sweeper =
            Sweeper::spawn(filter.clone(), self.schedule).map_err(BuildError::SpawnSweeper)?;

        Ok(Deduper {
            next: self.next,
            encoder: FingerprintEncoder::new(self.pool_size),
            filter,
            sweeper,
        })
    }
}

/// A [`Sink`] that suppresses repeated records.
///
/// Each record is encoded to its logfmt fingerprint. A record whose
/// fingerprint was forwarded less than `window` ago is dropped; anything else
/// is forwarded unchanged to the next sink.
///
/// Fingerprints untouched for a minute are reclaimed by a background thread
/// that sweeps every ten seconds, whatever the window.
///
/// # Example
///
/// ```
/// use kvlog_throttle::{keyvals, Deduper, Sink};
/// use kvlog_throttle::infrastructure::mocks::CountingSink;
/// use std::time::Duration;
///
/// let counter = CountingSink::new();
/// let deduper = Deduper::new(counter.clone(), Duration::from_secs(1));
///
/// for _ in 0..10 {
///     deduper.log(&keyvals!["msg", "hello"]).unwrap();
/// }
/// assert_eq!(counter.count(), 1);
///
/// deduper.stop();
/// ```
///
/// # Concurrency
///
/// `log` may be called from any number of threads. Two threads logging a
/// brand-new record at the same moment may both forward it: suppression is
/// best-effort, not exactly-once.
pub struct Deduper<N, S = Arc<ShardedStorage>>
where
    S: ExpiryStore,
{
    next: N,
    encoder: FingerprintEncoder,
    filter: DedupeFilter<S>,
    sweeper: Sweeper,
}

impl<N> Deduper<N>
where
    N: Sink,
{
    /// Create a builder forwarding to `next`.
    ///
    /// Defaults:
    /// - Window: 1 second
    /// - Store: a fresh `ShardedStorage`
    /// - Clock: system clock
    /// - Encoding buffer pool: 64 idle buffers
    pub fn builder(next: N) -> DeduperBuilder<N> {
        DeduperBuilder {
            next,
            store: Arc::new(ShardedStorage::new()),
            window: Duration::from_secs(1),
            clock: None,
            pool_size: DEFAULT_POOL_SIZE,
            schedule: SweepSchedule::default(),
        }
    }

    /// Create a deduper forwarding to `next`, suppressing repeats for `window`.
    ///
    /// # Panics
    /// Panics if the operating system refuses to spawn the sweeper thread.
    /// Use [`Deduper::builder`] to handle that case.
    pub fn new(next: N, window: Duration) -> Self {
        Self::builder(next)
            .with_window(window)
            .build()
            .expect("failed to start deduper sweeper thread")
    }
}

impl<N, S> Deduper<N, S>
where
    N: Sink,
    S: ExpiryStore,
{
    /// Stop the background sweeper.
    ///
    /// Safe to call more than once. Does not wait for the thread to exit, and
    /// `log` keeps working afterwards against the fingerprints already stored.
    pub fn stop(&self) {
        if self.sweeper.stop() {
            tracing::trace!("deduper stopped");
        }
    }

    /// Stop the background sweeper and wait for its thread to exit.
    ///
    /// # Errors
    /// Returns `ShutdownError::SweeperPanicked` if the thread panicked.
    pub fn shutdown(&self) -> Result<(), ShutdownError> {
        self.sweeper.join()
    }

    /// Check if the sweeper has been told to stop.
    pub fn is_stopped(&self) -> bool {
        self.sweeper.is_stopped()
    }

    /// Get the suppression window.
    pub fn window(&self) -> Duration {
        self.filter.window()
    }

    /// Get the number of fingerprints currently tracked.
    pub fn seen_count(&self) -> usize {
        self.filter.store().len()
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        self.filter.metrics()
    }

    /// Get a reference to the next sink.
    pub fn next(&self) -> &N {
        &self.next
    }
}

impl<N, S> Sink for Deduper<N, S>
where
    N: Sink,
    S: ExpiryStore,
{
    fn log(&self, record: &[Value<'_>]) -> Result<(), LogError> {
        let decision = match self
            .encoder
            .with_encoded(record, |fingerprint| self.filter.check(fingerprint))
        {
            Ok(decision) => decision,
            Err(err) => {
                self.filter.metrics().record_rejected();
                tracing::warn!(error = %err, "rejecting record that cannot be fingerprinted");
                return Err(err.into());
            }
        };

        match decision {
            DedupeDecision::Forward => self.next.log(record),
            DedupeDecision::Suppress => Ok(()),
        }
    }
}

impl<N, S> Drop for Deduper<N, S>
where
    S: ExpiryStore,
{
    fn drop(&mut self) {
        self.sweeper.stop();
    }
}

impl<N, S> fmt::Debug for Deduper<N, S>
where
    S: ExpiryStore,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deduper")
            .field("window", &self.filter.window())
            .field("seen", &self.filter.store().len())
            .field("stopped", &self.sweeper.is_stopped())
            .finish_non_exhaustive()
    }
}
