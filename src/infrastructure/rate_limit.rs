//! Token bucket sink middleware.
//!
//! Uses the `governor` crate's GCRA implementation, which behaves like a
//! token bucket refilled continuously at the configured rate.

use crate::application::{error::LogError, metrics::Metrics, ports::Sink};
use crate::domain::value::Value;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// What backs a [`RateLimited`] sink.
enum Bucket {
    /// A real token bucket
    Limited(DirectLimiter),
    /// Rate too high to meter: every record passes
    Unlimited,
    /// Burst of zero tokens: every record is dropped
    Closed,
}

impl Bucket {
    fn for_rate(per_second: f64) -> Self {
        // Also catches NaN.
        if !(per_second >= 1.0) {
            return Bucket::Closed;
        }

        let burst = per_second.trunc();
        if burst > f64::from(u32::MAX) {
            return Bucket::Unlimited;
        }
        let Some(burst) = NonZeroU32::new(burst as u32) else {
            return Bucket::Closed;
        };

        // Periods under one nanosecond round to zero, which governor rejects.
        let period = Duration::from_secs_f64(1.0 / per_second);
        match Quota::with_period(period) {
            Some(quota) => Bucket::Limited(RateLimiter::direct(quota.allow_burst(burst))),
            None => Bucket::Unlimited,
        }
    }

    fn allow(&self) -> bool {
        match self {
            Bucket::Limited(limiter) => limiter.check().is_ok(),
            Bucket::Unlimited => true,
            Bucket::Closed => false,
        }
    }
}

/// A [`Sink`] that forwards at most `per_second` records per second.
///
/// The bucket holds `trunc(per_second)` tokens and starts full. Each record
/// takes one token; records arriving with the bucket empty are dropped
/// without an error.
///
/// Any rate is accepted. A rate whose burst truncates to zero (anything below
/// 1, negative, or NaN) drops every record. An infinite rate, or one too high
/// to express as a refill period, forwards every record.
///
/// # Example
///
/// ```
/// use kvlog_throttle::{keyvals, RateLimited, Sink};
/// use kvlog_throttle::infrastructure::mocks::CountingSink;
///
/// let counter = CountingSink::new();
/// let limited = RateLimited::new(counter.clone(), 5.0);
///
/// for i in 0..20 {
///     limited.log(&keyvals!["msg", "tick", "i", i]).unwrap();
/// }
/// assert!(counter.count() <= 5);
/// ```
pub struct RateLimited<N> {
    next: N,
    bucket: Bucket,
    per_second: f64,
    metrics: Metrics,
}

impl<N> RateLimited<N>
where
    N: Sink,
{
    /// Create a rate limiter forwarding to `next`.
    pub fn new(next: N, per_second: f64) -> Self {
        Self {
            next,
            bucket: Bucket::for_rate(per_second),
            per_second,
            metrics: Metrics::new(),
        }
    }

    /// Get the configured rate in events per second.
    pub fn per_second(&self) -> f64 {
        self.per_second
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Get a reference to the next sink.
    pub fn next(&self) -> &N {
        &self.next
    }
}

impl<N> Sink for RateLimited<N>
where
    N: Sink,
{
    fn log(&self, record: &[Value<'_>]) -> Result<(), LogError> {
        if !self.bucket.allow() {
            self.metrics.record_suppressed();
            return Ok(());
        }

        self.metrics.record_forwarded();
        self.next.log(record)
    }
}

impl<N> fmt::Debug for RateLimited<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bucket = match self.bucket {
            Bucket::Limited(_) => "limited",
            Bucket::Unlimited => "unlimited",
            Bucket::Closed => "closed",
        };
        f.debug_struct("RateLimited")
            .field("per_second", &self.per_second)
            .field("bucket", &bucket)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::{CountingSink, FailingSink};
    use crate::keyvals;
    use std::thread;

    fn forwarded_of(per_second: f64, calls: usize) -> usize {
        let counter = CountingSink::new();
        let limited = RateLimited::new(counter.clone(), per_second);
        for i in 0..calls {
            assert!(limited.log(&keyvals!["msg", "x", "i", i]).is_ok());
        }
        counter.count()
    }

    #[test]
    fn test_burst_then_drop() {
        let counter = CountingSink::new();
        let limited = RateLimited::new(counter.clone(), 5.0);

        for _ in 0..20 {
            limited.log(&keyvals!["msg", "hello"]).unwrap();
        }

        assert!(counter.count() >= 1);
        assert!(counter.count() <= 5);
        assert_eq!(
            limited.metrics().events_forwarded() + limited.metrics().events_suppressed(),
            20
        );
    }

    #[test]
    fn test_refills_over_time() {
        let counter = CountingSink::new();
        let limited = RateLimited::new(counter.clone(), 10.0);

        for _ in 0..10 {
            limited.log(&keyvals!["msg", "x"]).unwrap();
        }
        let drained = counter.count();
        limited.log(&keyvals!["msg", "x"]).unwrap();

        // One token every 100ms
        thread::sleep(Duration::from_millis(250));
        limited.log(&keyvals!["msg", "x"]).unwrap();

        assert!(counter.count() > drained);
    }

    #[test]
    fn test_zero_burst_drops_everything() {
        for rate in [0.0, 0.5, 0.999, -3.0, f64::NAN, f64::NEG_INFINITY] {
            assert_eq!(forwarded_of(rate, 10), 0, "rate {} should drop all", rate);
        }
    }

    #[test]
    fn test_unmeterable_rate_passes_everything() {
        for rate in [f64::INFINITY, 1e12, f64::MAX] {
            assert_eq!(forwarded_of(rate, 100), 100, "rate {} should pass all", rate);
        }
    }

    #[test]
    fn test_rate_of_one_allows_single_burst() {
        assert_eq!(forwarded_of(1.0, 10), 1);
    }

    #[test]
    fn test_fractional_rate_truncates_burst() {
        let counter = CountingSink::new();
        let limited = RateLimited::new(counter.clone(), 2.9);

        for _ in 0..10 {
            limited.log(&keyvals!["msg", "x"]).unwrap();
        }

        assert!(counter.count() <= 2);
        assert_eq!(limited.per_second(), 2.9);
    }

    #[test]
    fn test_passes_through_forwarding_errors() {
        let failing = FailingSink::new();
        let limited = RateLimited::new(failing.clone(), 100.0);

        let err = limited.log(&keyvals!["msg", "x"]).unwrap_err();
        assert!(err.is_forwarding());
        assert_eq!(failing.attempts(), 1);
    }

    #[test]
    fn test_does_not_validate_records() {
        // The limiter never encodes, so malformed records reach the next sink
        let counter = CountingSink::new();
        let limited = RateLimited::new(counter.clone(), 1.0);

        limited.log(&keyvals!["orphan"]).unwrap();
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_debug_names_bucket() {
        let closed = format!("{:?}", RateLimited::new(CountingSink::new(), 0.5));
        let open = format!("{:?}", RateLimited::new(CountingSink::new(), f64::INFINITY));
        assert!(closed.contains("closed"));
        assert!(open.contains("unlimited"));
    }
}
