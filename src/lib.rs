//! # kvlog-throttle
//!
//! Deduplication and rate limiting for structured key/value loggers.
//!
//! A record is a flat slice of alternating keys and values. Anything that
//! accepts records implements [`Sink`], and both middlewares in this crate
//! take a `Sink` and are themselves a `Sink`, so they chain freely in front
//! of a terminal sink.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kvlog_throttle::{keyvals, Deduper, LogfmtWriter, RateLimited, Sink};
//! use std::io;
//! use std::time::Duration;
//!
//! let stdout = LogfmtWriter::new(io::stdout());
//!
//! // At most 100 lines per second, and each distinct line at most once a second
//! let limited = RateLimited::new(stdout, 100.0);
//! let sink = Deduper::new(limited, Duration::from_secs(1));
//!
//! sink.log(&keyvals!["level", "warn", "msg", "disk almost full", "free_mb", 12])
//!     .unwrap();
//!
//! sink.stop();
//! ```
//!
//! ## Deduplication
//!
//! [`Deduper`] encodes each record into a canonical logfmt line, its
//! [`Fingerprint`]. A record is forwarded unless an identical fingerprint was
//! forwarded less than `window` ago. Key order matters, and so does every
//! value: `msg=a n=1` and `n=1 msg=a` are different records.
//!
//! ```rust
//! use kvlog_throttle::{keyvals, Deduper, Sink};
//! use kvlog_throttle::infrastructure::mocks::CountingSink;
//! use std::time::Duration;
//!
//! let counter = CountingSink::new();
//! let deduper = Deduper::new(counter.clone(), Duration::from_secs(60));
//!
//! deduper.log(&keyvals!["msg", "retrying", "attempt", 1]).unwrap();
//! deduper.log(&keyvals!["msg", "retrying", "attempt", 1]).unwrap(); // suppressed
//! deduper.log(&keyvals!["msg", "retrying", "attempt", 2]).unwrap(); // different value
//!
//! assert_eq!(counter.count(), 2);
//! deduper.stop();
//! ```
//!
//! Fingerprints are kept in a sharded map and reclaimed by a background
//! thread: every [`SWEEP_INTERVAL`] it removes entries last forwarded more
//! than [`EXPIRE_AFTER`] ago. Call [`Deduper::stop`] to halt that thread, or
//! [`Deduper::shutdown`] to also wait for it. Dropping a `Deduper` stops it.
//!
//! ## Rate Limiting
//!
//! [`RateLimited`] is a token bucket refilled at `per_second` tokens per
//! second and holding at most `trunc(per_second)` of them. Records that
//! arrive with the bucket empty are dropped silently. Every rate is accepted:
//! one below 1 drops everything, an infinite one forwards everything.
//!
//! ## Errors
//!
//! [`Sink::log`] returns [`LogError::Encoding`] for records the Deduper cannot
//! fingerprint (an odd number of entries, or a key that is nil or empty once
//! whitespace, `=` and `"` are dropped), and passes through whatever error the
//! terminal sink raised. Records dropped by either middleware are never errors.
//!
//! ## Observability
//!
//! ```rust,no_run
//! # use kvlog_throttle::{Deduper, Discard};
//! # use std::time::Duration;
//! # let deduper = Deduper::new(Discard, Duration::from_secs(1));
//! let metrics = deduper.metrics();
//! println!("Forwarded: {}", metrics.events_forwarded());
//! println!("Suppressed: {}", metrics.events_suppressed());
//! println!("Tracked fingerprints: {}", deduper.seen_count());
//!
//! let snapshot = metrics.snapshot();
//! println!("Suppression rate: {:.2}%", snapshot.suppression_rate() * 100.0);
//! ```
//!
//! Internal diagnostics (sweeps, rejected records) are emitted through
//! `tracing` and never routed through the middlewares themselves.

// Domain layer - pure types and encoding
pub mod domain;

// Application layer - decisions and ports
pub mod application;

// Infrastructure layer - concrete middlewares and sinks
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    fingerprint::{EncodingError, Fingerprint},
    value::Value,
};

pub use application::{
    dedupe::{DedupeDecision, DedupeFilter, EXPIRE_AFTER, SWEEP_INTERVAL},
    error::LogError,
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, ExpiryStore, Sink},
};

pub use infrastructure::{
    clock::SystemClock,
    deduper::{BuildError, Deduper, DeduperBuilder, ShutdownError},
    encoder::FingerprintEncoder,
    pool::BufferPool,
    rate_limit::RateLimited,
    sinks::{Discard, LogfmtWriter, SinkFn, TracingSink},
    storage::ShardedStorage,
};
