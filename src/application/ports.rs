//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::application::error::LogError;
use crate::domain::value::Value;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Port for anything that accepts structured records.
///
/// Both middlewares consume a `Sink` and are themselves a `Sink`, so they can
/// be chained in any order in front of a terminal sink.
pub trait Sink: Send + Sync {
    /// Accept one record: alternating keys and values.
    ///
    /// # Errors
    /// Returns `LogError::Encoding` if the record is malformed, or whatever
    /// error the terminal sink raised while writing it.
    fn log(&self, record: &[Value<'_>]) -> Result<(), LogError>;
}

impl<T: Sink + ?Sized> Sink for &T {
    fn log(&self, record: &[Value<'_>]) -> Result<(), LogError> {
        (**self).log(record)
    }
}

impl<T: Sink + ?Sized> Sink for Box<T> {
    fn log(&self, record: &[Value<'_>]) -> Result<(), LogError> {
        (**self).log(record)
    }
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn log(&self, record: &[Value<'_>]) -> Result<(), LogError> {
        (**self).log(record)
    }
}

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for the fingerprint -> last-seen map.
///
/// Implementations must allow concurrent lookups, serialize writes against
/// each other, and keep `sweep` exclusive with respect to the entries it
/// examines.
pub trait ExpiryStore: Send + Sync + Debug {
    /// Get the last time `fingerprint` was forwarded.
    fn lookup(&self, fingerprint: &str) -> Option<Instant>;

    /// Insert or refresh the timestamp for `fingerprint`.
    fn record(&self, fingerprint: &str, seen_at: Instant);

    /// Remove every entry older than `expire_after` as of `now`.
    ///
    /// # Returns
    /// The number of entries removed
    fn sweep(&self, now: Instant, expire_after: Duration) -> usize;

    /// Get the number of tracked fingerprints.
    fn len(&self) -> usize;

    /// Check if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all entries.
    fn clear(&self);
}

impl<T: ExpiryStore + ?Sized> ExpiryStore for Arc<T> {
    fn lookup(&self, fingerprint: &str) -> Option<Instant> {
        (**self).lookup(fingerprint)
    }

    fn record(&self, fingerprint: &str, seen_at: Instant) {
        (**self).record(fingerprint, seen_at)
    }

    fn sweep(&self, now: Instant, expire_after: Duration) -> usize {
        (**self).sweep(now, expire_after)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn clear(&self) {
        (**self).clear()
    }
}
