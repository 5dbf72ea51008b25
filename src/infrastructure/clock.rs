//! Time source for suppression windows and fingerprint expiry.
//!
//! Every `Deduper` reads the time once per `log` call (to compare against the
//! window) and once per sweep (to age out fingerprints). Both reads go
//! through [`SystemClock`] unless `DeduperBuilder::with_clock` swaps in
//! another [`Clock`], typically `mocks::MockClock` in tests.

use crate::application::ports::Clock;
use std::time::Instant;

/// Monotonic clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
