//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - Storage implementations (sharded maps)
//! - The Deduper and RateLimited middlewares
//! - Terminal sinks (tracing, logfmt writers)

pub mod clock;
pub mod deduper;
pub mod encoder;
pub mod pool;
pub mod rate_limit;
pub mod sinks;
pub mod storage;
pub(crate) mod sweeper;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides a controllable clock and recording
/// sinks for testing middleware behavior.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// kvlog-throttle = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
