//! Mock implementations for testing.
//!
//! Test doubles for the clock, terminal sinks, and a tracing layer that
//! captures emitted events.

pub mod clock;
pub mod layer;
pub mod sink;

pub use clock::MockClock;
pub use layer::{CapturedEvent, MockCaptureLayer};
pub use sink::{CountingSink, FailingSink, RecordingSink};
