//! Domain layer - pure types with no runtime dependencies.
//!
//! This layer contains the core concepts of structured log deduplication:
//! - Record values and the `keyvals!` constructor
//! - Canonical fingerprint encoding (logfmt)
//! - Encoding errors
//!
//! All types in this layer are pure and easily testable.

pub mod fingerprint;
pub mod value;
