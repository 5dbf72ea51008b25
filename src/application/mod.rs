//! Application layer - orchestration of domain logic.
//!
//! This layer decides what happens to each record:
//! - Suppression decisions against the expiry store
//! - Error and metrics types shared by the middlewares
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod dedupe;
pub mod error;
pub mod metrics;
pub mod ports;
