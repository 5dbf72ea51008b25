//! Errors surfaced by sinks and middlewares.

use crate::domain::fingerprint::EncodingError;
use std::error::Error;
use std::io;

/// Error returned by [`Sink::log`](crate::Sink::log).
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The record could not be canonically encoded.
    #[error("failed to encode record: {0}")]
    Encoding(#[from] EncodingError),
    /// A terminal sink failed to write the record.
    #[error("sink failed to write record: {0}")]
    Forwarding(#[source] Box<dyn Error + Send + Sync>),
}

impl LogError {
    /// Wrap a terminal sink's failure.
    pub fn forwarding<E>(err: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        LogError::Forwarding(err.into())
    }

    /// Check if this is an encoding failure.
    pub fn is_encoding(&self) -> bool {
        matches!(self, LogError::Encoding(_))
    }

    /// Check if this is a forwarding failure.
    pub fn is_forwarding(&self) -> bool {
        matches!(self, LogError::Forwarding(_))
    }
}

impl From<io::Error> for LogError {
    fn from(err: io::Error) -> Self {
        LogError::Forwarding(Box::new(err))
    }
}
