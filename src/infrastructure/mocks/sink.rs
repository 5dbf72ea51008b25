//! Sink test doubles.

use crate::application::error::LogError;
use crate::application::ports::Sink;
use crate::domain::fingerprint::Fingerprint;
use crate::domain::value::Value;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Sink that counts the records it receives.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct CountingSink {
    count: Arc<AtomicUsize>,
}

impl CountingSink {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of records received.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Sink for CountingSink {
    fn log(&self, _record: &[Value<'_>]) -> Result<(), LogError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Sink that keeps the logfmt line of every record it receives.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the recorded lines, without trailing newlines.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Get the number of records received.
    pub fn count(&self) -> usize {
        self.lines
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .len()
    }
}

impl Sink for RecordingSink {
    fn log(&self, record: &[Value<'_>]) -> Result<(), LogError> {
        let line = Fingerprint::of(record)?.to_string();
        self.lines
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .push(line);
        Ok(())
    }
}

/// Sink that fails every write with a forwarding error.
///
/// Clones share the same attempt counter.
#[derive(Debug, Clone, Default)]
pub struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    /// Create a sink that always fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of writes attempted.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Sink for FailingSink {
    fn log(&self, _record: &[Value<'_>]) -> Result<(), LogError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink unavailable").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyvals;

    #[test]
    fn test_counting_sink_shares_count() {
        let sink = CountingSink::new();
        let clone = sink.clone();

        sink.log(&keyvals!["a", 1]).unwrap();
        clone.log(&keyvals!["a", 1]).unwrap();

        assert_eq!(sink.count(), 2);
    }

    #[test]
    fn test_recording_sink_keeps_lines() {
        let sink = RecordingSink::new();
        sink.log(&keyvals!["msg", "hi there", "n", 1]).unwrap();

        assert_eq!(sink.lines(), vec!["msg=\"hi there\" n=1".to_string()]);
    }

    #[test]
    fn test_recording_sink_rejects_malformed() {
        let sink = RecordingSink::new();
        let err = sink.log(&keyvals!["msg"]).unwrap_err();

        assert!(err.is_encoding());
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_failing_sink() {
        let sink = FailingSink::new();
        let err = sink.log(&keyvals!["msg", "x"]).unwrap_err();

        assert!(err.is_forwarding());
        assert_eq!(sink.attempts(), 1);
    }
}
