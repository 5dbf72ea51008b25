//! Terminal sinks and adapters.

use crate::application::{error::LogError, ports::Sink};
use crate::domain::value::Value;
use crate::infrastructure::encoder::FingerprintEncoder;
use std::fmt;
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use tracing::Level;

/// Sink that re-emits each record as a `tracing` event.
///
/// The event message is the record's logfmt line. The level comes from the
/// record's `level` key when it holds one of `trace`, `debug`, `info`, `warn`
/// or `error` (any case), and from the sink's default otherwise.
#[derive(Debug)]
pub struct TracingSink {
    default_level: Level,
    encoder: FingerprintEncoder,
}

impl TracingSink {
    /// Create a sink emitting at `INFO` unless a record says otherwise.
    pub fn new() -> Self {
        Self::with_default_level(Level::INFO)
    }

    /// Create a sink emitting at `level` unless a record says otherwise.
    pub fn with_default_level(level: Level) -> Self {
        Self {
            default_level: level,
            encoder: FingerprintEncoder::default(),
        }
    }

    /// Get the level used for records without a recognised `level` key.
    pub fn default_level(&self) -> Level {
        self.default_level
    }

    fn level_of(&self, record: &[Value<'_>]) -> Level {
        record
            .chunks_exact(2)
            .find(|pair| pair[0].as_str() == Some("level"))
            .and_then(|pair| pair[1].as_str())
            .and_then(parse_level)
            .unwrap_or(self.default_level)
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_level(name: &str) -> Option<Level> {
    const LEVELS: [(&str, Level); 5] = [
        ("trace", Level::TRACE),
        ("debug", Level::DEBUG),
        ("info", Level::INFO),
        ("warn", Level::WARN),
        ("error", Level::ERROR),
    ];
    LEVELS
        .iter()
        .find(|(label, _)| name.eq_ignore_ascii_case(label))
        .map(|(_, level)| *level)
}

impl Sink for TracingSink {
    fn log(&self, record: &[Value<'_>]) -> Result<(), LogError> {
        let level = self.level_of(record);
        self.encoder.with_encoded(record, |line| {
            let line = line.trim_end_matches('\n');
            // Event levels must be known at the call site.
            if level == Level::ERROR {
                tracing::error!("{}", line);
            } else if level == Level::WARN {
                tracing::warn!("{}", line);
            } else if level == Level::INFO {
                tracing::info!("{}", line);
            } else if level == Level::DEBUG {
                tracing::debug!("{}", line);
            } else {
                tracing::trace!("{}", line);
            }
        })?;
        Ok(())
    }
}

/// Sink that writes one logfmt line per record.
///
/// Writes are serialized through a mutex so lines never interleave.
pub struct LogfmtWriter<W> {
    writer: Mutex<W>,
    encoder: FingerprintEncoder,
}

impl<W> LogfmtWriter<W>
where
    W: Write + Send,
{
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            encoder: FingerprintEncoder::default(),
        }
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W> Sink for LogfmtWriter<W>
where
    W: Write + Send,
{
    fn log(&self, record: &[Value<'_>]) -> Result<(), LogError> {
        self.encoder.with_encoded(record, |line| {
            let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            writer.write_all(line.as_bytes())
        })??;
        Ok(())
    }
}

impl<W> fmt::Debug for LogfmtWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogfmtWriter").finish_non_exhaustive()
    }
}

/// Adapter turning a closure into a [`Sink`].
///
/// ```
/// use kvlog_throttle::{keyvals, Sink, SinkFn};
///
/// let sink = SinkFn::new(|record| {
///     assert_eq!(record.len(), 2);
///     Ok(())
/// });
/// sink.log(&keyvals!["msg", "hello"]).unwrap();
/// ```
pub struct SinkFn<F> {
    f: F,
}

impl<F> SinkFn<F>
where
    F: Fn(&[Value<'_>]) -> Result<(), LogError> + Send + Sync,
{
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Sink for SinkFn<F>
where
    F: Fn(&[Value<'_>]) -> Result<(), LogError> + Send + Sync,
{
    fn log(&self, record: &[Value<'_>]) -> Result<(), LogError> {
        (self.f)(record)
    }
}

impl<F> fmt::Debug for SinkFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkFn").finish_non_exhaustive()
    }
}

/// Sink that accepts and drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Sink for Discard {
    fn log(&self, _record: &[Value<'_>]) -> Result<(), LogError> {
        Ok(())
    }
}
