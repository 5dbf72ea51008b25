//! Pooled fingerprint encoder.

use crate::domain::fingerprint::{encode_into, EncodingError, Fingerprint};
use crate::domain::value::Value;
use crate::infrastructure::pool::BufferPool;

/// Encodes records into fingerprints using pooled scratch buffers.
#[derive(Debug, Default)]
pub struct FingerprintEncoder {
    pool: BufferPool,
}

impl FingerprintEncoder {
    /// Create an encoder keeping up to `pool_size` idle buffers.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool: BufferPool::new(pool_size),
        }
    }

    /// Encode `record` and pass the borrowed line to `f`.
    ///
    /// The buffer goes back to the pool once `f` returns or encoding fails.
    pub fn with_encoded<R>(
        &self,
        record: &[Value<'_>],
        f: impl FnOnce(&str) -> R,
    ) -> Result<R, EncodingError> {
        let mut buf = self.pool.acquire();
        encode_into(&mut buf, record)?;
        Ok(f(buf.as_str()))
    }

    /// Encode `record` into an owned fingerprint.
    pub fn encode(&self, record: &[Value<'_>]) -> Result<Fingerprint, EncodingError> {
        self.with_encoded(record, |line| Fingerprint::from(line))
    }

    /// Get a reference to the buffer pool.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyvals;

    #[test]
    fn test_encode_matches_domain_encoding() {
        let encoder = FingerprintEncoder::default();
        let record = keyvals!["msg", "hello world", "n", 2];

        let pooled = encoder.encode(&record).unwrap();
        let direct = Fingerprint::of(&record).unwrap();
        assert_eq!(pooled, direct);
    }

    #[test]
    fn test_reuse_does_not_bleed_between_records() {
        let encoder = FingerprintEncoder::new(1);

        let long = encoder.encode(&keyvals!["msg", "a much longer line"]).unwrap();
        let short = encoder.encode(&keyvals!["msg", "x"]).unwrap();

        assert_eq!(long.as_str(), "msg=\"a much longer line\"\n");
        assert_eq!(short.as_str(), "msg=x\n");
        assert_eq!(encoder.pool().idle(), 1);
    }

    #[test]
    fn test_buffer_returned_after_error() {
        let encoder = FingerprintEncoder::new(4);

        let result = encoder.with_encoded(&keyvals!["dangling"], |line| line.len());
        assert_eq!(result, Err(EncodingError::OddKeyValues { len: 1 }));
        assert_eq!(encoder.pool().idle(), 1);

        // The partial line from the failed call is gone
        let line = encoder.encode(&keyvals!["k", "v"]).unwrap();
        assert_eq!(line.as_str(), "k=v\n");
    }

    struct Unrenderable;

    impl std::fmt::Display for Unrenderable {
        fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            Err(std::fmt::Error)
        }
    }

    #[test]
    fn test_buffer_returned_after_mid_record_error() {
        let encoder = FingerprintEncoder::new(4);
        let broken = Unrenderable;
        let record = [
            Value::from("msg"),
            Value::from("written first"),
            Value::from("detail"),
            Value::display(&broken),
        ];

        let mut called = false;
        let result = encoder.with_encoded(&record, |_| called = true);
        assert_eq!(result, Err(EncodingError::UnrenderableValue { index: 3 }));
        assert!(!called);
        assert_eq!(encoder.pool().idle(), 1);

        // The same buffer comes back cleared of the partial pair
        let line = encoder.encode(&keyvals!["k", "v"]).unwrap();
        assert_eq!(line.as_str(), "k=v\n");
        assert_eq!(encoder.pool().idle(), 1);
    }

    #[test]
    fn test_with_encoded_borrows_line() {
        let encoder = FingerprintEncoder::default();
        let len = encoder
            .with_encoded(&keyvals!["msg", "hello"], |line| {
                assert_eq!(line, "msg=hello\n");
                line.len()
            })
            .unwrap();
        assert_eq!(len, 10);
    }
}
