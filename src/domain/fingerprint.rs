//! Canonical fingerprints for structured records.
//!
//! A fingerprint is the logfmt rendering of a record: `key=value` pairs
//! separated by single spaces, in input order, terminated by a newline.
//! Two records fingerprint identically only if they would render to the same
//! log line, so key order and every value participate.
//!
//! Quoting follows the logfmt conventions:
//! - empty text renders as nothing (`k=`)
//! - the text `null` is quoted so it cannot be confused with a nil value
//! - text containing whitespace, control characters, `=`, `"` or U+FFFD is
//!   quoted and escaped
//!
//! Keys are never quoted. Those characters are dropped from keys instead, and
//! a key left empty is an error.

use crate::domain::value::Value;
use std::borrow::Borrow;
use std::fmt::{self, Write};
use std::ops::Deref;

/// Error returned when a record cannot be canonically encoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// The record has a key without a value.
    #[error("record has odd number of key/value entries ({len})")]
    OddKeyValues {
        /// Number of entries in the record
        len: usize,
    },
    /// A key is nil, or empty once characters logfmt cannot represent are dropped.
    #[error("invalid key at position {index}")]
    InvalidKey {
        /// Position of the key in the record
        index: usize,
    },
    /// Formatting a value returned an error.
    #[error("value at position {index} could not be rendered")]
    UnrenderableValue {
        /// Position of the value in the record
        index: usize,
    },
}

/// The canonical encoding of a record, used as an exact-match suppression key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Box<str>);

impl Fingerprint {
    /// Encode a record into a freshly allocated fingerprint.
    ///
    /// Hot paths should prefer `FingerprintEncoder`, which reuses buffers.
    pub fn of(record: &[Value<'_>]) -> Result<Self, EncodingError> {
        let mut buf = String::new();
        encode_into(&mut buf, record)?;
        Ok(Fingerprint(buf.into_boxed_str()))
    }

    /// Borrow the encoded line, including its trailing newline.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the encoded line in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the encoded line is empty.
    ///
    /// Never true for fingerprints produced by encoding, which always end
    /// with a newline.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Fingerprint {
    fn from(line: &str) -> Self {
        Fingerprint(line.into())
    }
}

impl From<String> for Fingerprint {
    fn from(line: String) -> Self {
        Fingerprint(line.into_boxed_str())
    }
}

impl Borrow<str> for Fingerprint {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Deref for Fingerprint {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.trim_end_matches('\n'))
    }
}

/// Append the canonical encoding of `record` to `buf`.
///
/// On error `buf` holds a partial line and must be discarded by the caller.
pub fn encode_into(buf: &mut String, record: &[Value<'_>]) -> Result<(), EncodingError> {
    if record.len() % 2 != 0 {
        return Err(EncodingError::OddKeyValues { len: record.len() });
    }

    for (pair, kv) in record.chunks_exact(2).enumerate() {
        let key_index = pair * 2;
        if pair > 0 {
            buf.push(' ');
        }
        write_key(buf, &kv[0]).map_err(|_| EncodingError::InvalidKey { index: key_index })?;
        buf.push('=');
        write_value(buf, &kv[1]).map_err(|_| EncodingError::UnrenderableValue {
            index: key_index + 1,
        })?;
    }

    buf.push('\n');
    Ok(())
}

fn write_key(buf: &mut String, key: &Value<'_>) -> fmt::Result {
    let start = buf.len();
    match key {
        Value::Nil => return Err(fmt::Error),
        Value::Str(s) => push_key_chars(buf, s),
        other => {
            write_plain(buf, other)?;
            if buf[start..].chars().any(needs_quoted_char) {
                let raw = buf.split_off(start);
                push_key_chars(buf, &raw);
            }
        }
    }

    // Nothing left after filtering.
    if buf.len() == start {
        return Err(fmt::Error);
    }
    Ok(())
}

/// Keys are never quoted: characters that would need quoting are dropped.
fn push_key_chars(buf: &mut String, key: &str) {
    buf.extend(key.chars().filter(|&c| !needs_quoted_char(c)));
}

fn write_value(buf: &mut String, value: &Value<'_>) -> fmt::Result {
    match value {
        Value::Nil => buf.push_str("null"),
        Value::Str(s) => write_text(buf, s),
        Value::Error(_) | Value::Display(_) | Value::Debug(_) => {
            let start = buf.len();
            write_plain(buf, value)?;
            if buf.len() > start && needs_quoting(&buf[start..]) {
                let raw = buf.split_off(start);
                write_quoted(buf, &raw);
            }
        }
        scalar => write_plain(buf, scalar)?,
    }
    Ok(())
}

/// Render a value without any quoting.
fn write_plain(buf: &mut String, value: &Value<'_>) -> fmt::Result {
    match value {
        Value::Nil => buf.push_str("null"),
        Value::Str(s) => buf.push_str(s),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::I64(n) => write!(buf, "{}", n)?,
        Value::U64(n) => write!(buf, "{}", n)?,
        Value::F64(n) => write!(buf, "{}", n)?,
        Value::Error(e) => write!(buf, "{}", e)?,
        Value::Display(d) => write!(buf, "{}", d)?,
        Value::Debug(d) => write!(buf, "{:?}", d)?,
    }
    Ok(())
}

fn write_text(buf: &mut String, text: &str) {
    if needs_quoting(text) {
        write_quoted(buf, text);
    } else {
        buf.push_str(text);
    }
}

fn needs_quoting(text: &str) -> bool {
    text == "null" || text.chars().any(needs_quoted_char)
}

fn needs_quoted_char(c: char) -> bool {
    c <= ' ' || c == '=' || c == '"' || c == char::REPLACEMENT_CHARACTER
}

fn write_quoted(buf: &mut String, text: &str) {
    buf.push('"');
    for c in text.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            c if c < ' ' => {
                // Writing to a String cannot fail.
                let _ = write!(buf, "\\u{:04x}", c as u32);
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
}
