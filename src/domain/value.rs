//! Values carried by structured log records.
//!
//! A record is a flat slice of [`Value`]s alternating key, value, key, value.
//! Values borrow from the caller for the duration of a single `log` call.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

/// A single key or value in a structured record.
#[derive(Clone)]
pub enum Value<'a> {
    /// Absent value, rendered as `null`.
    Nil,
    /// Text.
    Str(Cow<'a, str>),
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    I64(i64),
    /// Unsigned integer.
    U64(u64),
    /// Floating point number.
    F64(f64),
    /// An error, rendered through its `Display` implementation.
    Error(&'a (dyn Error + 'static)),
    /// Any value rendered through `Display`.
    Display(&'a dyn fmt::Display),
    /// Any value rendered through `Debug`.
    Debug(&'a dyn fmt::Debug),
}

impl<'a> Value<'a> {
    /// Wrap a value that should be rendered with `Display`.
    pub fn display(value: &'a dyn fmt::Display) -> Self {
        Value::Display(value)
    }

    /// Wrap a value that should be rendered with `Debug`.
    pub fn debug(value: &'a dyn fmt::Debug) -> Self {
        Value::Debug(value)
    }

    /// Wrap an error.
    pub fn error(err: &'a (dyn Error + 'static)) -> Self {
        Value::Error(err)
    }

    /// Check if this value is [`Value::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Borrow the text of a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("Nil"),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::I64(n) => f.debug_tuple("I64").field(n).finish(),
            Value::U64(n) => f.debug_tuple("U64").field(n).finish(),
            Value::F64(n) => f.debug_tuple("F64").field(n).finish(),
            Value::Error(e) => f.debug_tuple("Error").field(&format_args!("{}", e)).finish(),
            Value::Display(d) => f.debug_tuple("Display").field(&format_args!("{}", d)).finish(),
            Value::Debug(d) => f.debug_tuple("Debug").field(d).finish(),
        }
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::Str(Cow::Borrowed(s))
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(s: &'a String) -> Self {
        Value::Str(Cow::Borrowed(s.as_str()))
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::Str(Cow::Owned(s))
    }
}

impl<'a> From<Cow<'a, str>> for Value<'a> {
    fn from(s: Cow<'a, str>) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value<'_> {
            fn from(n: $t) -> Self {
                Value::I64(n as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value<'_> {
            fn from(n: $t) -> Self {
                Value::U64(n as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Value<'_> {
    fn from(n: f32) -> Self {
        Value::F64(f64::from(n))
    }
}

impl From<f64> for Value<'_> {
    fn from(n: f64) -> Self {
        Value::F64(n)
    }
}

impl<'a> From<&'a (dyn Error + 'static)> for Value<'a> {
    fn from(err: &'a (dyn Error + 'static)) -> Self {
        Value::Error(err)
    }
}

impl<'a, T> From<Option<T>> for Value<'a>
where
    T: Into<Value<'a>>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}

/// Build a record from alternating keys and values.
///
/// Every argument is converted with `Value::from`, so the result is an array
/// that derefs to the `&[Value]` slice sinks accept.
///
/// ```
/// use kvlog_throttle::{keyvals, Value};
///
/// let record = keyvals!["msg", "hello", "attempt", 3];
/// assert_eq!(record.len(), 4);
/// assert!(matches!(record[3], Value::I64(3)));
/// ```
#[macro_export]
macro_rules! keyvals {
    ($($item:expr),* $(,)?) => {
        [$($crate::Value::from($item)),*]
    };
}
