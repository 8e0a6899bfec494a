use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut};

use crate::common::{DbError, Result, STRING_LENGTH};

use super::DataType;

/// Represents a typed value that can be stored in a tuple.
///
/// Layers above storage (operators, value encryption) should read values
/// through [`Value::as_int`] and [`Value::as_str`] rather than matching on
/// the variants, so that they stay independent of the storage encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// 64-bit signed integer
    Int(i64),

    /// String value, at most STRING_LENGTH bytes once encoded
    String(String),
}

impl Value {
    /// Returns the DataType of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::String(_) => DataType::String,
        }
    }

    /// Returns the integer payload, or None for non-integer values.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::String(_) => None,
        }
    }

    /// Returns the string payload, or None for non-string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Int(_) => None,
        }
    }

    /// Writes the value in its fixed-width encoding for `data_type`.
    pub fn write_to<B: BufMut>(&self, data_type: DataType, buf: &mut B) -> Result<()> {
        match (self, data_type) {
            (Value::Int(v), DataType::Int) => {
                buf.put_i64_le(*v);
                Ok(())
            }
            (Value::String(s), DataType::String) => {
                let bytes = s.as_bytes();
                if bytes.len() > STRING_LENGTH {
                    return Err(DbError::StringTooLong {
                        len: bytes.len(),
                        max: STRING_LENGTH,
                    });
                }
                buf.put_slice(bytes);
                buf.put_bytes(0, STRING_LENGTH - bytes.len());
                Ok(())
            }
            (value, expected) => Err(DbError::TypeMismatch {
                expected: expected.to_string(),
                found: value.data_type().to_string(),
            }),
        }
    }

    /// Reads one value of `data_type` from the front of `buf`.
    pub fn read_from<B: Buf>(data_type: DataType, buf: &mut B) -> Result<Self> {
        let size = data_type.fixed_size();
        if buf.remaining() < size {
            return Err(DbError::MalformedPage(format!(
                "need {} bytes for {}, {} left",
                size,
                data_type,
                buf.remaining()
            )));
        }

        match data_type {
            DataType::Int => Ok(Value::Int(buf.get_i64_le())),
            DataType::String => {
                let mut raw = vec![0u8; STRING_LENGTH];
                buf.copy_to_slice(&mut raw);
                let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                raw.truncate(end);
                let s = String::from_utf8(raw)
                    .map_err(|e| DbError::MalformedPage(format!("invalid utf-8: {}", e)))?;
                Ok(Value::String(s))
            }
        }
    }

    /// Compares two values for ordering.
    /// Returns None if the values have different types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
