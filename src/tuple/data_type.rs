use std::fmt;

use crate::common::{INT_SIZE, STRING_LENGTH};

/// Represents the field types a heap file can store.
/// Every type has a fixed on-disk width, so every tuple of a table has the
/// same size and a page holds a fixed number of slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer: 8 bytes, little-endian
    Int,

    /// Fixed-length string: exactly STRING_LENGTH bytes, zero padded
    String,
}

impl DataType {
    /// Returns the on-disk size of a field of this type in bytes.
    pub fn fixed_size(&self) -> usize {
        match self {
            DataType::Int => INT_SIZE,
            DataType::String => STRING_LENGTH,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::String => write!(f, "STRING({})", STRING_LENGTH),
        }
    }
}
