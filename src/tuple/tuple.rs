use std::sync::Arc;

use bytes::{Buf, BufMut};

use crate::common::{DbError, RecordId, Result, STRING_LENGTH};

use super::{TupleDesc, Value};

/// Represents a single row of a heap file.
///
/// A tuple holds one value per field of its descriptor and, once it has been
/// stored in or read from a page, the [`RecordId`] of the slot it occupies.
///
/// ## Binary Format
///
/// Fields are written back to back in descriptor order, with no header and
/// no null bitmap:
///
/// ```text
/// +-----------------+-----------------+-----+
/// | field 0         | field 1         | ... |
/// | (fixed width)   | (fixed width)   |     |
/// +-----------------+-----------------+-----+
/// ```
///
/// Integers take 8 bytes (little-endian i64), strings take STRING_LENGTH
/// bytes, zero padded. The encoded size is always `desc.bytes_per_tuple()`.
#[derive(Debug, Clone)]
pub struct Tuple {
    /// The descriptor defining the structure of this tuple
    desc: Arc<TupleDesc>,

    /// The values for each field (in descriptor order)
    values: Vec<Value>,

    /// Slot this tuple occupies, assigned on insert or read
    rid: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple with the given descriptor and values.
    ///
    /// # Panics
    /// Panics if the number of values doesn't match the descriptor field count.
    pub fn new(desc: Arc<TupleDesc>, values: Vec<Value>) -> Self {
        assert_eq!(
            values.len(),
            desc.field_count(),
            "Value count must match descriptor field count"
        );
        Self {
            desc,
            values,
            rid: None,
        }
    }

    /// Returns the descriptor of this tuple.
    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Returns the value at the given field index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value for the given field name.
    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.desc.field_index(name).and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn rid(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    /// Returns the number of values in this tuple.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks that every value matches its field type and width.
    pub fn validate(&self) -> Result<()> {
        for (value, field) in self.values.iter().zip(self.desc.fields()) {
            if value.data_type() != field.data_type() {
                return Err(DbError::TypeMismatch {
                    expected: field.data_type().to_string(),
                    found: value.data_type().to_string(),
                });
            }
            if let Some(s) = value.as_str() {
                if s.len() > STRING_LENGTH {
                    return Err(DbError::StringTooLong {
                        len: s.len(),
                        max: STRING_LENGTH,
                    });
                }
            }
        }
        Ok(())
    }

    /// Writes every field in descriptor order.
    ///
    /// Fails without writing anything if a value does not fit its field.
    pub fn write_to<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.validate()?;
        for (value, field) in self.values.iter().zip(self.desc.fields()) {
            value.write_to(field.data_type(), buf)?;
        }
        Ok(())
    }

    /// Reads one tuple of `desc` from the front of `buf`.
    pub fn read_from<B: Buf>(desc: &Arc<TupleDesc>, buf: &mut B) -> Result<Self> {
        let values = desc
            .fields()
            .map(|field| Value::read_from(field.data_type(), buf))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(Arc::clone(desc), values))
    }
}

impl PartialEq for Tuple {
    /// Tuples compare by value; where they are stored does not matter.
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.values == other.values
    }
}

impl Eq for Tuple {}

/// Builder for constructing tuples fluently.
pub struct TupleBuilder {
    desc: Arc<TupleDesc>,
    values: Vec<Value>,
}

impl TupleBuilder {
    pub fn new(desc: Arc<TupleDesc>) -> Self {
        let count = desc.field_count();
        Self {
            desc,
            values: Vec::with_capacity(count),
        }
    }

    /// Appends the value for the next field.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Builds the tuple.
    ///
    /// # Panics
    /// Panics if fewer or more values than fields were supplied.
    pub fn build(self) -> Tuple {
        Tuple::new(self.desc, self.values)
    }
}
