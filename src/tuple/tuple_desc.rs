use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::DataType;

/// A single named, typed field of a tuple descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDesc {
    /// Field name
    name: String,

    /// Field data type
    data_type: DataType,
}

impl FieldDesc {
    /// Creates a new field definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field data type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// Ordered sequence of named, typed fields shared by every tuple of a table.
///
/// Descriptors are immutable once built; tuples and pages hold them through
/// an `Arc`. `clone()` is the explicit copy.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    /// Ordered list of fields
    fields: Vec<FieldDesc>,

    /// Map from field name to field index for fast lookup
    name_to_index: HashMap<String, usize>,

    /// Sum of the fixed widths of all fields
    bytes_per_tuple: usize,
}

impl TupleDesc {
    /// Creates a new descriptor from a list of fields.
    pub fn new(fields: Vec<FieldDesc>) -> Self {
        let mut name_to_index = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            // first occurrence wins on duplicate names
            name_to_index.entry(field.name.clone()).or_insert(i);
        }
        let bytes_per_tuple = fields.iter().map(|f| f.data_type.fixed_size()).sum();

        Self {
            fields,
            name_to_index,
            bytes_per_tuple,
        }
    }

    /// Creates a builder for fluent construction.
    pub fn builder() -> TupleDescBuilder {
        TupleDescBuilder::new()
    }

    /// Returns the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the field at the given index.
    pub fn field(&self, index: usize) -> Option<&FieldDesc> {
        self.fields.get(index)
    }

    /// Returns the index of the field with the given name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Returns an iterator over all fields.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDesc> {
        self.fields.iter()
    }

    /// Returns the encoded size of one tuple in bytes.
    pub fn bytes_per_tuple(&self) -> usize {
        self.bytes_per_tuple
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", field.name, field.data_type)?;
        }
        write!(f, ")")
    }
}

/// Builder for constructing tuple descriptors fluently.
pub struct TupleDescBuilder {
    fields: Vec<FieldDesc>,
}

impl TupleDescBuilder {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a field of any type.
    pub fn field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(FieldDesc::new(name, data_type));
        self
    }

    /// Adds an integer field.
    pub fn int(self, name: impl Into<String>) -> Self {
        self.field(name, DataType::Int)
    }

    /// Adds a string field.
    pub fn string(self, name: impl Into<String>) -> Self {
        self.field(name, DataType::String)
    }

    pub fn build(self) -> TupleDesc {
        TupleDesc::new(self.fields)
    }

    /// Builds the descriptor wrapped in an Arc for shared ownership.
    pub fn build_arc(self) -> Arc<TupleDesc> {
        Arc::new(self.build())
    }
}

impl Default for TupleDescBuilder {
    fn default() -> Self {
        Self::new()
    }
}
