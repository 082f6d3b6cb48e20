use crate::codec::payload_len;
use crate::error::{CodecError, Result};
use crate::types::TypeTag;

/// The typed payload of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Text(String),
    /// Fixed-point double; the wire keeps three decimal digits.
    Fixed(f64),
    /// Struct members in arrival order. Keys may repeat.
    Aggregate(Vec<StructItem>),
}

impl Value {
    /// The wire tag matching this variant.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Integer(_) => TypeTag::Integer,
            Value::Text(_) => TypeTag::String,
            Value::Fixed(_) => TypeTag::Double,
            Value::Aggregate(_) => TypeTag::Struct,
        }
    }
}

/// One struct member.
#[derive(Debug, Clone, PartialEq)]
pub struct StructItem {
    pub key: String,
    pub value: Record,
}

impl StructItem {
    pub fn new(key: impl Into<String>, value: impl Into<Record>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A typed value plus the length of its encoded payload.
///
/// Records are immutable once built. The strict accessors (`as_int`,
/// `as_str`, `as_double`, `struct_items`) fail with
/// [`CodecError::TypeError`] on any other variant; use
/// [`Record::convert`] for best-effort coercion.
///
/// Equality compares values only. A peer may use a longer encoding than
/// necessary, so two equal values can carry different sizes.
#[derive(Debug, Clone)]
pub struct Record {
    value: Value,
    size: usize,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Record {
    /// Build a record, computing its payload length.
    pub fn new(value: Value) -> Self {
        let size = payload_len(&value);
        Self { value, size }
    }

    pub(crate) fn from_wire(value: Value, size: usize) -> Self {
        Self { value, size }
    }

    pub fn int(value: i64) -> Self {
        Self::new(Value::Integer(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(Value::Text(value.into()))
    }

    pub fn double(value: f64) -> Self {
        Self::new(Value::Fixed(value))
    }

    pub fn structure(items: Vec<StructItem>) -> Self {
        Self::new(Value::Aggregate(items))
    }

    pub fn type_tag(&self) -> TypeTag {
        self.value.type_tag()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Byte length of the encoded payload (header and length bytes excluded).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_int(&self) -> Result<i64> {
        match self.value {
            Value::Integer(v) => Ok(v),
            _ => Err(self.type_error(TypeTag::Integer)),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match &self.value {
            Value::Text(s) => Ok(s),
            _ => Err(self.type_error(TypeTag::String)),
        }
    }

    pub fn as_double(&self) -> Result<f64> {
        match self.value {
            Value::Fixed(v) => Ok(v),
            _ => Err(self.type_error(TypeTag::Double)),
        }
    }

    pub fn struct_items(&self) -> Result<&[StructItem]> {
        match &self.value {
            Value::Aggregate(items) => Ok(items),
            _ => Err(self.type_error(TypeTag::Struct)),
        }
    }

    /// First member named `key`, if this is a struct that has one.
    pub fn get(&self, key: &str) -> Option<&Record> {
        match &self.value {
            Value::Aggregate(items) => items
                .iter()
                .find(|item| item.key == key)
                .map(|item| &item.value),
            _ => None,
        }
    }

    /// Every member named `key`, in arrival order. Empty for non-structs.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        let items: &[StructItem] = match &self.value {
            Value::Aggregate(items) => items,
            _ => &[],
        };
        items
            .iter()
            .filter(move |item| item.key == key)
            .map(|item| &item.value)
    }

    fn type_error(&self, expected: TypeTag) -> CodecError {
        CodecError::TypeError {
            expected,
            found: self.type_tag(),
        }
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<i64> for Record {
    fn from(value: i64) -> Self {
        Self::int(value)
    }
}

impl From<i32> for Record {
    fn from(value: i32) -> Self {
        Self::int(i64::from(value))
    }
}

impl From<u32> for Record {
    fn from(value: u32) -> Self {
        Self::int(i64::from(value))
    }
}

impl From<f64> for Record {
    fn from(value: f64) -> Self {
        Self::double(value)
    }
}

impl From<&str> for Record {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Record {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}
