//! Best-effort coercion of decoded records.
//!
//! Only these conversions exist:
//!
//! | target            | accepted record types                 |
//! |-------------------|---------------------------------------|
//! | `String`          | string, integer (base 10), double (3 decimals) |
//! | `i64`             | integer, string (base 10)             |
//! | `f64`             | double, integer, string (full precision) |
//! | `Vec<StructItem>` | struct                                |
//!
//! Anything else fails with [`CodecError::ConversionError`].

use crate::error::{CodecError, Result};
use crate::record::{Record, StructItem, Value};
use crate::types::TypeTag;

/// Types a [`Record`] can be coerced into.
pub trait FromRecord: Sized {
    /// Name of the target kind, used in error messages.
    const KIND: &'static str;

    fn from_record(record: &Record) -> Result<Self>;
}

impl Record {
    /// Coerce this record into `T`. The record itself is never changed.
    pub fn convert<T: FromRecord>(&self) -> Result<T> {
        T::from_record(self)
    }
}

fn unsupported<T: FromRecord>(record: &Record) -> CodecError {
    CodecError::ConversionError {
        from: record.type_tag(),
        to: T::KIND,
        reason: "no conversion between these kinds".to_string(),
    }
}

fn unparsable<T: FromRecord>(text: &str, err: impl std::fmt::Display) -> CodecError {
    CodecError::ConversionError {
        from: TypeTag::String,
        to: T::KIND,
        reason: format!("{text:?}: {err}"),
    }
}

impl FromRecord for String {
    const KIND: &'static str = "text";

    fn from_record(record: &Record) -> Result<Self> {
        match record.value() {
            Value::Text(s) => Ok(s.clone()),
            Value::Integer(v) => Ok(v.to_string()),
            Value::Fixed(v) => Ok(format!("{v:.3}")),
            Value::Aggregate(_) => Err(unsupported::<Self>(record)),
        }
    }
}

impl FromRecord for i64 {
    const KIND: &'static str = "integer";

    fn from_record(record: &Record) -> Result<Self> {
        match record.value() {
            Value::Integer(v) => Ok(*v),
            Value::Text(s) => s.parse().map_err(|err| unparsable::<Self>(s, err)),
            Value::Fixed(_) | Value::Aggregate(_) => Err(unsupported::<Self>(record)),
        }
    }
}

impl FromRecord for f64 {
    const KIND: &'static str = "floating";

    fn from_record(record: &Record) -> Result<Self> {
        match record.value() {
            Value::Fixed(v) => Ok(*v),
            Value::Integer(v) => Ok(*v as f64),
            Value::Text(s) => s.parse().map_err(|err| unparsable::<Self>(s, err)),
            Value::Aggregate(_) => Err(unsupported::<Self>(record)),
        }
    }
}

impl FromRecord for Vec<StructItem> {
    const KIND: &'static str = "struct items";

    fn from_record(record: &Record) -> Result<Self> {
        match record.value() {
            Value::Aggregate(items) => Ok(items.clone()),
            _ => Err(unsupported::<Self>(record)),
        }
    }
}
