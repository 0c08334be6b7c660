//! Typed field values for model properties.
//!
//! External resources deliver rows as sequences of typed fields; models
//! expose properties positionally. [`FieldValue`] is the common vocabulary
//! between the two. NULL carries a [`FieldType`] so that statement binding
//! can always name the declared parameter type, even for absent data.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Declared type of a model property or statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    Text,
    Bytes,
    Decimal,
    Date,
    DateTime,
    Uuid,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::Bool => "bool",
            FieldType::I16 => "i16",
            FieldType::I32 => "i32",
            FieldType::I64 => "i64",
            FieldType::F32 => "f32",
            FieldType::F64 => "f64",
            FieldType::Text => "text",
            FieldType::Bytes => "bytes",
            FieldType::Decimal => "decimal",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Uuid => "uuid",
        };
        write!(f, "{}", name)
    }
}

/// A single typed field value.
///
/// `Null` carries the declared type so a writer can bind an explicit
/// typed null and a model can keep its own null representation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// NULL with the declared type of the absent value.
    Null(FieldType),
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Decimal(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
}

impl FieldValue {
    /// Check whether this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null(_))
    }

    /// The declared type of this value (the carried type for NULLs).
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Null(t) => *t,
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::I16(_) => FieldType::I16,
            FieldValue::I32(_) => FieldType::I32,
            FieldValue::I64(_) => FieldType::I64,
            FieldValue::F32(_) => FieldType::F32,
            FieldValue::F64(_) => FieldType::F64,
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Bytes(_) => FieldType::Bytes,
            FieldValue::Decimal(_) => FieldType::Decimal,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::DateTime(_) => FieldType::DateTime,
            FieldValue::Uuid(_) => FieldType::Uuid,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i16> for FieldValue {
    fn from(v: i16) -> Self {
        FieldValue::I16(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::I32(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::I64(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::F32(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::F64(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Bytes(v)
    }
}

impl From<Decimal> for FieldValue {
    fn from(v: Decimal) -> Self {
        FieldValue::Decimal(v)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        FieldValue::Date(v)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(v: NaiveDateTime) -> Self {
        FieldValue::DateTime(v)
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        FieldValue::Uuid(v)
    }
}

impl<V> From<Option<V>> for FieldValue
where
    V: Into<FieldValue> + TypedField,
{
    fn from(v: Option<V>) -> Self {
        match v {
            Some(v) => v.into(),
            None => FieldValue::Null(V::FIELD_TYPE),
        }
    }
}

/// Rust types with a fixed [`FieldType`], so `Option<V>` can map `None`
/// to the correctly typed NULL.
pub trait TypedField {
    const FIELD_TYPE: FieldType;
}

macro_rules! typed_field {
    ($($ty:ty => $ft:expr),+ $(,)?) => {
        $(impl TypedField for $ty {
            const FIELD_TYPE: FieldType = $ft;
        })+
    };
}

typed_field! {
    bool => FieldType::Bool,
    i16 => FieldType::I16,
    i32 => FieldType::I32,
    i64 => FieldType::I64,
    f32 => FieldType::F32,
    f64 => FieldType::F64,
    String => FieldType::Text,
    Vec<u8> => FieldType::Bytes,
    Decimal => FieldType::Decimal,
    NaiveDate => FieldType::Date,
    NaiveDateTime => FieldType::DateTime,
    Uuid => FieldType::Uuid,
}
