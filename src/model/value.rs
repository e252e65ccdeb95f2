//! Scalar values exchanged between records and statements.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TesseraError};

/// Dynamically typed field value.
///
/// `Null` marks an absent field: sparse statements skip it and condition
/// queries do not filter on it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Value {
    /// True when the value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True when a key field holding this value still needs a generated key.
    pub fn is_absent_key(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int(0) => true,
            Value::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }

    /// Reads the value as an integer, accepting integral text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            Value::Text(v) => v.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Bytes(v) => write!(f, "x'{}'", hex::encode(v)),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T> From<&Option<T>> for Value
where
    T: Clone + Into<Value>,
{
    fn from(value: &Option<T>) -> Self {
        value.clone().map_or(Value::Null, Into::into)
    }
}

/// Conversion from a [`Value`] into a record field type.
///
/// The property name only feeds error messages.
pub trait FromValue: Sized {
    /// Converts `value` for assignment to `property`.
    fn from_value(property: &str, value: Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(_property: &str, value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| TesseraError::mismatch(property, "int", value.kind()))
    }
}

impl FromValue for i32 {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        let found = value.kind();
        let wide = i64::from_value(property, value)?;
        i32::try_from(wide).map_err(|_| TesseraError::mismatch(property, "i32", found))
    }
}

impl FromValue for bool {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            other => Err(TesseraError::mismatch(property, "bool", other.kind())),
        }
    }
}

impl FromValue for f64 {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(TesseraError::mismatch(property, "float", other.kind())),
        }
    }
}

impl FromValue for String {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Int(v) => Ok(v.to_string()),
            other => Err(TesseraError::mismatch(property, "text", other.kind())),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => Err(TesseraError::mismatch(property, "bytes", other.kind())),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(property: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(property, other).map(Some),
        }
    }
}
