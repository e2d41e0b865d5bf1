//! Decoded values and conversion into Rust types.

use std::fmt;

use crate::column::{Column, DataType};
use crate::error::{Error, Result};

/// A single decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Decode a text representation according to the column type.
    ///
    /// `bytes` must already be unescaped. NULL detection is the caller's job.
    /// Integers must fit the width of the column type.
    pub fn from_text(column: &Column, bytes: &[u8]) -> Result<Self> {
        let s = simdutf8::compat::from_utf8(bytes).map_err(|e| {
            Error::Decode(format!("invalid UTF-8 in column {}: {}", column.name(), e))
        })?;
        let value = match column.data_type() {
            DataType::Bool => match s {
                "1" | "true" => Value::Bool(true),
                "0" | "false" => Value::Bool(false),
                _ => {
                    return Err(Error::Decode(format!(
                        "invalid Bool in column {}: {:?}",
                        column.name(),
                        s
                    )));
                }
            },
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
                let v: i64 = s.parse().map_err(|e| invalid_text(column, e))?;
                if !signed_fits(column.data_type(), v) {
                    return Err(out_of_range(column, v));
                }
                Value::Int(v)
            }
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                let v: u64 = s.parse().map_err(|e| invalid_text(column, e))?;
                if !unsigned_fits(column.data_type(), v) {
                    return Err(out_of_range(column, v));
                }
                Value::UInt(v)
            }
            DataType::Float32 | DataType::Float64 => {
                Value::Float(parse_float(s).map_err(|e| invalid_text(column, e))?)
            }
            DataType::String | DataType::Other(_) => Value::String(s.to_owned()),
        };
        Ok(value)
    }
}

fn signed_fits(data_type: &DataType, v: i64) -> bool {
    match data_type {
        DataType::Int8 => i8::try_from(v).is_ok(),
        DataType::Int16 => i16::try_from(v).is_ok(),
        DataType::Int32 => i32::try_from(v).is_ok(),
        _ => true,
    }
}

fn unsigned_fits(data_type: &DataType, v: u64) -> bool {
    match data_type {
        DataType::UInt8 => u8::try_from(v).is_ok(),
        DataType::UInt16 => u16::try_from(v).is_ok(),
        DataType::UInt32 => u32::try_from(v).is_ok(),
        _ => true,
    }
}

fn invalid_text(column: &Column, e: impl fmt::Display) -> Error {
    Error::Decode(format!(
        "invalid {} in column {}: {}",
        column.type_name(),
        column.name(),
        e
    ))
}

fn out_of_range(column: &Column, v: impl fmt::Display) -> Error {
    Error::Decode(format!(
        "{} out of range for {} in column {}",
        v,
        column.type_name(),
        column.name()
    ))
}

/// Parse a float, accepting the spellings the server uses for special values.
fn parse_float(s: &str) -> core::result::Result<f64, std::num::ParseFloatError> {
    match s {
        "inf" | "+inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        "nan" | "-nan" => Ok(f64::NAN),
        _ => s.parse(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
        }
    }
}

/// Trait for converting a decoded [`Value`] into a Rust type.
pub trait FromValue: Sized {
    /// Convert from NULL.
    ///
    /// Default implementation returns an error. Override for types that can
    /// represent NULL (like `Option<T>`).
    fn from_null() -> Result<Self> {
        Err(Error::Decode("unexpected NULL value".into()))
    }

    /// Convert from a non-NULL value.
    fn from_value(value: &Value) -> Result<Self>;

    /// Convert from any value, dispatching NULL to [`from_null`](Self::from_null).
    fn from_any(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Self::from_null(),
            other => Self::from_value(other),
        }
    }
}

// === Option<T> - NULL handling ===

impl<T: FromValue> FromValue for Option<T> {
    fn from_null() -> Result<Self> {
        Ok(None)
    }

    fn from_value(value: &Value) -> Result<Self> {
        T::from_value(value).map(Some)
    }
}

impl FromValue for Value {
    fn from_null() -> Result<Self> {
        Ok(Value::Null)
    }

    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

// === Boolean ===

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(*v),
            Value::Int(v) => Ok(*v != 0),
            Value::UInt(v) => Ok(*v != 0),
            other => Err(Error::Decode(format!("cannot convert {:?} to bool", other))),
        }
    }
}

// === Integer types ===

macro_rules! impl_from_value_int {
    ($($t:ty),+) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &Value) -> Result<Self> {
                    match value {
                        Value::Int(v) => <$t>::try_from(*v).map_err(|e| {
                            Error::Decode(format!(
                                "{} out of range for {}: {}",
                                v,
                                stringify!($t),
                                e
                            ))
                        }),
                        Value::UInt(v) => <$t>::try_from(*v).map_err(|e| {
                            Error::Decode(format!(
                                "{} out of range for {}: {}",
                                v,
                                stringify!($t),
                                e
                            ))
                        }),
                        Value::Bool(v) => Ok(<$t>::from(*v)),
                        Value::String(s) => s.parse().map_err(|e| {
                            Error::Decode(format!("invalid {}: {}", stringify!($t), e))
                        }),
                        other => Err(Error::Decode(format!(
                            "cannot convert {:?} to {}",
                            other,
                            stringify!($t)
                        ))),
                    }
                }
            }
        )+
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

// === Floating point types ===

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            Value::UInt(v) => Ok(*v as f64),
            Value::String(s) => {
                parse_float(s).map_err(|e| Error::Decode(format!("invalid f64: {}", e)))
            }
            other => Err(Error::Decode(format!("cannot convert {:?} to f64", other))),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

// === String types ===

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Ok(other.to_string()),
        }
    }
}
