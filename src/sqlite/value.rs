//! Core value types exchanged between records and SQLite.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

use super::entity::FieldType;
use super::error::{Result, SqliteError};

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
    Decimal(Decimal),
    DateTime(DateTime<Utc>),
}

/// A value could not be decoded into the requested Rust type.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct ValueError(pub String);

impl ValueError {
    fn mismatch(expected: &str, found: &Value) -> Self {
        ValueError(format!("expected {expected}, found {}", found.kind()))
    }
}

impl From<ValueError> for SqliteError {
    fn from(err: ValueError) -> Self {
        SqliteError::Conversion {
            column: String::new(),
            message: err.0,
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Boolean(_) => "boolean",
            Value::Decimal(_) => "decimal",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Decode into a field type. Null becomes `None` for `Option<T>` and the
    /// type's default otherwise.
    pub fn decode<T: FromValue>(self) -> std::result::Result<T, ValueError> {
        T::from_value(self)
    }

    /// Copy a column value out of a row. Text that is not valid UTF-8 is an error.
    pub(crate) fn from_sql_ref(column: &str, raw: ValueRef<'_>) -> Result<Self> {
        Ok(match raw {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(
                std::str::from_utf8(t)
                    .map_err(|e| SqliteError::conversion(column, format!("invalid UTF-8 text: {e}")))?
                    .to_string(),
            ),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        })
    }
}

/// Widen a stored value to the canonical representation of `field_type`.
///
/// Null passes through untouched so the record can apply its own empty value.
pub fn convert(column: &str, raw: Value, field_type: FieldType) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let widened = match field_type {
        FieldType::Text => raw.decode::<String>().map(Value::Text),
        FieldType::Int32 => raw.decode::<i32>().map(|v| Value::Integer(v.into())),
        FieldType::Int64 => raw.decode::<i64>().map(Value::Integer),
        FieldType::Bool => raw.decode::<bool>().map(Value::Boolean),
        FieldType::Double => raw.decode::<f64>().map(Value::Real),
        FieldType::Float => raw.decode::<f32>().map(|v| Value::Real(v.into())),
        FieldType::Decimal => raw.decode::<Decimal>().map(Value::Decimal),
        FieldType::DateTime => raw.decode::<DateTime<Utc>>().map(Value::DateTime),
        FieldType::Blob => raw.decode::<Vec<u8>>().map(Value::Blob),
    };
    widened.map_err(|e| SqliteError::conversion(column, e.0))
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Decimal(d) => {
                let real = d.to_f64().ok_or_else(|| {
                    rusqlite::Error::ToSqlConversionFailure(
                        format!("decimal {d} is out of range for REAL").into(),
                    )
                })?;
                ToSqlOutput::Owned(SqlValue::Real(real))
            }
            Value::DateTime(dt) => {
                ToSqlOutput::Owned(SqlValue::Text(dt.to_rfc3339_opts(SecondsFormat::Nanos, true)))
            }
        })
    }
}

/// Decoding from a stored [`Value`] into a record field.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError>;
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(s) => Ok(s),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Real(f) => Ok(f.to_string()),
            Value::Decimal(d) => Ok(d.to_string()),
            other => Err(ValueError::mismatch("text", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Null => Ok(0),
            Value::Integer(i) => Ok(i),
            Value::Boolean(b) => Ok(i64::from(b)),
            other => Err(ValueError::mismatch("integer", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| ValueError(format!("{wide} does not fit in a 32-bit integer")))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Null => Ok(false),
            Value::Boolean(b) => Ok(b),
            Value::Integer(i) => Ok(i != 0),
            other => Err(ValueError::mismatch("boolean", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Null => Ok(0.0),
            Value::Real(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            Value::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| ValueError(format!("decimal {d} is out of range for f64"))),
            other => Err(ValueError::mismatch("real", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Null => Ok(Decimal::ZERO),
            Value::Decimal(d) => Ok(d),
            Value::Integer(i) => Ok(Decimal::from(i)),
            // f64 Display is the shortest text that round-trips, so 19.99 stays 19.99.
            Value::Real(f) => Decimal::from_str(&f.to_string())
                .map_err(|e| ValueError(format!("real {f} is not a valid decimal: {e}"))),
            Value::Text(s) => Decimal::from_str(&s)
                .map_err(|e| ValueError(format!("'{s}' is not a valid decimal: {e}"))),
            other => Err(ValueError::mismatch("decimal", &other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Null => Ok(DateTime::<Utc>::default()),
            Value::DateTime(dt) => Ok(dt),
            Value::Text(s) => parse_datetime(&s),
            other => Err(ValueError::mismatch("datetime", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Blob(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(ValueError::mismatch("blob", &other)),
        }
    }
}

fn parse_datetime(text: &str) -> std::result::Result<DateTime<Utc>, ValueError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    // SQLite's CURRENT_TIMESTAMP form, always UTC.
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| ValueError(format!("'{text}' is not a valid datetime: {e}")))
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    i64 => Integer,
    i32 => Integer,
    u32 => Integer,
    f64 => Real,
    f32 => Real,
    bool => Boolean,
    String => Text,
    Vec<u8> => Blob,
    Decimal => Decimal,
    DateTime<Utc> => DateTime,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
