///
/// Scalar Value Representation
///
/// Every bound parameter and every materialized result cell flows through
/// `Value`, a closed variant over the five SQLite storage classes:
///
/// - `Null`, `Integer` (64-bit signed), `Float` (64-bit), `Text`, `Blob`
///
/// Construction is rule-ordered: integral sources become `Integer`,
/// string-like sources become `Text`, float and byte sources land in the
/// matching slot, and any other serde-serializable type falls back to an
/// opaque `Blob` payload via [`Value::serialize`].
///
/// Conversion out is rule-ordered per target type and total: it either
/// follows a valid coercion path or fails with [`DaoError::Conversion`].
/// Typed extraction goes through the [`FromValue`] trait and
/// [`Value::to`].
///

use indexmap::IndexMap;
use rusqlite::types::{Null, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DaoError;

/// One scalar cell: exactly one of the five storage states at all times.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// True iff the stored state is `Null`.
    pub fn empty(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Diagnostic label for the stored state, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    /// Opaque-type fallback: store the serialized byte representation of
    /// any serde-serializable value as a `Blob`.
    pub fn serialize<T: Serialize>(value: &T) -> Result<Value, DaoError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| DaoError::Conversion(format!("serialize failed: {e}")))?;
        Ok(Value::Blob(bytes))
    }

    /// Opaque-type extraction: deserialize the stored `Blob` payload into
    /// the requested type. Any other stored state is a conversion error.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DaoError> {
        match self {
            Value::Blob(bytes) => serde_json::from_slice(bytes)
                .map_err(|e| DaoError::Conversion(format!("deserialize failed: {e}"))),
            other => Err(DaoError::Conversion(format!(
                "{} to opaque payload",
                other.type_name()
            ))),
        }
    }

    /// Coerce to a 64-bit integer. Floats truncate toward zero, text is
    /// parsed, blobs go through opaque deserialization.
    pub fn to_i64(&self) -> Result<i64, DaoError> {
        match self {
            Value::Integer(i) => Ok(*i),
            Value::Float(f) => Ok(*f as i64),
            Value::Text(s) => s
                .parse::<i64>()
                .map_err(|_| DaoError::Conversion(format!("text '{s}' to integer"))),
            Value::Blob(_) => self.decode::<i64>(),
            Value::Null => Err(DaoError::Conversion("null to integer".to_string())),
        }
    }

    /// Coerce to a 64-bit float. Integers widen, text is parsed, blobs go
    /// through opaque deserialization.
    pub fn to_f64(&self) -> Result<f64, DaoError> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            Value::Text(s) => s
                .parse::<f64>()
                .map_err(|_| DaoError::Conversion(format!("text '{s}' to float"))),
            Value::Blob(_) => self.decode::<f64>(),
            Value::Null => Err(DaoError::Conversion("null to float".to_string())),
        }
    }

    /// Coerce to text. Numbers format in decimal; blobs go through opaque
    /// deserialization of a string payload.
    pub fn to_text(&self) -> Result<String, DaoError> {
        match self {
            Value::Text(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Blob(_) => self.decode::<String>(),
            Value::Null => Err(DaoError::Conversion("null to text".to_string())),
        }
    }

    /// Return the stored byte sequence. Exact-slot rule: only a `Blob`
    /// state converts; nothing else coerces to bytes.
    pub fn to_blob(&self) -> Result<Vec<u8>, DaoError> {
        match self {
            Value::Blob(b) => Ok(b.clone()),
            other => Err(DaoError::Conversion(format!("{} to blob", other.type_name()))),
        }
    }

    pub fn to_bool(&self) -> Result<bool, DaoError> {
        Ok(self.to_i64()? != 0)
    }

    /// Type-directed extraction for any [`FromValue`] target.
    pub fn to<T: FromValue>(&self) -> Result<T, DaoError> {
        T::from_value(self)
    }
}

/// Typed extraction from a [`Value`], dispatched per concrete target type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, DaoError>;
}

macro_rules! integral_from_value {
    ($($t:ty),*) => {
        $(impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, DaoError> {
                Ok(value.to_i64()? as $t)
            }
        })*
    };
}

integral_from_value!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, DaoError> {
        value.to_bool()
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, DaoError> {
        Ok(value.to_f64()? as f32)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, DaoError> {
        value.to_f64()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, DaoError> {
        value.to_text()
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self, DaoError> {
        value.to_blob()
    }
}

macro_rules! integral_into_value {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(v as i64)
            }
        })*
    };
}

integral_into_value!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl ToSql for Value {
    /// Engine-side bind dispatch. An empty blob binds SQL NULL, matching
    /// the materialization convention for zero-length payloads.
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Null => Ok(ToSqlOutput::from(Null)),
            Value::Integer(i) => Ok(ToSqlOutput::from(*i)),
            Value::Float(f) => Ok(ToSqlOutput::from(*f)),
            Value::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            Value::Blob(b) if b.is_empty() => Ok(ToSqlOutput::from(Null)),
            Value::Blob(b) => Ok(ToSqlOutput::from(b.as_slice())),
        }
    }
}

impl From<ValueRef<'_>> for Value {
    /// Engine-side decode dispatch: the reported column storage class maps
    /// onto the matching variant.
    fn from(cell: ValueRef<'_>) -> Self {
        match cell {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Float(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// An ordered `column name -> Value` map describing one logical row, used
/// by the adapter's insert/update/delete operators. Insertion order is
/// preserved so generated SQL is deterministic; last write per key wins.
#[derive(Debug, Clone, Default)]
pub struct Values {
    entries: IndexMap<String, Value>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chaining setter: `Values::new().set("id", 1).set("name", "Tom")`.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
