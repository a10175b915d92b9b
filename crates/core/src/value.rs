//! Property values, key values and rows.
//!
//! [`Value`] is what a row stores. [`KeyValue`] is the hashable subset of it that
//! may appear in a primary key, and [`PrincipalKey`] is the identity of a row
//! inside a table.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// A row: property name to value, ordered by property name.
pub type Row = BTreeMap<String, Value>;

/// Build a [`Row`] from `(name, value)` pairs.
///
/// ```
/// use keystone_core::value::{row, Value};
///
/// let r = row([("id", Value::Int(1)), ("title", Value::from("hello"))]);
/// assert_eq!(r.len(), 2);
/// ```
pub fn row<I, K, V>(fields: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float (never usable as a key)
    Float,
    /// UTF-8 string
    String,
    /// Raw bytes
    Bytes,
    /// UUID
    Uuid,
}

impl ScalarType {
    /// Whether values of this type can take part in a primary key.
    pub fn is_key_compatible(self) -> bool {
        !matches!(self, ScalarType::Float)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
            ScalarType::Uuid => "uuid",
        };
        f.write_str(name)
    }
}

/// A property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// Bytes
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
}

impl Value {
    /// Scalar type of this value, `None` for [`Value::Null`].
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ScalarType::Bool),
            Value::Int(_) => Some(ScalarType::Int),
            Value::Float(_) => Some(ScalarType::Float),
            Value::String(_) => Some(ScalarType::String),
            Value::Bytes(_) => Some(ScalarType::Bytes),
            Value::Uuid(_) => Some(ScalarType::Uuid),
        }
    }

    /// Check for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// JSON rendering used for documents.
    ///
    /// Bytes become an array of numbers, UUIDs their hyphenated string form and
    /// non-finite floats `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::from(b.clone()),
            Value::Uuid(u) => serde_json::Value::String(u.to_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A single primary-key component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// String
    String(String),
    /// Bytes
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
}

impl KeyValue {
    /// Convert a row value into a key component, `None` for nulls and floats.
    pub fn from_value(value: &Value) -> Option<KeyValue> {
        match value {
            Value::Bool(b) => Some(KeyValue::Bool(*b)),
            Value::Int(i) => Some(KeyValue::Int(*i)),
            Value::String(s) => Some(KeyValue::String(s.clone())),
            Value::Bytes(b) => Some(KeyValue::Bytes(b.clone())),
            Value::Uuid(u) => Some(KeyValue::Uuid(*u)),
            Value::Null | Value::Float(_) => None,
        }
    }

    /// Scalar type of this component.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            KeyValue::Bool(_) => ScalarType::Bool,
            KeyValue::Int(_) => ScalarType::Int,
            KeyValue::String(_) => ScalarType::String,
            KeyValue::Bytes(_) => ScalarType::Bytes,
            KeyValue::Uuid(_) => ScalarType::Uuid,
        }
    }

    /// Back to a row value.
    pub fn to_value(&self) -> Value {
        match self {
            KeyValue::Bool(b) => Value::Bool(*b),
            KeyValue::Int(i) => Value::Int(*i),
            KeyValue::String(s) => Value::String(s.clone()),
            KeyValue::Bytes(b) => Value::Bytes(b.clone()),
            KeyValue::Uuid(u) => Value::Uuid(*u),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Bool(b) => write!(f, "{}", b),
            KeyValue::Int(i) => write!(f, "{}", i),
            KeyValue::String(s) => write!(f, "'{}'", s),
            KeyValue::Bytes(b) => {
                f.write_str("0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            KeyValue::Uuid(u) => write!(f, "{}", u),
        }
    }
}

/// Identity of a row inside one table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrincipalKey {
    /// Key made of one property
    Single(KeyValue),
    /// Key made of several properties, in declaration order
    Composite(SmallVec<[KeyValue; 4]>),
}

impl PrincipalKey {
    /// Key components in declaration order.
    pub fn components(&self) -> &[KeyValue] {
        match self {
            PrincipalKey::Single(v) => std::slice::from_ref(v),
            PrincipalKey::Composite(vs) => vs.as_slice(),
        }
    }

    /// Render the key for diagnostics, honouring the sensitive-logging flag.
    pub fn render(&self, sensitive: bool) -> String {
        if sensitive {
            self.to_string()
        } else {
            crate::error::REDACTED.to_string()
        }
    }
}

impl fmt::Display for PrincipalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalKey::Single(v) => write!(f, "{{{}}}", v),
            PrincipalKey::Composite(vs) => {
                f.write_str("{")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("}")
            }
        }
    }
}
