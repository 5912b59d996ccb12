use crate::gvas::PropertyValue;
use crate::CanonicalKey;
use std::collections::BTreeMap;
use std::fmt;

/// Sparse mapping of keys to values that differ from their default
pub type ValueStore = BTreeMap<CanonicalKey, Value>;

/// A reconciled value. Tracked entities use booleans; standalone settings
/// (eg: player upgrades) keep whatever scalar the save recorded.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(x) => Some(x),
            _ => None,
        }
    }

    /// Collapses the value to the found/not found state a marker shows
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(x) => *x,
            Value::Int(x) => *x != 0,
            Value::Float(x) => *x != 0.0,
            Value::Text(x) => !x.is_empty(),
        }
    }

    /// Converts a scalar property payload. Containers, object references,
    /// and opaque payloads have no scalar value.
    pub fn from_property(value: &PropertyValue) -> Option<Value> {
        let value = match value {
            PropertyValue::Bool(x) => Value::Bool(*x),
            PropertyValue::Int8(x) => Value::Int(i64::from(*x)),
            PropertyValue::Int16(x) => Value::Int(i64::from(*x)),
            PropertyValue::UInt16(x) => Value::Int(i64::from(*x)),
            PropertyValue::Int(x) => Value::Int(i64::from(*x)),
            PropertyValue::UInt32(x) => Value::Int(i64::from(*x)),
            PropertyValue::Int64(x) => Value::Int(*x),
            PropertyValue::UInt64(x) => Value::Int(i64::try_from(*x).ok()?),
            PropertyValue::Byte(x) => Value::Int(i64::from(*x)),
            PropertyValue::Float(x) => Value::Float(f64::from(*x)),
            PropertyValue::Double(x) => Value::Float(*x),
            PropertyValue::Str(x) | PropertyValue::Name(x) => Value::Text(x.clone()),
            PropertyValue::Enum { value, .. } => Value::Text(value.clone()),
            _ => return None,
        };

        Some(value)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Bool(false)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(x) => write!(f, "{}", x),
            Value::Int(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(x) => f.write_str(x),
        }
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Self {
        Value::Bool(x)
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Int(x)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(x: &str) -> Self {
        Value::Text(x.to_string())
    }
}

impl From<String> for Value {
    fn from(x: String) -> Self {
        Value::Text(x)
    }
}
