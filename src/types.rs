use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

/// Values that can be stored in a result row or bound as statement parameters.
///
/// The set is closed: every value decoded from the remote service lands in one of
/// these variants, and the coercion engine dispatches on them.
/// ```rust
/// use sql_middleware_d1::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RowValues {
    /// NULL value
    #[default]
    Null,
    /// Signed integer value (64-bit)
    Int(i64),
    /// Unsigned integer value, used when a number does not fit in `i64`
    UInt(u64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Text/string value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
    /// Timestamp value, always UTC
    Timestamp(DateTime<Utc>),
}

/// The runtime category of a [`RowValues`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Int,
    UInt,
    Float,
    Bool,
    Text,
    Blob,
    Timestamp,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Int => "integer",
            ValueKind::UInt => "unsigned integer",
            ValueKind::Float => "float",
            ValueKind::Bool => "boolean",
            ValueKind::Text => "text",
            ValueKind::Blob => "blob",
            ValueKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            RowValues::Null => ValueKind::Null,
            RowValues::Int(_) => ValueKind::Int,
            RowValues::UInt(_) => ValueKind::UInt,
            RowValues::Float(_) => ValueKind::Float,
            RowValues::Bool(_) => ValueKind::Bool,
            RowValues::Text(_) => ValueKind::Text,
            RowValues::Blob(_) => ValueKind::Blob,
            RowValues::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        if let RowValues::Timestamp(value) = self {
            Some(*value)
        } else {
            None
        }
    }
}

/// Short rendering used in conversion error messages.
impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Null => f.write_str("NULL"),
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::UInt(u) => write!(f, "{u}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Bool(b) => write!(f, "{b}"),
            RowValues::Text(s) => write!(f, "{s:?}"),
            RowValues::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
            RowValues::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

impl From<&JsonValue> for RowValues {
    /// Decode a wire value. Integral numbers prefer `Int`, then `UInt`; nested
    /// arrays and objects are kept as their JSON text.
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RowValues::Int(i)
                } else if let Some(u) = n.as_u64() {
                    RowValues::UInt(u)
                } else {
                    RowValues::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => RowValues::Text(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => RowValues::Text(value.to_string()),
        }
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::String(s) => RowValues::Text(s),
            other => RowValues::from(&other),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<u64> for RowValues {
    fn from(value: u64) -> Self {
        RowValues::UInt(value)
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<DateTime<Utc>> for RowValues {
    fn from(value: DateTime<Utc>) -> Self {
        RowValues::Timestamp(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_wire_numbers_by_range() {
        assert_eq!(RowValues::from(&json!(42)), RowValues::Int(42));
        assert_eq!(RowValues::from(&json!(-7)), RowValues::Int(-7));
        assert_eq!(
            RowValues::from(&json!(u64::MAX)),
            RowValues::UInt(u64::MAX)
        );
        assert_eq!(RowValues::from(&json!(3.5)), RowValues::Float(3.5));
    }

    #[test]
    fn decodes_wire_scalars_and_nested_values() {
        assert_eq!(RowValues::from(&json!(null)), RowValues::Null);
        assert_eq!(RowValues::from(&json!(true)), RowValues::Bool(true));
        assert_eq!(RowValues::from(json!("abc")), RowValues::Text("abc".into()));
        assert_eq!(
            RowValues::from(&json!([1, 2])),
            RowValues::Text("[1,2]".into())
        );
    }

    #[test]
    fn kinds_and_accessors() {
        assert_eq!(RowValues::Int(1).kind(), ValueKind::Int);
        assert_eq!(RowValues::Int(1).as_bool(), Some(&true));
        assert_eq!(RowValues::Int(5).as_bool(), None);
        assert!(RowValues::default().is_null());
        assert_eq!(RowValues::from(None::<i64>), RowValues::Null);
        assert_eq!(ValueKind::UInt.to_string(), "unsigned integer");
    }
}
