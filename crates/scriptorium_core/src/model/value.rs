//! Dynamic field values.
//!
//! # Responsibility
//! - Represent one column value as a tagged variant.
//! - Convert between SQLite storage classes and the declared column kind.
//!
//! # Invariants
//! - Decoding never truncates or coerces: a stored value that does not match
//!   the declared kind is reported as a mismatch.
//! - `Timestamp` values are epoch milliseconds.

use rusqlite::types::{Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Declared kind of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Timestamp,
    /// Stored as integer `0`/`1`.
    Bool,
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Timestamp => "timestamp",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// One column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Timestamp(i64),
    Bool(bool),
}

impl FieldValue {
    /// Returns the kind carried by this value, `None` for `Null`.
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(FieldKind::Text),
            Self::Integer(_) => Some(FieldKind::Integer),
            Self::Timestamp(_) => Some(FieldKind::Timestamp),
            Self::Bool(_) => Some(FieldKind::Bool),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Self::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Short name used in mismatch diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Timestamp(_) => "timestamp",
            Self::Bool(_) => "bool",
        }
    }

    /// Returns whether this value may be written to a column of `kind`.
    pub fn fits(&self, kind: FieldKind) -> bool {
        self.kind().map_or(true, |own| own == kind)
    }

    pub(crate) fn to_sql(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Text(value) => Value::Text(value.clone()),
            Self::Integer(value) | Self::Timestamp(value) => Value::Integer(*value),
            Self::Bool(value) => Value::Integer(i64::from(*value)),
        }
    }

    /// Decodes a stored value against the declared column kind.
    ///
    /// On mismatch returns the storage class that was actually found.
    pub(crate) fn from_sql(raw: ValueRef<'_>, kind: FieldKind) -> Result<Self, &'static str> {
        match (raw, kind) {
            (ValueRef::Null, _) => Ok(Self::Null),
            (ValueRef::Text(bytes), FieldKind::Text) => std::str::from_utf8(bytes)
                .map(|text| Self::Text(text.to_string()))
                .map_err(|_| "invalid utf-8 text"),
            (ValueRef::Integer(value), FieldKind::Integer) => Ok(Self::Integer(value)),
            (ValueRef::Integer(value), FieldKind::Timestamp) => Ok(Self::Timestamp(value)),
            (ValueRef::Integer(0), FieldKind::Bool) => Ok(Self::Bool(false)),
            (ValueRef::Integer(1), FieldKind::Bool) => Ok(Self::Bool(true)),
            (ValueRef::Integer(_), _) => Err("integer"),
            (ValueRef::Real(_), _) => Err("real"),
            (ValueRef::Text(_), _) => Err("text"),
            (ValueRef::Blob(_), _) => Err("blob"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldKind, FieldValue};
    use rusqlite::types::ValueRef;

    #[test]
    fn decodes_integer_as_declared_kind() {
        assert_eq!(
            FieldValue::from_sql(ValueRef::Integer(7), FieldKind::Timestamp),
            Ok(FieldValue::Timestamp(7))
        );
        assert_eq!(
            FieldValue::from_sql(ValueRef::Integer(1), FieldKind::Bool),
            Ok(FieldValue::Bool(true))
        );
    }

    #[test]
    fn rejects_out_of_range_bool_instead_of_truncating() {
        assert_eq!(
            FieldValue::from_sql(ValueRef::Integer(2), FieldKind::Bool),
            Err("integer")
        );
    }

    #[test]
    fn rejects_text_stored_in_integer_column() {
        assert_eq!(
            FieldValue::from_sql(ValueRef::Text(b"abc"), FieldKind::Integer),
            Err("text")
        );
    }

    #[test]
    fn null_fits_every_kind() {
        assert!(FieldValue::Null.fits(FieldKind::Bool));
        assert!(FieldValue::from("x").fits(FieldKind::Text));
        assert!(!FieldValue::from(3_i64).fits(FieldKind::Text));
    }
}
