//! SQL values and parameter handling.
//!
//! Every value bound to a statement, read from a parameter source or produced
//! by an expression is a [`SqlValue`].

use chrono::NaiveDateTime;
use serde::Serialize;

/// A SQL value that can be used as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// Timestamp without time zone.
    Timestamp(NaiveDateTime),
    /// An enumerable value, expanded item by item inside `IN (...)`.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Returns true if the value is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true if the value is a collection of values.
    #[must_use]
    pub const fn is_enumerable(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Returns true for an empty text value.
    #[must_use]
    pub fn is_empty_text(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }

    /// Builds an array value from anything convertible to SQL values.
    #[must_use]
    pub fn array<T: ToSqlValue>(items: impl IntoIterator<Item = T>) -> Self {
        Self::Array(items.into_iter().map(ToSqlValue::to_sql_value).collect())
    }

    /// Truthiness used by template conditions.
    ///
    /// NULL, `false`, zero, the empty string and empty arrays are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::Blob(b) => !b.is_empty(),
            Self::Timestamp(_) => true,
            Self::Array(items) => !items.is_empty(),
        }
    }

    /// Returns the name of the value kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Timestamp(_) => "timestamp",
            Self::Array(_) => "array",
        }
    }

    /// Returns the SQL representation for inline use (escaped).
    ///
    /// **Warning**: Prefer using parameterized queries instead.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Text(s) => {
                // Escape single quotes by doubling them
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S")),
            Self::Array(items) => {
                let inner: Vec<String> = items.iter().map(Self::to_sql_inline).collect();
                format!("({})", inner.join(", "))
            }
        }
    }

    /// Returns the raw text substituted by replacement parameters.
    ///
    /// NULL becomes the empty string and arrays are joined with commas.
    #[must_use]
    pub fn to_replacement_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Blob(b) => String::from_utf8_lossy(b).into_owned(),
            Self::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Array(items) => items
                .iter()
                .map(Self::to_replacement_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Returns the parameter placeholder.
    #[must_use]
    pub const fn placeholder() -> &'static str {
        "?"
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            // Nested objects are passed through as their JSON text.
            Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Timestamp(self)
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl ToSqlValue for Vec<SqlValue> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Array(self)
    }
}

impl ToSqlValue for Vec<i64> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::array(self)
    }
}

impl ToSqlValue for Vec<String> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::array(self)
    }
}

impl ToSqlValue for Vec<&str> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::array(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_inline_null() {
        assert_eq!(SqlValue::Null.to_sql_inline(), "NULL");
    }

    #[test]
    fn test_sql_value_inline_text_escaping() {
        assert_eq!(
            SqlValue::Text(String::from("O'Brien")).to_sql_inline(),
            "'O''Brien'"
        );
    }

    #[test]
    fn test_sql_value_inline_array() {
        let value = SqlValue::array(vec![1_i64, 2, 3]);
        assert_eq!(value.to_sql_inline(), "(1, 2, 3)");
    }

    #[test]
    fn test_replacement_text() {
        assert_eq!(SqlValue::Null.to_replacement_text(), "");
        assert_eq!(SqlValue::Int(7).to_replacement_text(), "7");
        assert_eq!(
            SqlValue::array(vec!["a", "b"]).to_replacement_text(),
            "a,b"
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!SqlValue::Null.is_truthy());
        assert!(!SqlValue::Int(0).is_truthy());
        assert!(!SqlValue::Text(String::new()).is_truthy());
        assert!(!SqlValue::Array(vec![]).is_truthy());
        assert!(SqlValue::Bool(true).is_truthy());
        assert!(SqlValue::Text(String::from("x")).is_truthy());
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!([1, "two", null, 2.5, true]);
        assert_eq!(
            SqlValue::from(json),
            SqlValue::Array(vec![
                SqlValue::Int(1),
                SqlValue::Text(String::from("two")),
                SqlValue::Null,
                SqlValue::Float(2.5),
                SqlValue::Bool(true),
            ])
        );
    }

    #[test]
    fn test_to_sql_value_conversions() {
        assert_eq!(true.to_sql_value(), SqlValue::Bool(true));
        assert_eq!(42_i32.to_sql_value(), SqlValue::Int(42));
        assert_eq!(None::<i32>.to_sql_value(), SqlValue::Null);
        assert_eq!(
            vec![1_i64, 2].to_sql_value(),
            SqlValue::Array(vec![SqlValue::Int(1), SqlValue::Int(2)])
        );
    }
}
