//! Bind values and literal preparation.
//!
//! Parameters are plain [`serde_json::Value`]s keyed by name. Only scalars
//! can become SQL literals; arrays and objects are refused rather than
//! serialized by guesswork.

use serde_json::Value;

use crate::dialect::Dialect;
use crate::error::{DbError, Result};

/// Named bind parameters, keyed without the leading colon.
pub type Params = serde_json::Map<String, Value>;

/// Returns a short name for the JSON type of a value.
#[must_use]
pub const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fails with [`DbError::UnsupportedType`] if any value is not a scalar.
pub fn ensure_scalars<'a>(values: impl IntoIterator<Item = &'a Value>) -> Result<()> {
    for value in values {
        if matches!(value, Value::Array(_) | Value::Object(_)) {
            return Err(DbError::UnsupportedType(type_name(value)));
        }
    }
    Ok(())
}

/// Turns scalar values into dialect-safe SQL literals.
///
/// Every value that ends up inlined in SQL text goes through
/// [`ValuePreparer::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuePreparer {
    dialect: Dialect,
}

impl ValuePreparer {
    /// Creates a preparer for a dialect.
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Returns the dialect used for quoting.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the SQL literal for a value.
    ///
    /// Booleans and integers become bare integers, floats and strings become
    /// quoted literals, null becomes `null`.
    pub fn prepare(&self, value: &Value) -> Result<String> {
        match value {
            Value::Null => Ok(String::from("null")),
            Value::Bool(b) => Ok(String::from(if *b { "1" } else { "0" })),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            Value::Number(n) => Ok(self.dialect.quote_string(&n.to_string())),
            Value::String(s) => Ok(self.dialect.quote_string(s)),
            Value::Array(_) | Value::Object(_) => Err(DbError::UnsupportedType(type_name(value))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn prepare(dialect: Dialect, value: Value) -> String {
        ValuePreparer::new(dialect).prepare(&value).unwrap()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(prepare(Dialect::Mysql, json!(true)), "1");
        assert_eq!(prepare(Dialect::Mysql, json!(false)), "0");
        assert_eq!(prepare(Dialect::Mysql, json!(42)), "42");
        assert_eq!(prepare(Dialect::Mysql, json!(-7)), "-7");
        assert_eq!(prepare(Dialect::Mysql, json!(2.5)), "'2.5'");
        assert_eq!(prepare(Dialect::Mysql, Value::Null), "null");
        assert_eq!(prepare(Dialect::Sqlite, json!("hello")), "'hello'");
    }

    #[test]
    fn test_unsupported_types() {
        let preparer = ValuePreparer::new(Dialect::Sqlite);
        assert!(matches!(
            preparer.prepare(&json!([1, 2])),
            Err(DbError::UnsupportedType("array"))
        ));
        assert!(matches!(
            preparer.prepare(&json!({"a": 1})),
            Err(DbError::UnsupportedType("object"))
        ));
    }

    #[test]
    fn test_injection_payloads_stay_inside_literal() {
        let payloads = [
            "'; DROP TABLE users; --",
            "\\'; DROP TABLE users; --",
            "a''b",
            "\\",
            "x\\\\'",
        ];
        for dialect in [Dialect::Mysql, Dialect::Sqlite] {
            for payload in payloads {
                let literal = prepare(dialect, json!(payload));
                let segments = crate::scan::segments(&literal, dialect);
                assert_eq!(segments.len(), 1, "{dialect}: {literal}");
                assert!(matches!(segments[0], crate::scan::Segment::Literal(_)));
            }
        }
    }

    #[test]
    fn test_ensure_scalars() {
        assert!(ensure_scalars([&json!(1), &json!("a")]).is_ok());
        assert!(ensure_scalars([&json!(1), &json!({})]).is_err());
    }
}
