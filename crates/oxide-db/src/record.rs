//! Result rows.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DbError, Result};
use crate::value::Params;

/// A generic, untyped result row: column name to value, in select order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    columns: Params,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.columns.insert(column.into(), value);
    }

    /// Returns a column value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Returns a column as an integer.
    #[must_use]
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    /// Returns a column as a string slice.
    #[must_use]
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates over `(column, value)` pairs in select order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter()
    }

    /// Returns the underlying column map.
    #[must_use]
    pub fn into_inner(self) -> Params {
        self.columns
    }

    /// Maps the record onto a domain type.
    pub fn hydrate<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(Value::Object(self.columns))
            .map_err(|e| DbError::Hydration(e.to_string()))
    }
}

impl From<Params> for Record {
    fn from(columns: Params) -> Self {
        Self { columns }
    }
}
