//! Dialect-specific DDL rendering.
//!
//! Column declarations are dialect-agnostic; a [`ColumnRenderer`] lowers
//! them to DDL fragments for one dialect. Renderers are looked up in a
//! [`RendererRegistry`] keyed by [`Dialect`].

mod mysql;
mod sqlite;

use std::collections::HashMap;

pub use mysql::MysqlRenderer;
pub use sqlite::SqliteRenderer;

use oxide_db::statement::table_macro;
use oxide_db::Dialect;

use crate::column::{ColumnSpec, ColumnType, DataColumn, DefaultValue, ForeignKeySpec, IndexSpec};
use crate::error::{Result, SchemaError};

/// A rendered constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Goes inside the CREATE TABLE parentheses.
    Inline(String),
    /// A separate statement run after CREATE TABLE.
    Deferred(String),
}

/// The table a constraint is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableContext<'a> {
    /// Unprefixed table name; rendered as a `{{name}}` macro.
    pub table: &'a str,
    /// Whether deferred statements tolerate existing objects.
    pub if_not_exists: bool,
}

impl<'a> TableContext<'a> {
    /// Context for a plain CREATE TABLE.
    #[must_use]
    pub const fn new(table: &'a str) -> Self {
        Self {
            table,
            if_not_exists: false,
        }
    }

    /// Returns the table as a prefix macro.
    #[must_use]
    pub fn table_macro(&self) -> String {
        table_macro(self.table)
    }
}

/// Lowers column and constraint descriptors to DDL for one dialect.
pub trait ColumnRenderer: Send + Sync {
    /// Dialect this renderer produces.
    fn dialect(&self) -> Dialect;

    /// Type keyword, without length or precision.
    fn type_keyword(&self, column_type: &ColumnType) -> &'static str;

    /// Whether integer types carry a `(length)`.
    fn integer_length(&self) -> bool;

    /// Whether UNSIGNED is supported.
    fn supports_unsigned(&self) -> bool;

    /// Whether boolean columns always get a DEFAULT, `NULL` when unset.
    fn bool_default_required(&self) -> bool;

    /// Keyword appended after PRIMARY KEY for auto-increment columns.
    fn autoincrement_keyword(&self) -> &'static str;

    /// Whether COMMENT clauses are rendered.
    fn supports_comment(&self) -> bool;

    /// Renders an index or unique index.
    fn render_index(&self, ctx: TableContext<'_>, index: &IndexSpec, unique: bool) -> Fragment;

    /// Renders a foreign key.
    fn render_foreign_key(&self, fk: &ForeignKeySpec) -> Fragment;

    /// Quotes an identifier.
    fn quote(&self, name: &str) -> String {
        self.dialect().quote_identifier(name)
    }

    /// Quotes and joins column names.
    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Renders a default value; `numeric` keeps numbers and numeric text unquoted.
    fn default_literal(&self, value: &DefaultValue, numeric: bool) -> String {
        let dialect = self.dialect();
        match value {
            DefaultValue::Null => String::from("NULL"),
            DefaultValue::Expression(expr) => expr.clone(),
            DefaultValue::Bool(b) => String::from(if *b { "1" } else { "0" }),
            DefaultValue::Int(i) if numeric => i.to_string(),
            DefaultValue::Float(f) if numeric => f.to_string(),
            DefaultValue::Int(i) => dialect.quote_string(&i.to_string()),
            DefaultValue::Float(f) => dialect.quote_string(&f.to_string()),
            DefaultValue::Text(s) if numeric && s.trim().parse::<f64>().is_ok() => {
                s.trim().to_string()
            }
            DefaultValue::Text(s) => dialect.quote_string(s),
        }
    }

    /// Renders the type clause: keyword, length or precision, UNSIGNED.
    fn type_clause(&self, column: &DataColumn, column_type: &ColumnType) -> String {
        let mut sql = String::from(self.type_keyword(column_type));
        match column_type {
            ColumnType::String | ColumnType::Char => {
                if let Some(length) = column.length {
                    sql.push_str(&format!("({length})"));
                }
            }
            t if t.is_integer() && self.integer_length() => {
                if let Some(length) = column.length {
                    sql.push_str(&format!("({length})"));
                }
            }
            t if t.is_fractional() => {
                if let Some((total, decimals)) = column.precision {
                    sql.push_str(&format!("({total}, {decimals})"));
                }
            }
            _ => {}
        }
        let unsigned_allowed = (column_type.is_integer() && *column_type != ColumnType::Bit)
            || column_type.is_fractional();
        if column.unsigned && unsigned_allowed && self.supports_unsigned() {
            sql.push_str(" UNSIGNED");
        }
        sql
    }

    /// Renders the DEFAULT clause, if the type takes one.
    fn default_clause(&self, column: &DataColumn, column_type: &ColumnType) -> Option<String> {
        let literal = match column_type {
            ColumnType::Text | ColumnType::Blob | ColumnType::Raw(_) => return None,
            ColumnType::Bool => match &column.default {
                Some(value) => self.default_literal(value, true),
                None if self.bool_default_required() => String::from("NULL"),
                None => return None,
            },
            ColumnType::Year => self.default_literal(column.default.as_ref()?, true),
            t if t.is_integer() || t.is_fractional() => {
                self.default_literal(column.default.as_ref()?, true)
            }
            _ => self.default_literal(column.default.as_ref()?, false),
        };
        Some(format!("DEFAULT {literal}"))
    }

    /// Renders a data column.
    ///
    /// Order: name, type clause, NOT NULL, DEFAULT, PRIMARY KEY with
    /// auto-increment, COMMENT. A raw definition is used verbatim after the name.
    fn render_column(&self, column: &DataColumn) -> String {
        let mut parts = vec![self.quote(&column.name)];
        let Some(column_type) = &column.column_type else {
            return parts.concat();
        };
        if let ColumnType::Raw(definition) = column_type {
            parts.push(definition.clone());
            return parts.join(" ");
        }

        parts.push(self.type_clause(column, column_type));
        if !column.nullable {
            parts.push(String::from("NOT NULL"));
        }
        if let Some(default) = self.default_clause(column, column_type) {
            parts.push(default);
        }
        if column.primary_key {
            parts.push(String::from("PRIMARY KEY"));
            if column.auto_increment {
                parts.push(String::from(self.autoincrement_keyword()));
            }
        }
        if let (Some(comment), true) = (&column.comment, self.supports_comment()) {
            parts.push(format!("COMMENT {}", self.dialect().quote_string(comment)));
        }
        parts.join(" ")
    }

    /// Renders any table entry.
    fn render_constraint(&self, ctx: TableContext<'_>, spec: &ColumnSpec) -> Fragment {
        match spec {
            ColumnSpec::Data(column) => Fragment::Inline(self.render_column(column)),
            ColumnSpec::Index(index) => self.render_index(ctx, index, false),
            ColumnSpec::Unique(index) => self.render_index(ctx, index, true),
            ColumnSpec::ForeignKey(fk) => self.render_foreign_key(fk),
        }
    }

    /// Renders `REFERENCES {{table}} (cols) ON UPDATE x ON DELETE y`.
    fn references_clause(&self, fk: &ForeignKeySpec) -> String {
        format!(
            "REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
            table_macro(&fk.references_table),
            self.column_list(&fk.references_columns),
            fk.on_update.as_sql(),
            fk.on_delete.as_sql()
        )
    }
}

static MYSQL: MysqlRenderer = MysqlRenderer;
static SQLITE: SqliteRenderer = SqliteRenderer;

/// Renderers keyed by dialect.
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<Dialect, &'static dyn ColumnRenderer>,
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("dialects", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(&MYSQL);
        registry.register(&SQLITE);
        registry
    }
}

impl RendererRegistry {
    /// Creates a registry without renderers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Registers a renderer for its dialect, replacing any previous one.
    pub fn register(&mut self, renderer: &'static dyn ColumnRenderer) {
        self.renderers.insert(renderer.dialect(), renderer);
    }

    /// Returns the renderer for a dialect.
    pub fn get(&self, dialect: Dialect) -> Result<&'static dyn ColumnRenderer> {
        self.renderers
            .get(&dialect)
            .copied()
            .ok_or(SchemaError::UnsupportedDialect(dialect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableSpec;

    fn single_column(f: impl FnOnce(&mut TableSpec)) -> DataColumn {
        let mut t = TableSpec::new("t");
        f(&mut t);
        t.columns()[0].clone()
    }

    #[test]
    fn test_string_round_trip() {
        let column = single_column(|t| {
            t.column("col").string(50).nullable(false).default_val("x");
        });
        assert_eq!(
            MYSQL.render_column(&column),
            "`col` varchar(50) NOT NULL DEFAULT 'x'"
        );
        assert_eq!(
            SQLITE.render_column(&column),
            "\"col\" varchar(50) NOT NULL DEFAULT 'x'"
        );
    }

    #[test]
    fn test_modifier_order_does_not_matter() {
        let a = single_column(|t| {
            t.column("c").default_val("x").nullable(false).string(50);
        });
        let b = single_column(|t| {
            t.column("c").string(50).nullable(false).default_val("x");
        });
        assert_eq!(MYSQL.render_column(&a), MYSQL.render_column(&b));
    }

    #[test]
    fn test_registry() {
        let registry = RendererRegistry::default();
        assert_eq!(registry.get(Dialect::Mysql).unwrap().dialect(), Dialect::Mysql);
        assert_eq!(registry.get(Dialect::Sqlite).unwrap().dialect(), Dialect::Sqlite);
        assert!(matches!(
            registry.get(Dialect::Pgsql),
            Err(SchemaError::UnsupportedDialect(Dialect::Pgsql))
        ));
        assert!(RendererRegistry::empty().get(Dialect::Mysql).is_err());
    }

    #[test]
    fn test_text_and_blob_take_no_default() {
        let column = single_column(|t| {
            t.column("body").text().default_val("ignored");
        });
        assert_eq!(SQLITE.render_column(&column), "\"body\" text");
    }

    #[test]
    fn test_raw_bypasses_modifiers() {
        let column = single_column(|t| {
            t.column("geo")
                .manual_raw("POINT NOT NULL SRID 4326")
                .nullable(false)
                .default_val(1);
        });
        assert_eq!(MYSQL.render_column(&column), "`geo` POINT NOT NULL SRID 4326");
    }

    #[test]
    fn test_default_escaping() {
        let column = single_column(|t| {
            t.column("c").string(10).default_val("it's");
        });
        assert_eq!(MYSQL.render_column(&column), "`c` varchar(10) DEFAULT 'it\\'s'");
        assert_eq!(SQLITE.render_column(&column), "\"c\" varchar(10) DEFAULT 'it''s'");
    }
}
