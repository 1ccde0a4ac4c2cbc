//! SQLite DDL rendering.

use oxide_db::Dialect;

use super::{ColumnRenderer, Fragment, TableContext};
use crate::column::{ColumnType, ForeignKeySpec, IndexSpec};

/// SQLite renderer.
///
/// CREATE TABLE cannot carry named indexes, so indexes become deferred
/// `CREATE INDEX` statements. Foreign keys are inline and unnamed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteRenderer;

impl ColumnRenderer for SqliteRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn type_keyword(&self, column_type: &ColumnType) -> &'static str {
        match column_type {
            ColumnType::String => "varchar",
            ColumnType::Char => "char",
            ColumnType::Text => "text",
            ColumnType::Blob => "blob",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Datetime => "datetime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Year => "year",
            ColumnType::Bit | ColumnType::Smallint | ColumnType::Int | ColumnType::Bigint => {
                "integer"
            }
            ColumnType::Bool => "boolean",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Decimal => "decimal",
            ColumnType::Raw(_) => "",
        }
    }

    fn integer_length(&self) -> bool {
        false
    }

    fn supports_unsigned(&self) -> bool {
        false
    }

    fn bool_default_required(&self) -> bool {
        true
    }

    fn autoincrement_keyword(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    fn supports_comment(&self) -> bool {
        false
    }

    fn render_index(&self, ctx: TableContext<'_>, index: &IndexSpec, unique: bool) -> Fragment {
        Fragment::Deferred(format!(
            "CREATE {}INDEX {}{} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            if ctx.if_not_exists { "IF NOT EXISTS " } else { "" },
            self.quote(&index.name),
            ctx.table_macro(),
            self.column_list(&index.columns)
        ))
    }

    fn render_foreign_key(&self, fk: &ForeignKeySpec) -> Fragment {
        Fragment::Inline(format!(
            "FOREIGN KEY ({}) {}",
            self.column_list(&fk.columns),
            self.references_clause(fk)
        ))
    }
}
