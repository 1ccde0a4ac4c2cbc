//! MySQL DDL rendering.

use oxide_db::Dialect;

use super::{ColumnRenderer, Fragment, TableContext};
use crate::column::{ColumnType, ForeignKeySpec, IndexSpec};

/// MySQL / MariaDB renderer. Indexes and foreign keys are inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlRenderer;

impl ColumnRenderer for MysqlRenderer {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
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
            ColumnType::Bit => "bit",
            ColumnType::Bool => "boolean",
            ColumnType::Smallint => "smallint",
            ColumnType::Int => "int",
            ColumnType::Bigint => "bigint",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Decimal => "decimal",
            ColumnType::Raw(_) => "",
        }
    }

    fn integer_length(&self) -> bool {
        true
    }

    fn supports_unsigned(&self) -> bool {
        true
    }

    fn bool_default_required(&self) -> bool {
        false
    }

    fn autoincrement_keyword(&self) -> &'static str {
        "AUTO_INCREMENT"
    }

    fn supports_comment(&self) -> bool {
        true
    }

    fn render_index(&self, _ctx: TableContext<'_>, index: &IndexSpec, unique: bool) -> Fragment {
        Fragment::Inline(format!(
            "{}INDEX {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote(&index.name),
            self.column_list(&index.columns)
        ))
    }

    fn render_foreign_key(&self, fk: &ForeignKeySpec) -> Fragment {
        Fragment::Inline(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) {}",
            self.quote(&fk.name),
            self.column_list(&fk.columns),
            self.references_clause(fk)
        ))
    }
}
