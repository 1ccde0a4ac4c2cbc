//! Column, index and foreign-key descriptors.
//!
//! Descriptors are dialect-agnostic; see [`crate::render`] for how they lower
//! to DDL.

use std::fmt;
use std::str::FromStr;

use crate::error::SchemaIntegrityError;

/// Semantic column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// Variable-length string, `varchar(len)`.
    String,
    /// Fixed-length string, `char(len)`.
    Char,
    /// Unbounded text.
    Text,
    /// Binary data.
    Blob,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Datetime,
    /// Timestamp.
    Timestamp,
    /// Four-digit year.
    Year,
    /// Bit field.
    Bit,
    /// Boolean.
    Bool,
    /// Small integer.
    Smallint,
    /// Integer.
    Int,
    /// Big integer.
    Bigint,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// Fixed-point decimal.
    Decimal,
    /// Column definition text used verbatim after the name.
    Raw(String),
}

impl ColumnType {
    /// Whether the type belongs to the integer family.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Bit | Self::Smallint | Self::Int | Self::Bigint)
    }

    /// Whether the type takes a `(total, decimals)` precision.
    #[must_use]
    pub const fn is_fractional(&self) -> bool {
        matches!(self, Self::Float | Self::Double | Self::Decimal)
    }

    /// Whether the type is a date or time type.
    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date | Self::Time | Self::Datetime | Self::Timestamp | Self::Year
        )
    }
}

/// Default value of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Int(i64),
    /// Float default.
    Float(f64),
    /// Text default, quoted when rendered.
    Text(String),
    /// SQL expression used verbatim (e.g. `CURRENT_TIMESTAMP`).
    Expression(String),
}

impl From<bool> for DefaultValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for DefaultValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for DefaultValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for DefaultValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for DefaultValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A data column.
#[derive(Debug, Clone, PartialEq)]
pub struct DataColumn {
    /// Column name.
    pub name: String,
    /// Declared type; `None` until a type method is called.
    pub column_type: Option<ColumnType>,
    /// Length for string and integer types.
    pub length: Option<u32>,
    /// `(total, decimals)` for fractional types.
    pub precision: Option<(u32, u32)>,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether the column is unsigned (MySQL).
    pub unsigned: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// Column comment (MySQL).
    pub comment: Option<String>,
    /// Whether this is the primary key.
    pub primary_key: bool,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
}

impl DataColumn {
    /// Creates an untyped, nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: None,
            length: None,
            precision: None,
            nullable: true,
            unsigned: false,
            default: None,
            comment: None,
            primary_key: false,
            auto_increment: false,
        }
    }
}

/// A plain or unique index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name.
    pub name: String,
    /// Indexed columns.
    pub columns: Vec<String>,
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignKeyAction {
    /// No action.
    #[default]
    NoAction,
    /// Restrict deletion/update.
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set to NULL.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Parses an action, ignoring case and extra whitespace.
///
/// The error carries the normalized input; callers attach the clause.
impl FromStr for ForeignKeyAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        match normalized.as_str() {
            "NO ACTION" => Ok(Self::NoAction),
            "RESTRICT" => Ok(Self::Restrict),
            "CASCADE" => Ok(Self::Cascade),
            "SET NULL" => Ok(Self::SetNull),
            "SET DEFAULT" => Ok(Self::SetDefault),
            _ => Err(s.to_string()),
        }
    }
}

impl ForeignKeyAction {
    pub(crate) fn parse_for(clause: &'static str, action: &str) -> Result<Self, SchemaIntegrityError> {
        action
            .parse()
            .map_err(|action| SchemaIntegrityError::InvalidReferentialAction { clause, action })
    }
}

/// A foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySpec {
    /// Constraint name.
    pub name: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table, without prefix.
    pub references_table: String,
    /// Referenced columns.
    pub references_columns: Vec<String>,
    /// Action on update.
    pub on_update: ForeignKeyAction,
    /// Action on delete.
    pub on_delete: ForeignKeyAction,
}

/// One entry of a table definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSpec {
    /// A data column.
    Data(DataColumn),
    /// A plain index.
    Index(IndexSpec),
    /// A unique index.
    Unique(IndexSpec),
    /// A foreign key.
    ForeignKey(ForeignKeySpec),
}

impl ColumnSpec {
    /// Column or constraint name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Data(c) => &c.name,
            Self::Index(i) | Self::Unique(i) => &i.name,
            Self::ForeignKey(fk) => &fk.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        assert_eq!("cascade".parse(), Ok(ForeignKeyAction::Cascade));
        assert_eq!("set  null".parse(), Ok(ForeignKeyAction::SetNull));
        assert_eq!(" No Action ".parse(), Ok(ForeignKeyAction::NoAction));
        assert_eq!(
            "DROP".parse::<ForeignKeyAction>(),
            Err(String::from("DROP"))
        );
    }

    #[test]
    fn test_parse_for_names_clause() {
        assert_eq!(
            ForeignKeyAction::parse_for("DELETE", "explode"),
            Err(SchemaIntegrityError::InvalidReferentialAction {
                clause: "DELETE",
                action: String::from("explode"),
            })
        );
    }

    #[test]
    fn test_type_families() {
        assert!(ColumnType::Bit.is_integer());
        assert!(ColumnType::Decimal.is_fractional());
        assert!(ColumnType::Year.is_temporal());
        assert!(!ColumnType::Raw(String::from("int")).is_integer());
    }
}
