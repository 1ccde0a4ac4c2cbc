//! Table definitions.
//!
//! A [`TableSpec`] is populated by a migration callback through column and
//! foreign-key handles. Integrity violations are recorded as they happen and
//! the first one is reported by [`TableSpec::validate`], before any DDL is
//! rendered.
//!
//! ```ignore
//! |t: &mut TableSpec| {
//!     t.column("id").int().unsigned().primary_key().auto_increment();
//!     t.column("email").string(190).nullable(false).unique();
//!     t.column("created_at").datetime().default_expr("CURRENT_TIMESTAMP");
//!     t.foreign_key("fk_user_team", ["team_id"], "teams", ["id"])
//!         .on_delete("cascade");
//! }
//! ```

use crate::column::{
    ColumnSpec, ColumnType, DataColumn, DefaultValue, ForeignKeyAction, ForeignKeySpec, IndexSpec,
};
use crate::error::SchemaIntegrityError;

/// Columns and constraints of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    name: String,
    columns: Vec<DataColumn>,
    constraints: Vec<ColumnSpec>,
    primary_key: Option<String>,
    error: Option<SchemaIntegrityError>,
}

impl TableSpec {
    /// Creates an empty definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            primary_key: None,
            error: None,
        }
    }

    /// Table name, without prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[DataColumn] {
        &self.columns
    }

    /// Indexes and foreign keys in declaration order.
    #[must_use]
    pub fn constraints(&self) -> &[ColumnSpec] {
        &self.constraints
    }

    /// Returns a data column.
    #[must_use]
    pub fn column_spec(&self, name: &str) -> Option<&DataColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Name of the primary key column.
    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Declares a data column.
    pub fn column(&mut self, name: &str) -> ColumnHandle<'_> {
        let index = match self.columns.iter().position(|c| c.name == name) {
            Some(existing) => {
                self.fail(SchemaIntegrityError::DuplicateColumn(name.to_string()));
                existing
            }
            None => {
                self.columns.push(DataColumn::new(name));
                self.columns.len() - 1
            }
        };
        ColumnHandle { table: self, index }
    }

    /// Declares a plain index.
    pub fn index<I, S>(&mut self, name: &str, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_constraint(ColumnSpec::Index(IndexSpec {
            name: name.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
        }));
        self
    }

    /// Declares a unique index.
    pub fn unique<I, S>(&mut self, name: &str, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_constraint(ColumnSpec::Unique(IndexSpec {
            name: name.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
        }));
        self
    }

    /// Declares a foreign key; both actions default to `NO ACTION`.
    pub fn foreign_key<I, S, R, T>(
        &mut self,
        name: &str,
        columns: I,
        references_table: &str,
        references_columns: R,
    ) -> ForeignKeyHandle<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let index = self.add_constraint(ColumnSpec::ForeignKey(ForeignKeySpec {
            name: name.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
            references_table: references_table.to_string(),
            references_columns: references_columns.into_iter().map(Into::into).collect(),
            on_update: ForeignKeyAction::default(),
            on_delete: ForeignKeyAction::default(),
        }));
        ForeignKeyHandle { table: self, index }
    }

    /// Returns the first integrity violation, or checks that every column has a type.
    pub fn validate(&self) -> Result<(), SchemaIntegrityError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        match self.columns.iter().find(|c| c.column_type.is_none()) {
            Some(untyped) => Err(SchemaIntegrityError::MissingType(untyped.name.clone())),
            None => Ok(()),
        }
    }

    fn fail(&mut self, error: SchemaIntegrityError) {
        self.error.get_or_insert(error);
    }

    /// Appends a constraint and returns its position. A duplicate name is
    /// recorded and the existing position returned.
    fn add_constraint(&mut self, spec: ColumnSpec) -> usize {
        if let Some(existing) = self
            .constraints
            .iter()
            .position(|c| c.name() == spec.name())
        {
            self.fail(SchemaIntegrityError::DuplicateConstraint(
                spec.name().to_string(),
            ));
            return existing;
        }
        self.constraints.push(spec);
        self.constraints.len() - 1
    }
}

/// Fluent access to one data column of a [`TableSpec`].
#[derive(Debug)]
pub struct ColumnHandle<'t> {
    table: &'t mut TableSpec,
    index: usize,
}

impl ColumnHandle<'_> {
    fn column(&mut self) -> &mut DataColumn {
        &mut self.table.columns[self.index]
    }

    fn name(&self) -> String {
        self.table.columns[self.index].name.clone()
    }

    fn set_type(mut self, column_type: ColumnType) -> Self {
        if self.column().column_type.is_some() {
            let name = self.name();
            self.table.fail(SchemaIntegrityError::TypeRedeclared(name));
        } else {
            self.column().column_type = Some(column_type);
        }
        self
    }

    fn set_length(mut self, column_type: ColumnType, length: u32) -> Self {
        self.column().length = Some(length);
        self.set_type(column_type)
    }

    fn set_precision(mut self, column_type: ColumnType, total: u32, decimals: u32) -> Self {
        self.column().precision = Some((total, decimals));
        self.set_type(column_type)
    }

    /// `varchar(length)`.
    pub fn string(self, length: u32) -> Self {
        self.set_length(ColumnType::String, length)
    }

    /// `char(length)`.
    pub fn char(self, length: u32) -> Self {
        self.set_length(ColumnType::Char, length)
    }

    /// `text`.
    pub fn text(self) -> Self {
        self.set_type(ColumnType::Text)
    }

    /// `blob`.
    pub fn blob(self) -> Self {
        self.set_type(ColumnType::Blob)
    }

    /// `date`.
    pub fn date(self) -> Self {
        self.set_type(ColumnType::Date)
    }

    /// `time`.
    pub fn time(self) -> Self {
        self.set_type(ColumnType::Time)
    }

    /// `datetime`.
    pub fn datetime(self) -> Self {
        self.set_type(ColumnType::Datetime)
    }

    /// `timestamp`.
    pub fn timestamp(self) -> Self {
        self.set_type(ColumnType::Timestamp)
    }

    /// `year`.
    pub fn year(self) -> Self {
        self.set_type(ColumnType::Year)
    }

    /// `bit`; set a width with [`len`](Self::len).
    pub fn bit(self) -> Self {
        self.set_type(ColumnType::Bit)
    }

    /// `boolean`.
    pub fn bool(self) -> Self {
        self.set_type(ColumnType::Bool)
    }

    /// `smallint`; set a display width with [`len`](Self::len).
    pub fn smallint(self) -> Self {
        self.set_type(ColumnType::Smallint)
    }

    /// `int`; set a display width with [`len`](Self::len).
    pub fn int(self) -> Self {
        self.set_type(ColumnType::Int)
    }

    /// `bigint`; set a display width with [`len`](Self::len).
    pub fn bigint(self) -> Self {
        self.set_type(ColumnType::Bigint)
    }

    /// `float(total, decimals)`.
    pub fn float(self, total: u32, decimals: u32) -> Self {
        self.set_precision(ColumnType::Float, total, decimals)
    }

    /// `double(total, decimals)`.
    pub fn double(self, total: u32, decimals: u32) -> Self {
        self.set_precision(ColumnType::Double, total, decimals)
    }

    /// `decimal(total, decimals)`.
    pub fn decimal(self, total: u32, decimals: u32) -> Self {
        self.set_precision(ColumnType::Decimal, total, decimals)
    }

    /// Uses `definition` verbatim after the column name.
    pub fn manual_raw(self, definition: &str) -> Self {
        self.set_type(ColumnType::Raw(definition.to_string()))
    }

    /// Sets the length.
    pub fn len(mut self, length: u32) -> Self {
        self.column().length = Some(length);
        self
    }

    /// Allows or forbids NULL.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.column().nullable = nullable;
        self
    }

    /// Marks the column unsigned.
    pub fn unsigned(mut self) -> Self {
        self.column().unsigned = true;
        self
    }

    /// Sets a literal default.
    pub fn default_val(mut self, value: impl Into<DefaultValue>) -> Self {
        self.column().default = Some(value.into());
        self
    }

    /// Sets a default expression used verbatim.
    pub fn default_expr(mut self, expression: &str) -> Self {
        self.column().default = Some(DefaultValue::Expression(expression.to_string()));
        self
    }

    /// Sets the comment.
    pub fn comment(mut self, comment: &str) -> Self {
        self.column().comment = Some(comment.to_string());
        self
    }

    /// Makes this the primary key.
    pub fn primary_key(mut self) -> Self {
        let name = self.name();
        match self.table.primary_key.clone() {
            Some(existing) if existing != name => {
                self.table.fail(SchemaIntegrityError::DuplicatePrimaryKey {
                    existing,
                    attempted: name,
                });
            }
            _ => {
                self.table.primary_key = Some(name);
                self.column().primary_key = true;
            }
        }
        self
    }

    /// Marks the column auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.column().auto_increment = true;
        self
    }

    /// Adds an index named `idx_<column>` on this column.
    pub fn index(self) -> Self {
        let name = self.name();
        self.table.index(&format!("idx_{name}"), [name.as_str()]);
        self
    }

    /// Adds a unique index named `uniq_<column>` on this column.
    pub fn unique(self) -> Self {
        let name = self.name();
        self.table.unique(&format!("uniq_{name}"), [name.as_str()]);
        self
    }
}

/// Fluent access to one foreign key of a [`TableSpec`].
#[derive(Debug)]
pub struct ForeignKeyHandle<'t> {
    table: &'t mut TableSpec,
    index: usize,
}

impl ForeignKeyHandle<'_> {
    fn set_action(self, clause: &'static str, action: &str) -> Self {
        match ForeignKeyAction::parse_for(clause, action) {
            Ok(action) => {
                if let Some(ColumnSpec::ForeignKey(fk)) = self.table.constraints.get_mut(self.index)
                {
                    if clause == "UPDATE" {
                        fk.on_update = action;
                    } else {
                        fk.on_delete = action;
                    }
                }
            }
            Err(e) => self.table.fail(e),
        }
        self
    }

    /// Sets the ON UPDATE action (`cascade`, `restrict`, `set null`, `set default`, `no action`).
    pub fn on_update(self, action: &str) -> Self {
        self.set_action("UPDATE", action)
    }

    /// Sets the ON DELETE action.
    pub fn on_delete(self, action: &str) -> Self {
        self.set_action("DELETE", action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_primary_key() {
        let mut t = TableSpec::new("users");
        t.column("id").int().primary_key().auto_increment();
        t.column("name").string(50);
        assert!(t.validate().is_ok());
        assert_eq!(t.primary_key(), Some("id"));
    }

    #[test]
    fn test_second_primary_key_names_both() {
        let mut t = TableSpec::new("posts");
        t.column("id").int().primary_key();
        t.column("uuid").char(36).primary_key();
        assert_eq!(
            t.validate(),
            Err(SchemaIntegrityError::DuplicatePrimaryKey {
                existing: String::from("id"),
                attempted: String::from("uuid"),
            })
        );
        assert!(!t.column_spec("uuid").unwrap().primary_key);
    }

    #[test]
    fn test_first_error_wins() {
        let mut t = TableSpec::new("t");
        t.column("a").int().text();
        t.column("a");
        assert_eq!(
            t.validate(),
            Err(SchemaIntegrityError::TypeRedeclared(String::from("a")))
        );
    }

    #[test]
    fn test_missing_type() {
        let mut t = TableSpec::new("t");
        t.column("a").nullable(false);
        assert_eq!(
            t.validate(),
            Err(SchemaIntegrityError::MissingType(String::from("a")))
        );
    }

    #[test]
    fn test_companion_indexes() {
        let mut t = TableSpec::new("users");
        t.column("email").string(190).unique();
        t.column("team_id").int().index();
        let names: Vec<&str> = t.constraints().iter().map(ColumnSpec::name).collect();
        assert_eq!(names, vec!["uniq_email", "idx_team_id"]);
        assert!(matches!(t.constraints()[0], ColumnSpec::Unique(_)));
        assert!(t.column_spec("email").is_some());
    }

    #[test]
    fn test_duplicate_constraint() {
        let mut t = TableSpec::new("users");
        t.column("email").string(190).index();
        t.index("idx_email", ["email"]);
        assert_eq!(
            t.validate(),
            Err(SchemaIntegrityError::DuplicateConstraint(String::from(
                "idx_email"
            )))
        );
    }

    #[test]
    fn test_foreign_key_actions() {
        let mut t = TableSpec::new("posts");
        t.column("user_id").int();
        t.foreign_key("fk_post_user", ["user_id"], "users", ["id"])
            .on_update("cascade")
            .on_delete("SET NULL");
        assert!(t.validate().is_ok());
        let ColumnSpec::ForeignKey(fk) = &t.constraints()[0] else {
            panic!("expected a foreign key");
        };
        assert_eq!(fk.on_update, ForeignKeyAction::Cascade);
        assert_eq!(fk.on_delete, ForeignKeyAction::SetNull);
    }

    #[test]
    fn test_invalid_foreign_key_action() {
        let mut t = TableSpec::new("posts");
        t.column("user_id").int();
        t.foreign_key("fk", ["user_id"], "users", ["id"])
            .on_delete("vanish");
        assert_eq!(
            t.validate(),
            Err(SchemaIntegrityError::InvalidReferentialAction {
                clause: "DELETE",
                action: String::from("vanish"),
            })
        );
    }
}
