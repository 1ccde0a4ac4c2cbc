//! Error types for schema definition and DDL execution.

use oxide_db::{DbError, Dialect, ExecutionError};

/// A table definition that must never reach the database.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaIntegrityError {
    /// A second column was marked as primary key.
    #[error("Primary key already defined on '{existing}', cannot also define it on '{attempted}'")]
    DuplicatePrimaryKey {
        /// Column that already holds the primary key.
        existing: String,
        /// Column that attempted to become primary key.
        attempted: String,
    },

    /// An ON UPDATE / ON DELETE action is not a referential action.
    #[error("Invalid ON {clause} action '{action}'")]
    InvalidReferentialAction {
        /// `UPDATE` or `DELETE`.
        clause: &'static str,
        /// The rejected action.
        action: String,
    },

    /// Two indexes or foreign keys share a name.
    #[error("Constraint '{0}' is already defined")]
    DuplicateConstraint(String),

    /// Two data columns share a name.
    #[error("Column '{0}' is already defined")]
    DuplicateColumn(String),

    /// A column type was declared twice.
    #[error("Column '{0}' already has a type")]
    TypeRedeclared(String),

    /// A column was declared without a type.
    #[error("Column '{0}' has no type")]
    MissingType(String),
}

/// Errors that can occur while creating or dropping tables.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The table definition is invalid.
    #[error("Schema integrity error: {0}")]
    Integrity(#[from] SchemaIntegrityError),

    /// No renderer is registered for the connection's dialect.
    #[error("No DDL renderer for dialect '{0}'")]
    UnsupportedDialect(Dialect),

    /// Connection or configuration error.
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    /// A DDL statement was rejected by the database.
    #[error("Statement failed: {0}")]
    Execution(#[from] ExecutionError),
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
