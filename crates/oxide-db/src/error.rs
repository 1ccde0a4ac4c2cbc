//! Error types for the execution layer.

use std::path::PathBuf;

use crate::value::Params;

/// Errors raised by the connection, executor and query builder.
///
/// Driver failures during [`exec`](crate::StatementExecutor::exec) are not
/// part of this enum; they are captured as [`ExecutionError`] records.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// No live connection is available for the configuration.
    #[error("No live connection for '{name}': {reason}")]
    Connection {
        /// Configuration name of the connection.
        name: String,
        /// Why the connection is unavailable.
        reason: String,
    },

    /// A bind value has a type that cannot be turned into a SQL literal.
    #[error("Unsupported bind value type: {0}")]
    UnsupportedType(&'static str),

    /// Transaction control was passed to `exec` instead of the transaction methods.
    #[error("{0} is not allowed in exec; use begin_transaction, commit or roll_back")]
    TransactionControl(String),

    /// Invalid connection configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A result row could not be mapped onto the requested type.
    #[error("Failed to hydrate row: {0}")]
    Hydration(String),

    /// Configuration file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A driver-level failure captured by the executor.
///
/// `sql` holds the statement with every parameter substituted as a literal,
/// so the record can be logged or shown as-is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} (SQL: {sql})")]
pub struct ExecutionError {
    /// Message reported by the driver.
    pub message: String,
    /// Attempted SQL with literals inlined.
    pub sql: String,
    /// Attempted parameters.
    pub params: Params,
}

/// Result type for the execution layer.
pub type Result<T> = std::result::Result<T, DbError>;
