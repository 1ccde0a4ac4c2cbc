//! Parameterized SQL execution for MySQL- and SQLite-shaped databases.
//!
//! `oxide-db` turns prepared SQL text into safe, dialect-correct statements:
//!
//! - **Prefix macro** - `{{users}}` becomes the quoted, prefixed table name
//! - **Named parameters** - `:name` tokens are bound positionally, unused keys dropped
//! - **Executor** - runs statements and captures driver failures instead of raising them
//! - **Query builder** - composes SELECTs with joins, AND/OR groups, ordering and pagination
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_db::{params, ConnectionConfig, Database, DatabaseConfig};
//!
//! let config = DatabaseConfig::default().with_connection(
//!     "default",
//!     ConnectionConfig::new("sqlite::memory:").table_prefix("app_"),
//! );
//! let mut db = Database::new(config);
//! let executor = db.default_connection().await?;
//!
//! executor
//!     .exec("INSERT INTO {{users}} (name) VALUES (:name)", &params! { "name" => "alice" })
//!     .await?;
//!
//! let sql = executor
//!     .table("users")
//!     .where_clause(params! { "id" => 5 }, &Default::default())?
//!     .limit(1)
//!     .raw_sql();
//! ```

pub mod config;
pub mod connection;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod executor;
pub mod query;
pub mod record;
pub mod scan;
pub mod statement;
pub mod value;

pub use config::{ConnectionConfig, DatabaseConfig};
pub use connection::{Connection, Database};
pub use dialect::Dialect;
pub use driver::{Driver, MySqlDriver, ResultSet, SqliteDriver};
pub use error::{DbError, ExecutionError, Result};
pub use executor::StatementExecutor;
pub use query::{Columns, Condition, Order, OrderDirection, QueryBuilder, Row, Rows};
pub use record::Record;
pub use serde_json::{json, Value};
pub use value::{Params, ValuePreparer};

/// Builds [`Params`] from `key => value` pairs.
///
/// ```rust,ignore
/// let params = oxide_db::params! { "id" => 5, "name" => "alice" };
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::Params::new();
        $(
            params.insert(::std::string::String::from($key), $crate::json!($value));
        )+
        params
    }};
}
