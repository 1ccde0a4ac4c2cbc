//! Declarative CREATE TABLE generation for migrations.
//!
//! A migration describes a table through a callback; `oxide-schema` checks
//! the definition, lowers it to the connection's dialect and runs the DDL
//! through an [`oxide_db::StatementExecutor`]:
//!
//! - **Table definitions** - columns, indexes and foreign keys, one primary key
//! - **Renderers** - MySQL and SQLite lowering behind a registry
//! - **Schema driver** - CREATE TABLE [IF NOT EXISTS], DROP TABLE [IF EXISTS]
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_schema::SchemaDriver;
//!
//! let executor = db.default_connection().await?;
//! SchemaDriver::new(executor)
//!     .create_table(
//!         "posts",
//!         |t| {
//!             t.column("id").int().unsigned().primary_key().auto_increment();
//!             t.column("title").string(200).nullable(false);
//!             t.column("user_id").int().unsigned().index();
//!             t.foreign_key("fk_post_user", ["user_id"], "users", ["id"])
//!                 .on_delete("cascade");
//!         },
//!         "ENGINE=InnoDB",
//!     )
//!     .await?;
//! ```

pub mod column;
pub mod driver;
pub mod error;
pub mod render;
pub mod table;

pub use column::{
    ColumnSpec, ColumnType, DataColumn, DefaultValue, ForeignKeyAction, ForeignKeySpec, IndexSpec,
};
pub use driver::SchemaDriver;
pub use error::{Result, SchemaError, SchemaIntegrityError};
pub use render::{
    ColumnRenderer, Fragment, MysqlRenderer, RendererRegistry, SqliteRenderer, TableContext,
};
pub use table::{ColumnHandle, ForeignKeyHandle, TableSpec};
