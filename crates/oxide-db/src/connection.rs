//! Connections and the database context.
//!
//! A [`Connection`] pairs a dialect and table prefix with an optional live
//! [`Driver`]. The [`Database`] context owns one executor per configuration
//! name, created lazily on first use and kept until the context is dropped.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::{ConnectionConfig, DatabaseConfig};
use crate::dialect::Dialect;
use crate::driver::{self, Driver};
use crate::error::{DbError, Result};
use crate::executor::StatementExecutor;

/// One logical database connection.
pub struct Connection {
    name: String,
    dialect: Dialect,
    prefix: String,
    handle: Option<Box<dyn Driver>>,
    unavailable: Option<String>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .field("prefix", &self.prefix)
            .field("live", &self.handle.is_some())
            .finish()
    }
}

impl Connection {
    /// Creates a connection around a live driver.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        dialect: Dialect,
        prefix: impl Into<String>,
        handle: Box<dyn Driver>,
    ) -> Self {
        Self {
            name: name.into(),
            dialect,
            prefix: prefix.into(),
            handle: Some(handle),
            unavailable: None,
        }
    }

    /// Creates a connection without a live handle.
    ///
    /// Rendering still works; executing fails with [`DbError::Connection`].
    #[must_use]
    pub fn offline(
        name: impl Into<String>,
        dialect: Dialect,
        prefix: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dialect,
            prefix: prefix.into(),
            handle: None,
            unavailable: Some(reason.into()),
        }
    }

    /// Opens a connection from a configuration entry.
    ///
    /// A missing DSN or a failed connect degrades to an offline connection.
    /// Only an invalid entry (unknown driver tag, bad prefix) is an error.
    pub async fn open(name: &str, config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let Some(dialect) = config.dialect()? else {
            warn!(connection = %name, "No dsn configured, connection is offline");
            return Ok(Self::offline(
                name,
                Dialect::default(),
                &config.table_prefix,
                "no dsn configured",
            ));
        };

        let url = match config.connect_url() {
            Ok(url) => url,
            Err(e) => {
                warn!(connection = %name, error = %e, "Connection is offline");
                return Ok(Self::offline(name, dialect, &config.table_prefix, e.to_string()));
            }
        };

        match driver::connect(dialect, &url).await {
            Ok(handle) => {
                info!(connection = %name, dialect = %dialect, "Database connected");
                Ok(Self::new(name, dialect, &config.table_prefix, handle))
            }
            Err(e) => {
                warn!(connection = %name, error = %e, "Failed to connect, connection is offline");
                Ok(Self::offline(name, dialect, &config.table_prefix, e.to_string()))
            }
        }
    }

    /// Configuration name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dialect of the connection.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Driver tag of the connection.
    #[must_use]
    pub const fn driver_tag(&self) -> &'static str {
        self.dialect.tag()
    }

    /// Identifier quote character.
    #[must_use]
    pub const fn quote(&self) -> char {
        self.dialect.identifier_quote()
    }

    /// Table prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether a live handle is attached.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Returns the live handle, or why there is none.
    pub(crate) fn handle_mut(&mut self) -> Result<&mut (dyn Driver + 'static)> {
        match self.handle.as_deref_mut() {
            Some(handle) => Ok(handle),
            None => Err(DbError::Connection {
                name: self.name.clone(),
                reason: self
                    .unavailable
                    .clone()
                    .unwrap_or_else(|| String::from("not connected")),
            }),
        }
    }

    /// Returns the live handle if there is one.
    pub(crate) fn live_handle(&mut self) -> Option<&mut (dyn Driver + 'static)> {
        self.handle.as_deref_mut()
    }
}

/// Process-wide database context: one executor per configuration name.
#[derive(Debug)]
pub struct Database {
    config: DatabaseConfig,
    executors: HashMap<String, StatementExecutor>,
}

impl Database {
    /// Creates a context; nothing is connected until first use.
    #[must_use]
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            executors: HashMap::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Registers a ready-made executor under a name, replacing any cached one.
    pub fn attach(&mut self, executor: StatementExecutor) {
        self.executors
            .insert(executor.connection().name().to_string(), executor);
    }

    /// Returns the executor for a configuration name, connecting on first use.
    ///
    /// An unknown name yields an offline executor.
    pub async fn connection(&mut self, name: &str) -> Result<&mut StatementExecutor> {
        if !self.executors.contains_key(name) {
            let connection = match self.config.connection(name) {
                Some(entry) => Connection::open(name, entry).await?,
                None => {
                    warn!(connection = %name, "No configuration entry, connection is offline");
                    Connection::offline(
                        name,
                        Dialect::default(),
                        "",
                        format!("no configuration entry named '{name}'"),
                    )
                }
            };
            self.executors
                .insert(name.to_string(), StatementExecutor::new(connection));
        }
        self.executors
            .get_mut(name)
            .ok_or_else(|| DbError::Config(format!("connection '{name}' vanished")))
    }

    /// Returns the executor of the default connection.
    pub async fn default_connection(&mut self) -> Result<&mut StatementExecutor> {
        let name = self.config.default.clone();
        self.connection(&name).await
    }
}
