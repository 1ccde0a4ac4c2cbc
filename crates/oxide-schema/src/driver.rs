//! CREATE TABLE / DROP TABLE through a statement executor.

use oxide_db::statement::table_macro;
use oxide_db::{ExecutionError, Params, StatementExecutor};
use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::render::{Fragment, RendererRegistry, TableContext};
use crate::table::TableSpec;

/// Creates and drops tables on one executor.
///
/// DDL is not wrapped in a transaction: MySQL commits implicitly around it,
/// so a failed deferred statement leaves the table in place.
#[derive(Debug)]
pub struct SchemaDriver<'a> {
    executor: &'a mut StatementExecutor,
    registry: RendererRegistry,
}

impl<'a> SchemaDriver<'a> {
    /// Creates a driver with the MySQL and SQLite renderers.
    pub fn new(executor: &'a mut StatementExecutor) -> Self {
        Self::with_registry(executor, RendererRegistry::default())
    }

    /// Creates a driver with a custom renderer registry.
    pub fn with_registry(executor: &'a mut StatementExecutor, registry: RendererRegistry) -> Self {
        Self { executor, registry }
    }

    /// Renders the statements creating a table without executing them.
    ///
    /// The first statement is the CREATE TABLE; deferred statements follow.
    /// Table names are still prefix macros.
    pub fn render_create_table(
        &self,
        name: &str,
        define: impl FnOnce(&mut TableSpec),
        options: &str,
        if_not_exists: bool,
    ) -> Result<Vec<String>> {
        let mut spec = TableSpec::new(name);
        define(&mut spec);
        spec.validate()?;

        let renderer = self.registry.get(self.executor.dialect())?;
        let mut body: Vec<String> = spec
            .columns()
            .iter()
            .map(|c| renderer.render_column(c))
            .collect();
        let ctx = TableContext {
            table: name,
            if_not_exists,
        };
        let mut deferred = Vec::new();
        for constraint in spec.constraints() {
            match renderer.render_constraint(ctx, constraint) {
                Fragment::Inline(sql) => body.push(sql),
                Fragment::Deferred(sql) => deferred.push(sql),
            }
        }

        let mut create = String::from("CREATE TABLE ");
        if if_not_exists {
            create.push_str("IF NOT EXISTS ");
        }
        create.push_str(&table_macro(name));
        create.push_str(" (\n  ");
        create.push_str(&body.join(",\n  "));
        create.push_str("\n)");
        if !options.trim().is_empty() {
            create.push(' ');
            create.push_str(options.trim());
        }

        let mut statements = vec![create];
        statements.extend(deferred);
        for sql in &statements {
            debug!(table = %name, sql = %sql, "Rendered DDL");
        }
        Ok(statements)
    }

    /// Creates a table from a definition callback.
    ///
    /// An invalid definition is reported before anything is executed.
    /// `options` is appended after the closing parenthesis, e.g.
    /// `ENGINE=InnoDB DEFAULT CHARSET=utf8mb4`.
    pub async fn create_table(
        &mut self,
        name: &str,
        define: impl FnOnce(&mut TableSpec),
        options: &str,
    ) -> Result<()> {
        let statements = self.render_create_table(name, define, options, false)?;
        self.run(&statements).await?;
        info!(table = %name, "Table created");
        Ok(())
    }

    /// Creates a table unless it already exists.
    pub async fn create_table_if_not_exists(
        &mut self,
        name: &str,
        define: impl FnOnce(&mut TableSpec),
        options: &str,
    ) -> Result<()> {
        let statements = self.render_create_table(name, define, options, true)?;
        self.run(&statements).await?;
        info!(table = %name, "Table ensured");
        Ok(())
    }

    /// Drops a table.
    pub async fn drop_table(&mut self, name: &str) -> Result<()> {
        self.run(&[format!("DROP TABLE {}", table_macro(name))])
            .await
    }

    /// Drops a table if it exists.
    pub async fn drop_table_if_exists(&mut self, name: &str) -> Result<()> {
        self.run(&[format!("DROP TABLE IF EXISTS {}", table_macro(name))])
            .await
    }

    /// Executes statements in order, stopping at the first failure.
    async fn run(&mut self, statements: &[String]) -> Result<()> {
        for sql in statements {
            if self.executor.exec(sql, &Params::new()).await?.is_none() {
                let error = self
                    .executor
                    .last_error()
                    .cloned()
                    .unwrap_or_else(|| ExecutionError {
                        message: String::from("statement failed"),
                        sql: sql.clone(),
                        params: Params::new(),
                    });
                return Err(SchemaError::Execution(error));
            }
        }
        Ok(())
    }
}
