//! Statement executor.
//!
//! The executor owns a [`Connection`] and runs prepared SQL text against it.
//! Every call to [`StatementExecutor::exec`] goes through the same passes,
//! in this order:
//!
//! 1. params whose `:token` does not occur in the SQL are dropped,
//! 2. `{{table}}` macros are expanded to quoted, prefixed identifiers,
//! 3. named tokens are compiled to positional placeholders and bound.
//!
//! Driver failures are captured into an error record instead of being
//! returned as errors, so callers branch on `Ok(None)`.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::dialect::Dialect;
use crate::driver::ResultSet;
use crate::error::{DbError, ExecutionError, Result};
use crate::query::QueryBuilder;
use crate::record::Record;
use crate::statement::{
    compile, expand_prefix, is_transaction_control, leading_keyword, retain_used, substitute,
};
use crate::value::{ensure_scalars, Params, ValuePreparer};

/// Executes statements on one connection and keeps its runtime state.
#[derive(Debug)]
pub struct StatementExecutor {
    connection: Connection,
    affected_rows: Option<u64>,
    last_insert_id: Option<i64>,
    errors: Vec<ExecutionError>,
}

impl StatementExecutor {
    /// Creates an executor for a connection.
    #[must_use]
    pub const fn new(connection: Connection) -> Self {
        Self {
            connection,
            affected_rows: None,
            last_insert_id: None,
            errors: Vec::new(),
        }
    }

    /// Returns the connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the dialect of the connection.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.connection.dialect()
    }

    /// Returns the table prefix of the connection.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.connection.prefix()
    }

    /// Returns a value preparer for the connection's dialect.
    #[must_use]
    pub const fn preparer(&self) -> ValuePreparer {
        ValuePreparer::new(self.dialect())
    }

    /// Quotes an identifier for the connection's dialect.
    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        self.dialect().quote_identifier(name)
    }

    /// Executes a statement.
    ///
    /// Returns `Ok(None)` when the driver rejects the statement; the failure
    /// is then available from [`last_error`](Self::last_error). Returns an
    /// error when there is no live connection, a param is not a scalar, or
    /// the statement is transaction control; transactions go through
    /// [`begin_transaction`](Self::begin_transaction), [`commit`](Self::commit)
    /// and [`roll_back`](Self::roll_back).
    pub async fn exec(&mut self, sql: &str, params: &Params) -> Result<Option<ResultSet>> {
        self.connection.handle_mut()?;
        if is_transaction_control(sql) {
            return Err(DbError::TransactionControl(leading_keyword(sql)));
        }

        let dialect = self.dialect();
        let params = retain_used(sql, dialect, params);
        ensure_scalars(params.values())?;

        let expanded = expand_prefix(sql, dialect, self.connection.prefix());
        let compiled = compile(&expanded, dialect, &params);
        if !compiled.missing.is_empty() {
            let message = format!(
                "no value bound for parameter :{}",
                compiled.missing.join(", :")
            );
            self.record_failure(message, &expanded, &params);
            self.affected_rows = None;
            return Ok(None);
        }

        debug!(sql = %compiled.sql, params = compiled.values.len(), "Executing SQL");
        let handle = self.connection.handle_mut()?;
        let outcome = handle.execute(&compiled.sql, &compiled.values).await;

        match outcome {
            Ok(result) => {
                self.affected_rows = Some(result.rows_affected);
                if result.last_insert_id.is_some() {
                    self.last_insert_id = result.last_insert_id;
                }
                Ok(Some(result))
            }
            Err(e) => {
                self.affected_rows = None;
                self.rollback_open_transaction().await;
                self.record_failure(e.to_string(), &expanded, &params);
                Ok(None)
            }
        }
    }

    /// Renders a statement with every param inlined as a literal.
    ///
    /// For logging and inspection only; [`exec`](Self::exec) always binds.
    pub fn prepare_sql(&self, sql: &str, params: &Params) -> Result<String> {
        let expanded = expand_prefix(sql, self.dialect(), self.connection.prefix());
        substitute(&expanded, self.preparer(), params)
    }

    /// Starts a query on a table, returning generic records.
    #[must_use]
    pub fn table(&mut self, name: &str) -> QueryBuilder<'_, Record> {
        QueryBuilder::new(self, name)
    }

    /// Starts a query on a table whose rows map onto `T`.
    #[must_use]
    pub fn table_as<T: DeserializeOwned>(&mut self, name: &str) -> QueryBuilder<'_, T> {
        QueryBuilder::new(self, name)
    }

    /// Opens a transaction. Returns `false` without a live connection or on failure.
    pub async fn begin_transaction(&mut self) -> bool {
        let Some(handle) = self.connection.live_handle() else {
            return false;
        };
        let outcome = handle.begin().await;
        self.settle("BEGIN", outcome)
    }

    /// Commits the open transaction. Returns `false` without a live connection or on failure.
    pub async fn commit(&mut self) -> bool {
        let Some(handle) = self.connection.live_handle() else {
            return false;
        };
        let outcome = handle.commit().await;
        self.settle("COMMIT", outcome)
    }

    /// Rolls back the open transaction. Returns `false` without a live connection or on failure.
    pub async fn roll_back(&mut self) -> bool {
        let Some(handle) = self.connection.live_handle() else {
            return false;
        };
        let outcome = handle.rollback().await;
        self.settle("ROLLBACK", outcome)
    }

    /// Whether a transaction is open.
    #[must_use]
    pub fn in_transaction(&mut self) -> bool {
        self.connection
            .live_handle()
            .is_some_and(|handle| handle.in_transaction())
    }

    /// Id generated by the most recent insert.
    #[must_use]
    pub const fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    /// Rows affected by the last statement; `None` after a failure.
    #[must_use]
    pub const fn affected_rows(&self) -> Option<u64> {
        self.affected_rows
    }

    /// All captured execution failures, oldest first.
    #[must_use]
    pub fn errors(&self) -> &[ExecutionError] {
        &self.errors
    }

    /// The most recent execution failure.
    #[must_use]
    pub fn last_error(&self) -> Option<&ExecutionError> {
        self.errors.last()
    }

    /// Forgets captured failures.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    async fn rollback_open_transaction(&mut self) {
        if let Some(handle) = self.connection.live_handle() {
            if handle.in_transaction() {
                if let Err(e) = handle.rollback().await {
                    warn!(error = %e, "Rollback after failed statement failed");
                }
            }
        }
    }

    fn settle(&mut self, sql: &str, outcome: std::result::Result<(), sqlx::Error>) -> bool {
        match outcome {
            Ok(()) => true,
            Err(e) => {
                self.record_failure(e.to_string(), sql, &Params::new());
                false
            }
        }
    }

    fn record_failure(&mut self, message: String, sql: &str, params: &Params) {
        let sql = substitute(sql, self.preparer(), params).unwrap_or_else(|_| sql.to_string());
        warn!(connection = %self.connection.name(), error = %message, sql = %sql, "Statement failed");
        self.errors.push(ExecutionError {
            message,
            sql,
            params: params.clone(),
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use futures::future::BoxFuture;
    use serde_json::{json, Value};

    use super::*;
    use crate::driver::Driver;
    use crate::params;

    /// Records every statement; fails those containing `FAIL`.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct Recorder {
        pub(crate) log: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
        pub(crate) rows: Arc<Mutex<Vec<Record>>>,
        pub(crate) in_transaction: bool,
    }

    impl Driver for Recorder {
        fn execute<'a>(
            &'a mut self,
            sql: &'a str,
            params: &'a [Value],
        ) -> BoxFuture<'a, std::result::Result<ResultSet, sqlx::Error>> {
            Box::pin(async move {
                self.log
                    .lock()
                    .unwrap()
                    .push((sql.to_string(), params.to_vec()));
                if sql.contains("FAIL") {
                    return Err(sqlx::Error::Protocol(String::from("syntax error")));
                }
                if sql.starts_with("SELECT") {
                    return Ok(ResultSet::with_rows(self.rows.lock().unwrap().clone()));
                }
                Ok(ResultSet {
                    rows: Vec::new(),
                    rows_affected: 2,
                    last_insert_id: Some(9),
                })
            })
        }

        fn begin(&mut self) -> BoxFuture<'_, std::result::Result<(), sqlx::Error>> {
            self.in_transaction = true;
            Box::pin(async { Ok(()) })
        }

        fn commit(&mut self) -> BoxFuture<'_, std::result::Result<(), sqlx::Error>> {
            self.in_transaction = false;
            Box::pin(async { Ok(()) })
        }

        fn rollback(&mut self) -> BoxFuture<'_, std::result::Result<(), sqlx::Error>> {
            self.in_transaction = false;
            Box::pin(async { Ok(()) })
        }

        fn in_transaction(&self) -> bool {
            self.in_transaction
        }
    }

    pub(crate) fn recording(dialect: Dialect, prefix: &str) -> (StatementExecutor, Recorder) {
        let recorder = Recorder::default();
        let connection = Connection::new("test", dialect, prefix, Box::new(recorder.clone()));
        (StatementExecutor::new(connection), recorder)
    }

    #[tokio::test]
    async fn test_exec_binds_positionally() {
        let (mut executor, recorder) = recording(Dialect::Mysql, "app_");
        let result = executor
            .exec(
                "UPDATE {{users}} SET name = :name WHERE id = :id",
                &params! { "id" => 5, "name" => "bob", "extra" => "ignored" },
            )
            .await
            .unwrap();
        assert!(result.is_some());

        let log = recorder.log.lock().unwrap();
        assert_eq!(log[0].0, "UPDATE `app_users` SET name = ? WHERE id = ?");
        assert_eq!(log[0].1, vec![json!("bob"), json!(5)]);
        assert_eq!(executor.affected_rows(), Some(2));
        assert_eq!(executor.last_insert_id(), Some(9));
    }

    #[tokio::test]
    async fn test_exec_failure_is_captured() {
        let (mut executor, recorder) = recording(Dialect::Sqlite, "");
        let result = executor
            .exec("FAIL {{t}} WHERE a = :a", &params! { "a" => "it's" })
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(executor.affected_rows(), None);

        let error = executor.last_error().unwrap();
        assert_eq!(error.sql, "FAIL \"t\" WHERE a = 'it''s'");
        assert_eq!(error.params.get("a"), Some(&json!("it's")));
        assert!(error.message.contains("syntax error"));
        assert_eq!(recorder.log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exec_failure_rolls_back() {
        let (mut executor, _recorder) = recording(Dialect::Sqlite, "");
        assert!(executor.begin_transaction().await);
        assert!(executor.in_transaction());
        executor.exec("FAIL", &Params::new()).await.unwrap();
        assert!(!executor.in_transaction());
    }

    #[tokio::test]
    async fn test_transaction_control_is_rejected() {
        let (mut executor, recorder) = recording(Dialect::Mysql, "");
        for sql in ["BEGIN", "start transaction", "COMMIT", "ROLLBACK"] {
            let result = executor.exec(sql, &Params::new()).await;
            assert!(matches!(result, Err(DbError::TransactionControl(_))));
        }
        assert!(recorder.log.lock().unwrap().is_empty());
        assert!(!executor.in_transaction());
        assert!(executor.errors().is_empty());
    }

    #[tokio::test]
    async fn test_missing_param_is_captured() {
        let (mut executor, recorder) = recording(Dialect::Sqlite, "");
        let result = executor
            .exec("SELECT * FROM t WHERE a = :a", &Params::new())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(executor.last_error().unwrap().message.contains(":a"));
        assert!(recorder.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_param_is_raised() {
        let (mut executor, recorder) = recording(Dialect::Sqlite, "");
        let result = executor
            .exec("SELECT * FROM t WHERE a IN (:a)", &params! { "a" => [1, 2] })
            .await;
        assert!(matches!(result, Err(DbError::UnsupportedType("array"))));
        assert!(recorder.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unused_unsupported_param_is_dropped() {
        let (mut executor, _recorder) = recording(Dialect::Sqlite, "");
        let result = executor
            .exec("SELECT 1", &params! { "unused" => json!({"a": 1}) })
            .await
            .unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn test_offline_connection() {
        let connection = Connection::offline("main", Dialect::Mysql, "", "no dsn configured");
        let mut executor = StatementExecutor::new(connection);
        let result = executor.exec("SELECT 1", &Params::new()).await;
        assert!(matches!(result, Err(DbError::Connection { .. })));
        assert!(!executor.begin_transaction().await);
        assert!(!executor.commit().await);
        assert!(!executor.roll_back().await);
        assert!(!executor.in_transaction());
    }

    #[tokio::test]
    async fn test_prefix_cannot_become_a_parameter() {
        let (mut executor, recorder) = recording(Dialect::Sqlite, "p_");
        executor
            .exec("SELECT * FROM {{a}} WHERE x = :x", &params! { "x" => 1 })
            .await
            .unwrap();
        let log = recorder.log.lock().unwrap();
        assert_eq!(log[0].0, "SELECT * FROM \"p_a\" WHERE x = ?");
    }

    #[test]
    fn test_prepare_sql() {
        let (executor, _) = recording(Dialect::Mysql, "app_");
        let sql = executor
            .prepare_sql(
                "SELECT * FROM {{users}} WHERE name = :name AND active = :active",
                &params! { "name" => "o'neil", "active" => true },
            )
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM `app_users` WHERE name = 'o\\'neil' AND active = 1"
        );
    }
}
