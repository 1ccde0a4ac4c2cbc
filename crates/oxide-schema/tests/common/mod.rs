#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use oxide_db::{
    Connection, ConnectionConfig, Dialect, Driver, ResultSet, StatementExecutor, Value,
};

/// Records every statement; fails those containing `FAIL`.
#[derive(Debug, Default, Clone)]
pub struct RecordingDriver {
    pub statements: Arc<Mutex<Vec<String>>>,
}

impl RecordingDriver {
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

impl Driver for RecordingDriver {
    fn execute<'a>(
        &'a mut self,
        sql: &'a str,
        _params: &'a [Value],
    ) -> BoxFuture<'a, Result<ResultSet, sqlx::Error>> {
        Box::pin(async move {
            self.statements.lock().unwrap().push(sql.to_string());
            if sql.contains("FAIL") {
                return Err(sqlx::Error::Protocol(String::from("near \"FAIL\": syntax error")));
            }
            Ok(ResultSet::default())
        })
    }

    fn begin(&mut self) -> BoxFuture<'_, Result<(), sqlx::Error>> {
        Box::pin(async { Ok(()) })
    }

    fn commit(&mut self) -> BoxFuture<'_, Result<(), sqlx::Error>> {
        Box::pin(async { Ok(()) })
    }

    fn rollback(&mut self) -> BoxFuture<'_, Result<(), sqlx::Error>> {
        Box::pin(async { Ok(()) })
    }

    fn in_transaction(&self) -> bool {
        false
    }
}

/// An executor over a [`RecordingDriver`].
pub fn recording_executor(dialect: Dialect, prefix: &str) -> (StatementExecutor, RecordingDriver) {
    let driver = RecordingDriver::default();
    let connection = Connection::new("test", dialect, prefix, Box::new(driver.clone()));
    (StatementExecutor::new(connection), driver)
}

/// An executor over a fresh in-memory SQLite database.
pub async fn sqlite_executor(prefix: &str) -> StatementExecutor {
    let config = ConnectionConfig::new("sqlite::memory:").table_prefix(prefix);
    let connection = Connection::open("test", &config)
        .await
        .expect("Failed to open in-memory SQLite");
    assert!(connection.is_live());
    StatementExecutor::new(connection)
}
