//! End-to-end execution against an in-memory SQLite database.

use oxide_db::{
    params, ConnectionConfig, Database, DatabaseConfig, DbError, Params, Row, Rows,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct Post {
    id: i64,
    title: String,
    score: f64,
}

fn config() -> DatabaseConfig {
    DatabaseConfig::default().with_connection(
        "default",
        ConnectionConfig::new("sqlite::memory:").table_prefix("blog_"),
    )
}

async fn seeded() -> Database {
    let mut db = Database::new(config());
    let executor = db.default_connection().await.unwrap();
    executor
        .exec(
            "CREATE TABLE {{posts}} (id integer PRIMARY KEY AUTOINCREMENT, title varchar(80) NOT NULL, score float)",
            &Params::new(),
        )
        .await
        .unwrap()
        .unwrap();
    for (title, score) in [("first", 1.5), ("it's second", 2.0), ("third", 0.5)] {
        executor
            .exec(
                "INSERT INTO {{posts}} (title, score) VALUES (:title, :score)",
                &params! { "title" => title, "score" => score, "unused" => [1] },
            )
            .await
            .unwrap()
            .unwrap();
    }
    db
}

#[tokio::test]
async fn test_insert_tracks_last_id() {
    let mut db = seeded().await;
    let executor = db.default_connection().await.unwrap();
    assert_eq!(executor.last_insert_id(), Some(3));
    assert_eq!(executor.affected_rows(), Some(1));
}

#[tokio::test]
async fn test_typed_query() {
    let mut db = seeded().await;
    let executor = db.default_connection().await.unwrap();
    let rows = executor
        .table_as::<Post>("posts")
        .order_by([("score", "DESC")])
        .limit(2)
        .get()
        .await
        .unwrap()
        .unwrap();
    let Rows::Typed(posts) = rows else {
        panic!("expected typed rows");
    };
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].title, "it's second");
    assert_eq!(posts[1].id, 1);
}

#[tokio::test]
async fn test_condition_with_quote_in_value() {
    let mut db = seeded().await;
    let executor = db.default_connection().await.unwrap();
    let row = executor
        .table("posts AS p")
        .select(["p.id"])
        .where_clause("p.title = :title", &params! { "title" => "it's second" })
        .unwrap()
        .first()
        .await
        .unwrap();
    let Some(Row::Record(record)) = row else {
        panic!("expected a record");
    };
    assert_eq!(record.get_i64("id"), Some(2));
}

#[tokio::test]
async fn test_failure_is_recorded_and_rolled_back() {
    let mut db = seeded().await;
    let executor = db.default_connection().await.unwrap();
    assert!(executor.begin_transaction().await);
    executor
        .exec("DELETE FROM {{posts}} WHERE id = :id", &params! { "id" => 1 })
        .await
        .unwrap()
        .unwrap();
    let failed = executor
        .exec(
            "INSERT INTO {{missing}} (a) VALUES (:a)",
            &params! { "a" => "x" },
        )
        .await
        .unwrap();
    assert!(failed.is_none());
    assert!(!executor.in_transaction());

    let error = executor.last_error().unwrap();
    assert_eq!(error.sql, "INSERT INTO \"blog_missing\" (a) VALUES ('x')");

    let rs = executor
        .exec("SELECT count(*) AS n FROM {{posts}}", &Params::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rs.rows[0].get_i64("n"), Some(3));
}

#[tokio::test]
async fn test_commit() {
    let mut db = seeded().await;
    let executor = db.default_connection().await.unwrap();
    assert!(executor.begin_transaction().await);
    executor
        .exec("DELETE FROM {{posts}}", &Params::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(executor.affected_rows(), Some(3));
    assert!(executor.commit().await);
    assert!(!executor.in_transaction());
    let rows = executor.table("posts").get().await.unwrap().unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_transaction_statements_go_through_the_executor_api() {
    let mut db = seeded().await;
    let executor = db.default_connection().await.unwrap();
    assert!(matches!(
        executor.exec("BEGIN TRANSACTION", &Params::new()).await,
        Err(DbError::TransactionControl(_))
    ));
    assert!(!executor.in_transaction());

    assert!(executor.begin_transaction().await);
    assert!(matches!(
        executor.exec("ROLLBACK", &Params::new()).await,
        Err(DbError::TransactionControl(_))
    ));
    assert!(executor.in_transaction());
    executor
        .exec("DELETE FROM {{posts}} WHERE id = :id", &params! { "id" => 2 })
        .await
        .unwrap()
        .unwrap();
    assert!(executor.roll_back().await);
    assert!(!executor.in_transaction());

    let rs = executor
        .exec("SELECT count(*) AS n FROM {{posts}}", &Params::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rs.rows[0].get_i64("n"), Some(3));
}
