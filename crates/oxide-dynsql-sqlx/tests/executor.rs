//! Tests running built statements against SQLite.

mod common;
use common::*;

use oxide_dynsql::{EmptyParams, MapParams, SqlValue};
use oxide_dynsql_sqlx::DaoError;
use sqlx::Row;

async fn seed(executor: &oxide_dynsql_sqlx::SqlExecutor) {
    let insert =
        clause("insert into users (id, name, email, age) values (:id, :name, :email, :age)");
    let rows = vec![
        MapParams::new()
            .with("id", 1_i64)
            .with("name", "alice")
            .with("email", "alice@example.com")
            .with("age", 30_i64),
        MapParams::new().with("id", 2_i64).with("name", "bob").with("age", 25_i64),
        MapParams::new()
            .with("id", 3_i64)
            .with("name", "carol")
            .with("email", "carol@example.com")
            .with("age", 41_i64),
    ];
    let affected = executor.execute_batch(&insert, &rows).await.unwrap();
    assert_eq!(affected, 3);
}

#[tokio::test]
async fn dynamic_filters_select_rows() {
    let executor = executor().await;
    seed(&executor).await;

    let query = clause(
        "select id, name from users where 1=1 {? and age > :min } {? and name = :name } order by id",
    );

    let rows = executor.fetch_all(&query, &EmptyParams).await.unwrap();
    assert_eq!(rows.len(), 3);

    let params = MapParams::new().with("min", 26_i64);
    let rows = executor.fetch_all(&query, &params).await.unwrap();
    let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
    assert_eq!(names, vec!["alice", "carol"]);
}

#[tokio::test]
async fn in_list_and_null_comparison() {
    let executor = executor().await;
    seed(&executor).await;

    let query = clause("select id from users where id in (:ids) order by id");
    let params = MapParams::new().with("ids", vec![1_i64, 3]);
    let rows = executor.fetch_all(&query, &params).await.unwrap();
    let ids: Vec<i64> = rows.iter().map(|r| r.get("id")).collect();
    assert_eq!(ids, vec![1, 3]);

    let params = MapParams::new().with("ids", Vec::<i64>::new());
    assert!(executor.fetch_all(&query, &params).await.unwrap().is_empty());

    let query = clause("select name from users where email = :email");
    let row = executor
        .fetch_one(&query, &MapParams::new().with("email", SqlValue::Null))
        .await
        .unwrap();
    assert_eq!(row.get::<String, _>("name"), "bob");
}

#[tokio::test]
async fn fetch_one_not_found() {
    let executor = executor().await;
    let query = clause("select * from users where id = :id");
    let result = executor
        .fetch_one(&query, &MapParams::new().with("id", 99_i64))
        .await;
    assert!(matches!(result, Err(DaoError::NotFound)));
}

#[tokio::test]
async fn count_ignores_order_by() {
    let executor = executor().await;
    seed(&executor).await;

    let query = clause("select id, name from users where 1=1 {? and age < :max } order by name");
    let count = executor
        .fetch_count(&query, &MapParams::new().with("max", 35_i64))
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn update_and_delete() {
    let executor = executor().await;
    seed(&executor).await;

    let update = clause("update users set email = :email where id = :id");
    let affected = executor
        .execute(
            &update,
            &MapParams::new().with("email", SqlValue::Null).with("id", 1_i64),
        )
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let delete = clause("delete from users where email = :email");
    let affected = executor
        .execute(&delete, &MapParams::new().with("email", SqlValue::Null))
        .await
        .unwrap();
    // update statements keep `= ?`, which never matches NULL
    assert_eq!(affected, 0);
}

#[tokio::test]
async fn query_template_is_rejected_for_batches() {
    let executor = executor().await;
    let query = clause("select * from users");
    let result = executor.execute_batch(&query, &[EmptyParams]).await;
    assert!(matches!(result, Err(DaoError::Sql(_))));
}
