//! Common test utilities for executor tests.

#![allow(dead_code)]

use std::sync::Arc;

use oxide_dynsql::{DynamicSqlClause, SqlContext};
use oxide_dynsql_sqlx::SqlExecutor;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Creates an executor over an in-memory database with a `users` table.
pub async fn executor() -> SqlExecutor {
    let pool = create_test_pool().await;
    sqlx::query(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT, age INTEGER)",
    )
    .execute(&pool)
    .await
    .expect("Failed to create users table");
    SqlExecutor::new(pool)
}

async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Parses a template in a default context.
pub fn clause(text: &str) -> DynamicSqlClause {
    DynamicSqlClause::parse(Arc::new(SqlContext::default()), text)
        .unwrap_or_else(|e| panic!("Failed to parse: {text}\nError: {e:?}"))
}
