//! Statement execution against a SQLite pool.

use oxide_dynsql::{BatchSqlStatement, DynamicSqlClause, Params, SqlStatement, SqlValue};
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite};
use tracing::debug;

use crate::error::{DaoError, Result};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Runs dynamic SQL clauses on a pool.
#[derive(Debug, Clone)]
pub struct SqlExecutor {
    pool: SqlitePool,
}

impl SqlExecutor {
    /// Creates an executor over a pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs a query and returns every row.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be built or the query fails.
    pub async fn fetch_all(
        &self,
        clause: &DynamicSqlClause,
        params: &dyn Params,
    ) -> Result<Vec<SqliteRow>> {
        let statement = clause.create_query_statement(params)?;
        let rows = bind_all(sqlx::query(statement.sql()), statement.args())
            .fetch_all(&self.pool)
            .await?;
        debug!(sql = %statement.sql(), rows = rows.len(), "fetched rows");
        Ok(rows)
    }

    /// Runs a query expecting one row.
    ///
    /// # Errors
    ///
    /// Returns [`DaoError::NotFound`] when no row matches.
    pub async fn fetch_one(
        &self,
        clause: &DynamicSqlClause,
        params: &dyn Params,
    ) -> Result<SqliteRow> {
        let statement = clause.create_query_statement(params)?;
        bind_all(sqlx::query(statement.sql()), statement.args())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Runs the count form of a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be built or the query fails.
    pub async fn fetch_count(
        &self,
        clause: &DynamicSqlClause,
        params: &dyn Params,
    ) -> Result<i64> {
        let statement = clause.create_count_statement(params)?;
        let row = bind_all(sqlx::query(statement.sql()), statement.args())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get(0)?)
    }

    /// Runs an insert, update or delete and returns the affected row count.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be built or execution fails.
    pub async fn execute(&self, clause: &DynamicSqlClause, params: &dyn Params) -> Result<u64> {
        let statement = clause.create_update_statement(params)?;
        self.execute_statement(&statement).await
    }

    /// Runs an already built statement.
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails.
    pub async fn execute_statement(&self, statement: &SqlStatement) -> Result<u64> {
        let result = bind_all(sqlx::query(statement.sql()), statement.args())
            .execute(&self.pool)
            .await?;
        debug!(sql = %statement.sql(), affected = result.rows_affected(), "executed statement");
        Ok(result.rows_affected())
    }

    /// Runs the prepared batch SQL once per row on a single connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the clause is not batchable, a row value fails
    /// to resolve or a row fails to execute. Rows run before the failing one
    /// are not rolled back.
    pub async fn execute_batch<P: Params>(
        &self,
        clause: &DynamicSqlClause,
        rows: &[P],
    ) -> Result<u64> {
        let batch = clause.create_batch_statement(rows)?;
        self.execute_batch_statement(&batch).await
    }

    /// Runs an already built batch statement.
    ///
    /// # Errors
    ///
    /// Returns an error if a row fails to execute.
    pub async fn execute_batch_statement(&self, batch: &BatchSqlStatement) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        let mut affected = 0;
        for args in batch.args() {
            let result = bind_all(sqlx::query(batch.sql()), args)
                .execute(&mut *conn)
                .await?;
            affected += result.rows_affected();
        }
        debug!(sql = %batch.sql(), rows = batch.args().len(), affected, "executed batch");
        Ok(affected)
    }
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, args: &[SqlValue]) -> SqliteQuery<'q> {
    for arg in args {
        query = bind_param(query, arg.clone());
    }
    query
}

/// Binds a SqlValue parameter to a query.
fn bind_param(query: SqliteQuery<'_>, value: SqlValue) -> SqliteQuery<'_> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Blob(b) => query.bind(b),
        SqlValue::Timestamp(ts) => query.bind(ts),
        // IN lists are expanded by the builder; a stray array binds as text
        array @ SqlValue::Array(_) => query.bind(array.to_replacement_text()),
    }
}
