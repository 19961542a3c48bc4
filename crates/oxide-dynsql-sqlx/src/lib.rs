//! # oxide-dynsql-sqlx
//!
//! Executes statements built by [`oxide_dynsql`] against SQLite.
//!
//! A [`SqlExecutor`] owns a pool. Each call builds the template with the given
//! parameters, binds the resulting values in order and runs the SQL; batches
//! run the prepared SQL once per row.
//!
//! ```ignore
//! use std::sync::Arc;
//! use oxide_dynsql::{DynamicSqlClause, MapParams, SqlContext};
//! use oxide_dynsql_sqlx::SqlExecutor;
//!
//! let ctx = Arc::new(SqlContext::default());
//! let template = "select * from users where 1=1 {? and name = :name }";
//! let clause = DynamicSqlClause::parse(ctx, template)?;
//! let executor = SqlExecutor::new(pool);
//! let rows = executor.fetch_all(&clause, &MapParams::new().with("name", "alice")).await?;
//! ```

pub mod error;
pub mod executor;

pub use error::{DaoError, Result};
pub use executor::SqlExecutor;
