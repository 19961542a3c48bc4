//! Error types for statement execution.

use oxide_dynsql::SqlError;
use thiserror::Error;

/// Execution errors.
#[derive(Debug, Error)]
pub enum DaoError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The template could not be built.
    #[error("sql error: {0}")]
    Sql(#[from] SqlError),

    /// No row matched a query expecting one.
    #[error("row not found")]
    NotFound,
}

/// Result type alias for execution.
pub type Result<T> = std::result::Result<T, DaoError>;
