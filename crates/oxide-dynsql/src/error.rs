//! Error types for template parsing, preparation and statement building.

use thiserror::Error;

use crate::el::ExpressionError;
use crate::parser::ParseError;

/// Errors raised by the dynamic SQL engine.
#[derive(Debug, Error)]
pub enum SqlError {
    /// The template text could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The template is not usable the way it was asked to be used.
    ///
    /// Raised at prepare time: unresolved tags, replacement parameters or
    /// conditional nodes in batch statements, a query used as a batch.
    #[error("Clause configuration error: {0}")]
    ClauseConfig(String),

    /// A build call was given arguments the template cannot work with.
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// An expression failed to compile or evaluate.
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// An `@include` referenced a fragment that is not registered.
    #[error("Sql fragment '{0}' not found")]
    FragmentNotFound(String),

    /// Writing to the output sink failed.
    #[error("Render error: {0}")]
    Render(#[from] std::fmt::Error),
}

impl SqlError {
    /// Creates a clause configuration error.
    #[must_use]
    pub fn clause_config(message: impl Into<String>) -> Self {
        Self::ClauseConfig(message.into())
    }

    /// Creates an illegal argument error.
    #[must_use]
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument(message.into())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SqlError>;
