//! Expression language used by `#{..}`, `${..}` and `@if(..)`.
//!
//! The engine only talks to the [`ExpressionLanguage`] and [`Expression`]
//! traits, so another evaluator can be plugged into a
//! [`SqlContext`](crate::SqlContext). [`DefaultExpressionLanguage`] is a small
//! Pratt-parsed language with literals, variables, boolean and arithmetic
//! operators and a handful of functions.

mod eval;
mod lexer;
mod parser;
mod pratt;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::value::SqlValue;

pub use eval::{CompiledExpression, DefaultExpressionLanguage, Function};
pub use parser::{BinaryOp, ExprNode, UnaryOp};

/// Errors raised while compiling or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// The expression text is malformed.
    #[error("{message} at offset {position} in '{text}'")]
    Syntax {
        /// What went wrong.
        message: String,
        /// Byte offset inside the expression text.
        position: usize,
        /// The expression text.
        text: String,
    },

    /// A function name is not known to the language.
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    /// A function was called with the wrong number of arguments.
    #[error("Function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        /// Function name.
        name: String,
        /// Expected argument count.
        expected: usize,
        /// Actual argument count.
        found: usize,
    },

    /// An operator or function was applied to values of the wrong kind.
    #[error("Type error: {0}")]
    Type(String),

    /// Integer or float division by zero.
    #[error("Division by zero")]
    DivisionByZero,
}

/// Variables visible to an expression during evaluation.
pub trait VarScope {
    /// Resolves a variable, `None` when it is not defined.
    fn resolve(&self, name: &str) -> Option<SqlValue>;

    /// Returns true if the caller supplied a parameter with this name, even
    /// when its value is NULL.
    fn has_param(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}

impl VarScope for std::collections::BTreeMap<String, SqlValue> {
    fn resolve(&self, name: &str) -> Option<SqlValue> {
        self.get(name).cloned()
    }
}

/// A compiled expression.
pub trait Expression: Send + Sync + fmt::Debug {
    /// Returns the source text the expression was compiled from.
    fn source(&self) -> &str;

    /// Evaluates the expression.
    ///
    /// # Errors
    ///
    /// Returns an [`ExpressionError`] on type errors or division by zero.
    fn value(&self, scope: &dyn VarScope) -> Result<SqlValue, ExpressionError>;

    /// Evaluates the expression as a condition.
    ///
    /// # Errors
    ///
    /// Returns an [`ExpressionError`] if evaluation fails.
    fn test(&self, scope: &dyn VarScope) -> Result<bool, ExpressionError> {
        Ok(self.value(scope)?.is_truthy())
    }
}

/// Compiles expression text.
pub trait ExpressionLanguage: Send + Sync {
    /// Compiles the text of an expression.
    ///
    /// # Errors
    ///
    /// Returns an [`ExpressionError`] if the text is not a valid expression.
    fn compile(&self, text: &str) -> Result<Arc<dyn Expression>, ExpressionError>;
}
