//! Statement builders.
//!
//! A builder holds everything that changes while one template is built: the
//! SQL buffer, the bound values or batch descriptors, the running parameter
//! index and builder variables. A new builder is created for every build, so
//! the parsed template itself is never written to.

mod batch;
mod statement;

pub use batch::{
    BatchParameter, BatchSqlStatement, PreparedBatchStatement, PreparedBatchStatementBuilder,
};
pub use statement::{SavePoint, SqlStatement, SqlStatementBuilder};

use crate::error::{Result, SqlError};

/// Maximum nesting of `@include` directives.
pub const MAX_INCLUDE_DEPTH: usize = 16;

fn enter_include(depth: &mut usize, key: &str) -> Result<()> {
    if *depth >= MAX_INCLUDE_DEPTH {
        return Err(SqlError::clause_config(format!(
            "Recursive @include of fragment '{key}'"
        )));
    }
    *depth += 1;
    Ok(())
}
