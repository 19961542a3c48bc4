//! Batch statement builder.
//!
//! A prepared batch statement is built once without parameters. Instead of
//! values it records a [`BatchParameter`] for every placeholder, which is
//! resolved against each row when the batch is executed.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::context::SqlContext;
use crate::el::Expression;
use crate::error::Result;
use crate::mapping::FieldMapping;
use crate::params::{resolve_named, ParamScope, Params};
use crate::sql::Sql;
use crate::value::SqlValue;

/// Describes where the value of one batch placeholder comes from.
#[derive(Debug, Clone)]
pub struct BatchParameter {
    index: usize,
    name: Option<String>,
    field: Option<Arc<FieldMapping>>,
    value: Option<Arc<dyn Expression>>,
}

impl BatchParameter {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(
        index: usize,
        name: Option<String>,
        field: Option<Arc<FieldMapping>>,
        value: Option<Arc<dyn Expression>>,
    ) -> Self {
        Self {
            index,
            name,
            field,
            value,
        }
    }

    /// Creates a descriptor read by position only.
    #[must_use]
    pub const fn positional(index: usize) -> Self {
        Self::new(index, None, None, None)
    }

    /// Returns the placeholder's position.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the column the placeholder writes.
    #[must_use]
    pub const fn field(&self) -> Option<&Arc<FieldMapping>> {
        self.field.as_ref()
    }

    /// Returns the expression supplying the value.
    #[must_use]
    pub const fn value(&self) -> Option<&Arc<dyn Expression>> {
        self.value.as_ref()
    }

    /// Resolves the value for one row.
    ///
    /// A value expression wins over the row. Otherwise the value is read by
    /// name, falling back to the position for positional rows.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::Expression`](crate::SqlError::Expression) if the
    /// value expression fails.
    pub fn resolve(&self, row: &dyn Params) -> Result<SqlValue> {
        if let Some(expr) = &self.value {
            return Ok(expr.value(&ParamScope::new(row))?);
        }
        Ok(match &self.name {
            Some(name) => resolve_named(row, name, self.index),
            None => row.get_at(self.index).unwrap_or(SqlValue::Null),
        })
    }
}

/// SQL and per-row values ready for batch execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSqlStatement {
    sql: String,
    args: Vec<Vec<SqlValue>>,
}

impl BatchSqlStatement {
    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the bound values of every row.
    #[must_use]
    pub fn args(&self) -> &[Vec<SqlValue>] {
        &self.args
    }

    /// Splits the statement into SQL and rows of values.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Vec<SqlValue>>) {
        (self.sql, self.args)
    }
}

/// SQL with parameter descriptors, built once and executed for many rows.
#[derive(Debug, Clone)]
pub struct PreparedBatchStatement {
    sql: String,
    parameters: Vec<BatchParameter>,
}

impl PreparedBatchStatement {
    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the descriptors in placeholder order.
    #[must_use]
    pub fn parameters(&self) -> &[BatchParameter] {
        &self.parameters
    }

    /// Resolves every descriptor against every row.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving a value.
    pub fn create_batch_statement<P: Params>(&self, rows: &[P]) -> Result<BatchSqlStatement> {
        let args = rows
            .iter()
            .map(|row| {
                self.parameters
                    .iter()
                    .map(|parameter| parameter.resolve(row))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BatchSqlStatement {
            sql: self.sql.clone(),
            args,
        })
    }
}

/// Builds a [`PreparedBatchStatement`] from a template.
pub struct PreparedBatchStatementBuilder<'a> {
    ctx: &'a SqlContext,
    sql: &'a Sql,
    buf: String,
    parameters: Vec<BatchParameter>,
    parameter_index: usize,
    include_depth: usize,
}

impl<'a> PreparedBatchStatementBuilder<'a> {
    /// Creates a builder.
    #[must_use]
    pub const fn new(ctx: &'a SqlContext, sql: &'a Sql) -> Self {
        Self {
            ctx,
            sql,
            buf: String::new(),
            parameters: Vec::new(),
            parameter_index: 0,
            include_depth: 0,
        }
    }

    /// Appends text.
    pub fn append(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    /// Appends a character.
    pub fn append_char(&mut self, c: char) {
        self.buf.push(c);
    }

    /// Returns the running parameter index and advances it.
    pub fn next_parameter_index(&mut self) -> usize {
        let index = self.parameter_index;
        self.parameter_index += 1;
        index
    }

    /// Records a descriptor. The caller emits the placeholder.
    pub fn add_batch_parameter(&mut self, parameter: BatchParameter) {
        self.parameters.push(parameter);
    }

    /// Returns the context.
    #[must_use]
    pub const fn context(&self) -> &'a SqlContext {
        self.ctx
    }

    /// Returns the template being built.
    #[must_use]
    pub const fn sql(&self) -> &'a Sql {
        self.sql
    }

    /// Returns the SQL emitted so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.buf
    }

    pub(crate) fn enter_include(&mut self, key: &str) -> Result<()> {
        super::enter_include(&mut self.include_depth, key)
    }

    pub(crate) fn leave_include(&mut self) {
        self.include_depth = self.include_depth.saturating_sub(1);
    }

    /// Finishes the prepared statement.
    #[must_use]
    pub fn build(self) -> PreparedBatchStatement {
        PreparedBatchStatement {
            sql: self.buf,
            parameters: self.parameters,
        }
    }
}

impl fmt::Write for PreparedBatchStatementBuilder<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::el::{DefaultExpressionLanguage, ExpressionLanguage};
    use crate::params::{ArrayParams, MapParams};

    #[test]
    fn test_resolve_by_name_then_index() {
        let named = BatchParameter::new(1, Some(String::from("b")), None, None);
        let row = MapParams::new().with("b", 2_i64);
        assert_eq!(named.resolve(&row).unwrap(), SqlValue::Int(2));

        let positional = ArrayParams::new(vec![SqlValue::Int(7), SqlValue::Int(8)]);
        assert_eq!(named.resolve(&positional).unwrap(), SqlValue::Int(8));
        assert_eq!(
            BatchParameter::positional(0).resolve(&positional).unwrap(),
            SqlValue::Int(7)
        );
    }

    #[test]
    fn test_expression_overrides_row() {
        let expr = DefaultExpressionLanguage::new().compile("upper(name)").unwrap();
        let parameter = BatchParameter::new(0, Some(String::from("name")), None, Some(expr));
        let row = MapParams::new().with("name", "ann");
        assert_eq!(
            parameter.resolve(&row).unwrap(),
            SqlValue::Text(String::from("ANN"))
        );
    }

    #[test]
    fn test_create_batch_statement_rows() {
        let prepared = PreparedBatchStatement {
            sql: String::from("insert into t (a) values (?)"),
            parameters: vec![BatchParameter::new(0, Some(String::from("a")), None, None)],
        };
        let rows = vec![MapParams::new().with("a", 1_i64), MapParams::new().with("a", 2_i64)];
        let batch = prepared.create_batch_statement(&rows).unwrap();
        assert_eq!(batch.sql(), "insert into t (a) values (?)");
        assert_eq!(
            batch.args(),
            &[vec![SqlValue::Int(1)], vec![SqlValue::Int(2)]]
        );
    }
}
