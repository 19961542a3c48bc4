//! The entry point for executing templates.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::builder::{BatchSqlStatement, PreparedBatchStatement, SqlStatement};
use crate::context::SqlContext;
use crate::error::{Result, SqlError};
use crate::params::Params;
use crate::parser::Parser;
use crate::sql::Sql;

/// A parsed and prepared template, ready to build statements.
///
/// Cheap to share between threads: every build works on its own builder.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use oxide_dynsql::{DynamicSqlClause, MapParams, SqlContext, SqlValue};
///
/// let ctx = Arc::new(SqlContext::default());
/// let clause = DynamicSqlClause::parse(
///     ctx,
///     "SELECT * FROM t WHERE {? id = :id } {? and name = :name }",
/// )
/// .unwrap();
///
/// let params = MapParams::new().with("id", 5_i64);
/// let statement = clause.create_query_statement(&params).unwrap();
/// assert_eq!(statement.sql(), "SELECT * FROM t WHERE  id = ? ");
/// assert_eq!(statement.args(), &[SqlValue::Int(5)]);
/// ```
#[derive(Debug)]
pub struct DynamicSqlClause {
    ctx: Arc<SqlContext>,
    text: String,
    sql: Sql,
    batch: OnceLock<PreparedBatchStatement>,
    count: OnceLock<Option<Sql>>,
}

impl DynamicSqlClause {
    /// Parses and prepares a template. A trailing `;` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::Parse`] for malformed templates and
    /// [`SqlError::ClauseConfig`] for unknown tags.
    pub fn parse(ctx: Arc<SqlContext>, text: &str) -> Result<Self> {
        let text = text.trim();
        let text = text.strip_suffix(';').unwrap_or(text).trim_end();
        let sql = Parser::new(&ctx).parse(text)?;
        sql.prepare(&ctx)?;
        debug!(sql = %text, sql_type = ?sql.sql_type(), "parsed dynamic sql clause");
        Ok(Self {
            ctx,
            text: String::from(text),
            sql,
            batch: OnceLock::new(),
            count: OnceLock::new(),
        })
    }

    /// Returns the template text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the parsed template.
    #[must_use]
    pub const fn sql(&self) -> &Sql {
        &self.sql
    }

    /// Returns the context the template was parsed with.
    #[must_use]
    pub fn context(&self) -> &SqlContext {
        &self.ctx
    }

    /// Builds a statement that writes rows.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while building.
    pub fn create_update_statement(&self, params: &dyn Params) -> Result<SqlStatement> {
        self.build(&self.sql, params, false)
    }

    /// Builds a statement that reads rows.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ClauseConfig`] if the template is not a select,
    /// or the first error raised while building.
    pub fn create_query_statement(&self, params: &dyn Params) -> Result<SqlStatement> {
        self.assert_select()?;
        self.build(&self.sql, params, true)
    }

    /// Builds a query ordered by `order_by`, for example `name desc`.
    ///
    /// The ordering replaces the template's `ORDER BY` and any `$orderBy$`
    /// replacement. A missing or blank ordering builds the template as
    /// written, like [`create_query_statement`](Self::create_query_statement).
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ClauseConfig`] if the template is not a select,
    /// or the first error raised while building.
    pub fn create_ordered_query_statement(
        &self,
        params: &dyn Params,
        order_by: Option<&str>,
    ) -> Result<SqlStatement> {
        self.assert_select()?;
        let Some(order_by) = order_by.filter(|o| !o.trim().is_empty()) else {
            return self.build(&self.sql, params, true);
        };
        let statement = self.sql.build_ordered_statement(&self.ctx, params, order_by)?;
        debug!(sql = %statement.sql(), order_by, "built ordered statement");
        Ok(statement)
    }

    fn assert_select(&self) -> Result<()> {
        if self.sql.is_select() {
            return Ok(());
        }
        Err(SqlError::clause_config(format!(
            "Only select statements can be queried: {}",
            self.text
        )))
    }

    /// Builds a statement counting the rows the select returns.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ClauseConfig`] unless the template was parsed into
    /// a select statement, or the first error raised while building.
    pub fn create_count_statement(&self, params: &dyn Params) -> Result<SqlStatement> {
        let count = self.count.get_or_init(|| self.sql.to_count_sql());
        let Some(count) = count else {
            return Err(SqlError::clause_config(format!(
                "Can not derive a count statement from: {}",
                self.text
            )));
        };
        self.build(count, params, true)
    }

    /// Returns the prepared batch statement, built on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ClauseConfig`] for select statements and for
    /// nodes that need a concrete parameter set.
    pub fn prepared_batch_statement(&self) -> Result<&PreparedBatchStatement> {
        if let Some(batch) = self.batch.get() {
            return Ok(batch);
        }
        if self.sql.is_select() {
            return Err(SqlError::clause_config(format!(
                "Select statements can not be executed as a batch: {}",
                self.text
            )));
        }
        let batch = self.sql.prepare_batch_statement(&self.ctx)?;
        debug!(
            sql = %batch.sql(),
            parameters = batch.parameters().len(),
            "prepared batch statement"
        );
        Ok(self.batch.get_or_init(|| batch))
    }

    /// Builds a batch statement with the values of every row.
    ///
    /// # Errors
    ///
    /// Same as [`prepared_batch_statement`](Self::prepared_batch_statement),
    /// or the first error raised while resolving a row value.
    pub fn create_batch_statement<P: Params>(&self, rows: &[P]) -> Result<BatchSqlStatement> {
        self.prepared_batch_statement()?.create_batch_statement(rows)
    }

    fn build(&self, sql: &Sql, params: &dyn Params, query: bool) -> Result<SqlStatement> {
        let statement = sql.build_statement(&self.ctx, params, query)?;
        debug!(sql = %statement.sql(), args = statement.args().len(), "built statement");
        Ok(statement)
    }
}
