//! AST of parsed SQL templates.
//!
//! A template is a tree of [`AstNode`]s. The tree is immutable once parsed;
//! the only state attached later is metadata resolved at prepare time (field
//! and entity mappings, tag processors), held in write-once cells. Building
//! a statement never mutates the tree, so one parsed template can be built
//! from many threads at once.
//!
//! Every operation is a single exhaustive `match` over the node kinds:
//!
//! - [`AstNode::render_template`] writes the template syntax back,
//! - [`AstNode::render_sql`] writes plain SQL with `?` placeholders,
//! - [`AstNode::build_statement`] emits SQL and bound values for one
//!   parameter set,
//! - [`AstNode::prepare_batch_statement`] emits SQL and parameter
//!   descriptors for repeated execution,
//! - [`AstNode::traverse`] walks the tree depth-first.

mod clauses;
mod names;
mod params;
mod text;

use std::fmt;

use crate::builder::{BatchParameter, PreparedBatchStatementBuilder, SqlStatementBuilder};
use crate::error::{Result, SqlError};
use crate::params::Params;
use crate::value::SqlValue;

pub use clauses::{
    ConditionalNode, ContainerKind, DynamicClause, ElseStatement, IfBody, IfClause, IfStatement,
    IncludeClause, SqlContainer, Tag,
};
pub use names::{SqlObjectName, SqlTableName};
pub use params::{
    ColumnUsage, ExprParamPlaceholder, ExprParamReplacement, IfCondition, ParamPlaceholder,
    ParamReplacement, ParamSyntax, ParamTarget,
};
pub use text::{SqlToken, Text};

pub(crate) use clauses::slot_count as count_parameter_slots;

/// Where a node sits syntactically.
///
/// Decides escaping for replacements (`String`) and lets the resolver and
/// the builder tell select lists, `SET` targets and `VALUES` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Unknown or irrelevant.
    #[default]
    Unknown,
    /// Inside a string literal.
    String,
    /// The select list.
    SelectList,
    /// `FROM` and `JOIN` items.
    From,
    /// `WHERE`, `ON` and `HAVING` conditions.
    Where,
    /// `GROUP BY` items.
    GroupBy,
    /// `ORDER BY` items.
    OrderBy,
    /// `UPDATE .. SET` assignments.
    Set,
    /// The column list of an `INSERT`.
    Columns,
    /// The `VALUES` of an `INSERT`.
    Values,
}

/// A node of a parsed template.
#[derive(Debug, Clone)]
pub enum AstNode {
    /// Literal text.
    Text(Text),
    /// A SQL keyword.
    Token(SqlToken),
    /// A column or other object name.
    ObjectName(SqlObjectName),
    /// A table name.
    TableName(SqlTableName),
    /// `:name` or `#name#`.
    Placeholder(ParamPlaceholder),
    /// `$name$`.
    Replacement(ParamReplacement),
    /// `#{expr}`.
    ExprPlaceholder(ExprParamPlaceholder),
    /// `${expr}`.
    ExprReplacement(ExprParamReplacement),
    /// `?`.
    JdbcPlaceholder,
    /// A SELECT, INSERT, UPDATE or DELETE statement.
    Container(SqlContainer),
    /// `{? .. }`.
    Dynamic(DynamicClause),
    /// Children built only when an expression is true.
    Conditional(ConditionalNode),
    /// `@if(..) .. @elseif(..) .. @else .. @endif`.
    If(IfClause),
    /// `@name{content}`.
    Tag(Tag),
    /// `@include(key)`.
    Include(IncludeClause),
}

impl AstNode {
    /// Creates a literal text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(Text::new(text))
    }

    /// Writes the template syntax of the node.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn render_template(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self {
            Self::Text(text) => out.write_str(text.as_str()),
            Self::Token(token) => out.write_str(token.text()),
            Self::ObjectName(name) => out.write_str(name.raw()),
            Self::TableName(name) => out.write_str(name.raw()),
            Self::Placeholder(param) => param.render_template(out),
            Self::Replacement(param) => write!(out, "${}$", param.name()),
            Self::ExprPlaceholder(param) => write!(out, "#{{{}}}", param.source()),
            Self::ExprReplacement(param) => write!(out, "${{{}}}", param.source()),
            Self::JdbcPlaceholder => out.write_char('?'),
            Self::Container(container) => render_template(container.nodes(), out),
            Self::Dynamic(clause) => clause.render_template(out),
            Self::Conditional(node) => node.render_template(out),
            Self::If(clause) => clause.render_template(out),
            Self::Tag(tag) => tag.render_template(out),
            Self::Include(include) => out.write_str(include.head()),
        }
    }

    /// Writes the node as plain SQL.
    ///
    /// Bind parameters become `?` and dynamic clauses lose their braces.
    /// Nodes without a plain SQL form fall back to their template syntax.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn render_sql(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self {
            Self::Placeholder(_) | Self::ExprPlaceholder(_) | Self::JdbcPlaceholder => {
                out.write_char('?')
            }
            Self::Container(container) => render_sql(container.nodes(), out),
            Self::Dynamic(clause) => clause.render_sql(out),
            _ => self.render_template(out),
        }
    }

    /// Emits the node's SQL and bound values for one parameter set.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be evaluated, a `?` is used with
    /// named parameters, a tag fails or an included fragment is missing.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        match self {
            Self::Text(text) => {
                builder.append(text.as_str());
                Ok(())
            }
            Self::Token(token) => {
                builder.append(token.text());
                Ok(())
            }
            Self::ObjectName(name) => name.build_statement(builder),
            Self::TableName(name) => name.build_statement(builder, params),
            Self::Placeholder(param) => param.build_statement(builder, params),
            Self::Replacement(param) => param.build_statement(builder, params),
            Self::ExprPlaceholder(param) => param.build_statement(builder, params),
            Self::ExprReplacement(param) => param.build_statement(builder, params),
            Self::JdbcPlaceholder => {
                let index = builder.next_parameter_index();
                if !params.is_indexed() {
                    return Err(SqlError::illegal_argument(
                        "'?' placeholders require positional parameters",
                    ));
                }
                let value = params.get_at(index).unwrap_or(SqlValue::Null);
                builder.append_placeholder(value, Scope::Unknown);
                Ok(())
            }
            Self::Container(container) => build_statement(container.nodes(), builder, params),
            Self::Dynamic(clause) => clause.build_statement(builder, params),
            Self::Conditional(node) => node.build_statement(builder, params),
            Self::If(clause) => clause.build_statement(builder, params),
            Self::Tag(tag) => tag.build_statement(builder, params),
            Self::Include(include) => include.build_statement(builder, params),
        }
    }

    /// Emits the node's SQL and parameter descriptors for batch execution.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ClauseConfig`] for replacement parameters,
    /// conditional clauses, tags and dynamic table names, none of which can
    /// be decided without a concrete parameter set.
    pub fn prepare_batch_statement(
        &self,
        builder: &mut PreparedBatchStatementBuilder<'_>,
    ) -> Result<()> {
        match self {
            Self::Text(text) => {
                builder.append(text.as_str());
                Ok(())
            }
            Self::Token(token) => {
                builder.append(token.text());
                Ok(())
            }
            Self::ObjectName(name) => name.prepare_batch_statement(builder),
            Self::TableName(name) => name.prepare_batch_statement(builder),
            Self::Placeholder(param) => {
                param.prepare_batch_statement(builder);
                Ok(())
            }
            Self::Replacement(param) => Err(SqlError::clause_config(format!(
                "Replacement parameter '${}$' is not allowed in batch statements",
                param.name()
            ))),
            Self::ExprReplacement(param) => Err(SqlError::clause_config(format!(
                "Replacement expression '${{{}}}' is not allowed in batch statements",
                param.source()
            ))),
            Self::ExprPlaceholder(param) => {
                param.prepare_batch_statement(builder);
                Ok(())
            }
            Self::JdbcPlaceholder => {
                let index = builder.next_parameter_index();
                builder.append_char('?');
                builder.add_batch_parameter(BatchParameter::positional(index));
                Ok(())
            }
            Self::Container(container) => prepare_batch_statement(container.nodes(), builder),
            Self::Dynamic(clause) => clause.prepare_batch_statement(builder),
            Self::Conditional(_) | Self::If(_) => Err(SqlError::clause_config(
                "Conditional clauses are not allowed in batch statements",
            )),
            Self::Tag(tag) => Err(SqlError::clause_config(format!(
                "Tag '@{}' is not allowed in batch statements",
                tag.name()
            ))),
            Self::Include(include) => include.prepare_batch_statement(builder),
        }
    }

    /// Walks the node depth-first, the node itself before its children.
    ///
    /// Returns `false` as soon as the visitor does, `true` otherwise.
    /// Included fragments are not entered.
    pub fn traverse(&self, visitor: &mut dyn FnMut(&Self) -> bool) -> bool {
        if !visitor(self) {
            return false;
        }
        match self {
            Self::Container(container) => traverse(container.nodes(), visitor),
            Self::Dynamic(clause) => traverse(clause.nodes(), visitor),
            Self::Conditional(node) => traverse(node.nodes(), visitor),
            Self::If(clause) => {
                for branch in clause.branches() {
                    if !traverse(branch.body().nodes(), visitor) {
                        return false;
                    }
                }
                clause
                    .else_branch()
                    .map_or(true, |branch| traverse(branch.body().nodes(), visitor))
            }
            _ => true,
        }
    }
}

/// Writes the template syntax of a node list.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render_template(nodes: &[AstNode], out: &mut dyn fmt::Write) -> fmt::Result {
    nodes.iter().try_for_each(|node| node.render_template(out))
}

/// Writes a node list as plain SQL.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render_sql(nodes: &[AstNode], out: &mut dyn fmt::Write) -> fmt::Result {
    nodes.iter().try_for_each(|node| node.render_sql(out))
}

/// Builds a node list left to right.
///
/// # Errors
///
/// Returns the first error raised by a node.
pub fn build_statement(
    nodes: &[AstNode],
    builder: &mut SqlStatementBuilder<'_>,
    params: &dyn Params,
) -> Result<()> {
    nodes
        .iter()
        .try_for_each(|node| node.build_statement(builder, params))
}

/// Prepares a node list for batch execution, left to right.
///
/// # Errors
///
/// Returns the first error raised by a node.
pub fn prepare_batch_statement(
    nodes: &[AstNode],
    builder: &mut PreparedBatchStatementBuilder<'_>,
) -> Result<()> {
    nodes
        .iter()
        .try_for_each(|node| node.prepare_batch_statement(builder))
}

/// Walks a node list, stopping when the visitor returns `false`.
pub fn traverse(nodes: &[AstNode], visitor: &mut dyn FnMut(&AstNode) -> bool) -> bool {
    nodes.iter().all(|node| node.traverse(visitor))
}
