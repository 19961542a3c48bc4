//! Parsed templates.

use std::fmt;

use crate::ast::{self, AstNode, ContainerKind, SqlContainer, Text};
use crate::builder::{
    PreparedBatchStatement, PreparedBatchStatementBuilder, SqlStatement, SqlStatementBuilder,
};
use crate::context::SqlContext;
use crate::error::Result;
use crate::lexer::Keyword;
use crate::params::Params;
use crate::resolver::SqlResolver;

/// Statement kind of a template, from its first keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// `SELECT`
    Select,
    /// `INSERT`
    Insert,
    /// `UPDATE`
    Update,
    /// `DELETE`
    Delete,
    /// Anything else.
    Unresolved,
}

impl From<ContainerKind> for SqlType {
    fn from(kind: ContainerKind) -> Self {
        match kind {
            ContainerKind::Select => Self::Select,
            ContainerKind::Insert => Self::Insert,
            ContainerKind::Update => Self::Update,
            ContainerKind::Delete => Self::Delete,
        }
    }
}

/// A parsed template.
///
/// Parsed once and built many times, possibly from several threads.
#[derive(Debug, Clone)]
pub struct Sql {
    sql_type: SqlType,
    nodes: Vec<AstNode>,
}

impl Sql {
    /// Creates a template from nodes.
    #[must_use]
    pub const fn new(sql_type: SqlType, nodes: Vec<AstNode>) -> Self {
        Self { sql_type, nodes }
    }

    /// Creates an empty template.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(SqlType::Unresolved, Vec::new())
    }

    /// Returns the statement kind.
    #[must_use]
    pub const fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    /// Returns true for `SELECT` statements.
    #[must_use]
    pub fn is_select(&self) -> bool {
        self.sql_type == SqlType::Select
    }

    /// Returns the top level nodes.
    #[must_use]
    pub fn nodes(&self) -> &[AstNode] {
        &self.nodes
    }

    /// Resolves tag processors, then entity and field mappings.
    ///
    /// Call once, before the template is built concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ClauseConfig`](crate::SqlError::ClauseConfig) for a
    /// tag with no registered processor, or a processor's error.
    pub fn prepare(&self, ctx: &SqlContext) -> Result<()> {
        let mut result = Ok(());
        self.traverse(&mut |node| {
            if let AstNode::Tag(tag) = node {
                result = tag.prepare(ctx);
            }
            result.is_ok()
        });
        result?;
        if !ctx.metadata().is_empty() {
            SqlResolver::new(ctx).resolve(self);
        }
        Ok(())
    }

    /// Builds a statement for one parameter set.
    ///
    /// `query` is true for statements that read rows, which turns `= NULL`
    /// comparisons into `is null`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a node.
    pub fn build_statement(
        &self,
        ctx: &SqlContext,
        params: &dyn Params,
        query: bool,
    ) -> Result<SqlStatement> {
        let mut builder = SqlStatementBuilder::new(ctx, self, query);
        ast::build_statement(&self.nodes, &mut builder, params)?;
        Ok(builder.build())
    }

    /// Builds SQL and parameter descriptors for batch execution.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ClauseConfig`](crate::SqlError::ClauseConfig) for
    /// nodes that need a concrete parameter set.
    pub fn prepare_batch_statement(&self, ctx: &SqlContext) -> Result<PreparedBatchStatement> {
        let mut builder = PreparedBatchStatementBuilder::new(ctx, self);
        ast::prepare_batch_statement(&self.nodes, &mut builder)?;
        Ok(builder.build())
    }

    /// Builds a query whose ordering is `order by {order_by}`.
    ///
    /// The select's own `ORDER BY` and every `$orderBy$` replacement are
    /// replaced by the given ordering. Without either, the ordering is
    /// appended to the select, before `LIMIT` or `OFFSET` when present.
    /// Parameters inside a replaced `ORDER BY` are skipped, not bound.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a node.
    pub fn build_ordered_statement(
        &self,
        ctx: &SqlContext,
        params: &dyn Params,
        order_by: &str,
    ) -> Result<SqlStatement> {
        let clause = format!("order by {}", order_by.trim());
        let mut builder = SqlStatementBuilder::new(ctx, self, true);
        let select = self.nodes.iter().position(|node| {
            matches!(node, AstNode::Container(c) if c.kind() == ContainerKind::Select)
        });
        match select.map(|i| (i, &self.nodes[i])) {
            Some((index, AstNode::Container(container))) => {
                ast::build_statement(&self.nodes[..index], &mut builder, params)?;
                build_ordered(container.nodes(), &mut builder, params, &clause)?;
                ast::build_statement(&self.nodes[index + 1..], &mut builder, params)?;
            }
            _ => build_ordered(&self.nodes, &mut builder, params, &clause)?,
        }
        Ok(builder.build())
    }

    /// Walks every node depth-first. See [`AstNode::traverse`].
    pub fn traverse(&self, visitor: &mut dyn FnMut(&AstNode) -> bool) -> bool {
        ast::traverse(&self.nodes, visitor)
    }

    /// Writes the template as plain SQL with `?` placeholders.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn render_sql(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        ast::render_sql(&self.nodes, out)
    }

    /// Derives a template counting the rows this select returns.
    ///
    /// The select list becomes `count(*)` and `ORDER BY` is dropped. Selects
    /// with `DISTINCT`, `GROUP BY` or `UNION` are wrapped in
    /// `select count(*) from (..) t_count` instead. Returns `None` unless the
    /// template was parsed into a select container.
    #[must_use]
    pub fn to_count_sql(&self) -> Option<Self> {
        let index = self.nodes.iter().position(|node| {
            matches!(node, AstNode::Container(c) if c.kind() == ContainerKind::Select)
        })?;
        let AstNode::Container(container) = &self.nodes[index] else {
            return None;
        };
        let keyword_at = |keyword: Keyword, from: usize| {
            container.nodes()[from..]
                .iter()
                .position(|node| matches!(node, AstNode::Token(t) if t.keyword() == keyword))
                .map(|i| i + from)
        };
        let select = keyword_at(Keyword::Select, 0)?;
        let wrap = container.nodes()[select + 1..]
            .iter()
            .find(|node| !matches!(node, AstNode::Text(t) if t.is_blank()))
            .is_some_and(|node| {
                matches!(node, AstNode::Token(t) if t.keyword() == Keyword::Distinct)
            })
            || keyword_at(Keyword::Group, select).is_some()
            || keyword_at(Keyword::Union, select).is_some();

        let mut nodes = self.nodes.clone();
        if wrap {
            let inner = nodes.remove(index);
            nodes.splice(
                index..index,
                [
                    AstNode::text("select count(*) from ("),
                    inner,
                    AstNode::text(") t_count"),
                ],
            );
            return Some(Self::new(SqlType::Select, nodes));
        }

        let from = keyword_at(Keyword::From, select)?;
        let order = keyword_at(Keyword::Order, from);
        let mut children = Vec::with_capacity(container.nodes().len());
        children.extend_from_slice(&container.nodes()[..=select]);
        children.push(AstNode::Text(Text::new(" count(*) ")));
        match order {
            Some(order) => {
                let end = keyword_at(Keyword::Limit, order)
                    .or_else(|| keyword_at(Keyword::Offset, order))
                    .unwrap_or(container.nodes().len());
                children.extend_from_slice(&container.nodes()[from..order]);
                children.extend_from_slice(&container.nodes()[end..]);
            }
            None => children.extend_from_slice(&container.nodes()[from..]),
        }
        nodes[index] = AstNode::Container(SqlContainer::new(ContainerKind::Select, children));
        Some(Self::new(SqlType::Select, nodes))
    }
}

fn is_keyword(node: &AstNode, keyword: Keyword) -> bool {
    matches!(node, AstNode::Token(t) if t.keyword() == keyword)
}

fn is_order_by_replacement(node: &AstNode) -> bool {
    matches!(node, AstNode::Replacement(p) if p.name().eq_ignore_ascii_case("orderBy"))
}

/// Returns the position of the statement's own `ORDER BY`, skipping ones
/// nested in parentheses such as window definitions.
fn main_order_by(nodes: &[AstNode]) -> Option<usize> {
    nodes.iter().enumerate().rev().find_map(|(i, node)| {
        if !is_keyword(node, Keyword::Order) {
            return None;
        }
        let mut rest = String::new();
        ast::render_sql(&nodes[i..], &mut rest).ok()?;
        let mut depth = 0_i32;
        for c in rest.chars() {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return None;
            }
        }
        Some(i)
    })
}

/// Builds `nodes` with the ordering spliced in. Skipped nodes still advance
/// the parameter index.
fn build_ordered(
    nodes: &[AstNode],
    builder: &mut SqlStatementBuilder<'_>,
    params: &dyn Params,
    clause: &str,
) -> Result<()> {
    let order = main_order_by(nodes);
    let tail = |from: usize| {
        nodes[from..]
            .iter()
            .position(|node| is_keyword(node, Keyword::Limit) || is_keyword(node, Keyword::Offset))
            .map(|i| i + from)
    };
    let order_end = order.map(|order| tail(order).unwrap_or(nodes.len()));
    let placeholder = nodes.iter().any(is_order_by_replacement);
    let append_at = if order.is_none() && !placeholder {
        Some(tail(0).unwrap_or(nodes.len()))
    } else {
        None
    };

    let mut i = 0;
    while i < nodes.len() {
        if append_at == Some(i) {
            builder.append(clause);
            builder.append_char(' ');
        }
        if order == Some(i) {
            let end = order_end.unwrap_or(nodes.len());
            builder.append(clause);
            if end < nodes.len() {
                builder.append_char(' ');
            }
            builder.skip_parameters(ast::count_parameter_slots(&nodes[i..end]));
            i = end;
            continue;
        }
        if is_order_by_replacement(&nodes[i]) {
            builder.next_parameter_index();
            builder.append(clause);
        } else {
            nodes[i].build_statement(builder, params)?;
        }
        i += 1;
    }
    if append_at == Some(nodes.len()) {
        builder.append_char(' ');
        builder.append(clause);
    }
    Ok(())
}

impl fmt::Display for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ast::render_template(&self.nodes, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn count_sql(text: &str) -> Option<String> {
        let ctx = SqlContext::default();
        let sql = Parser::new(&ctx).parse(text).unwrap();
        sql.to_count_sql().map(|sql| sql.to_string())
    }

    #[test]
    fn test_count_sql_replaces_select_list() {
        assert_eq!(
            count_sql("select a, b from t where a = :a order by b desc").as_deref(),
            Some("select count(*) from t where a = :a ")
        );
        assert_eq!(
            count_sql("SELECT * FROM t ORDER BY a LIMIT 10").as_deref(),
            Some("SELECT count(*) FROM t LIMIT 10")
        );
    }

    #[test]
    fn test_count_sql_wraps_distinct_and_group_by() {
        assert_eq!(
            count_sql("select distinct a from t").as_deref(),
            Some("select count(*) from (select distinct a from t) t_count")
        );
        assert_eq!(
            count_sql("select a, count(*) from t group by a").as_deref(),
            Some("select count(*) from (select a, count(*) from t group by a) t_count")
        );
    }

    #[test]
    fn test_count_sql_needs_select() {
        assert_eq!(count_sql("delete from t"), None);
        let ctx = SqlContext::default();
        let sql = Parser::new(&ctx)
            .with_level(crate::parser::ParseLevel::Base)
            .parse("select a from t")
            .unwrap();
        assert!(sql.to_count_sql().is_none());
    }

    #[test]
    fn test_render_sql() {
        let ctx = SqlContext::default();
        let sql = Parser::new(&ctx)
            .parse("select * from t where {? a = :a } and b = #{b}")
            .unwrap();
        let mut out = String::new();
        sql.render_sql(&mut out).unwrap();
        assert_eq!(out, "select * from t where  a = ?  and b = ?");
    }
}
