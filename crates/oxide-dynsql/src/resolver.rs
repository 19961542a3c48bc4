//! Attaches entity and field mappings to parsed names.
//!
//! Runs once, when a template is prepared. Table names are matched against
//! entity table names, then entity names. Column names are matched through
//! their qualifier (an alias or a table name) or, when unqualified, against
//! every table of the statement and then of the enclosing statements.
//!
//! The resolver also records which column every `INSERT .. VALUES` and
//! `UPDATE .. SET` placeholder writes, so batch statements can pick the
//! column's generated value.

use std::sync::Arc;

use tracing::trace;

use crate::ast::{
    AstNode, ColumnUsage, ContainerKind, ParamTarget, Scope, SqlContainer, SqlObjectName,
    SqlTableName,
};
use crate::context::SqlContext;
use crate::lexer::Keyword;
use crate::mapping::FieldMapping;
use crate::sql::Sql;

/// Resolves names of parsed templates against a context's metadata.
pub struct SqlResolver<'c> {
    ctx: &'c SqlContext,
}

impl<'c> SqlResolver<'c> {
    /// Creates a resolver.
    #[must_use]
    pub const fn new(ctx: &'c SqlContext) -> Self {
        Self { ctx }
    }

    /// Resolves every statement container of a template.
    pub fn resolve(&self, sql: &Sql) {
        for node in sql.nodes() {
            if let AstNode::Container(container) = node {
                self.resolve_container(container, &[]);
            }
        }
    }

    fn resolve_container(&self, container: &SqlContainer, outer: &[&SqlTableName]) {
        let mut leaves = Vec::new();
        let mut nested = Vec::new();
        flatten(container.nodes(), &mut leaves, &mut nested);

        let tables: Vec<&SqlTableName> = leaves
            .iter()
            .filter_map(|node| match node {
                AstNode::TableName(table) => Some(table),
                _ => None,
            })
            .collect();
        for table in &tables {
            self.resolve_table(table);
        }
        let visible: Vec<&SqlTableName> = tables.iter().chain(outer).copied().collect();

        let aliases = select_aliases(&leaves);
        for (i, node) in leaves.iter().enumerate() {
            let AstNode::ObjectName(name) = node else {
                continue;
            };
            if name.scope() == Scope::From || aliases.iter().any(|alias| alias.index == i) {
                continue;
            }
            match find_field(name, &visible) {
                Some(field) => name.set_field(Arc::clone(field)),
                None => trace!(name = name.raw(), "column not mapped"),
            }
        }
        for node in &leaves {
            let AstNode::ObjectName(name) = node else {
                continue;
            };
            if name.scope() != Scope::OrderBy || name.qualifier().is_some() {
                continue;
            }
            let target = aliases.iter().find_map(|alias| {
                alias
                    .name
                    .eq_ignore_ascii_case(name.last_name())
                    .then_some(alias.target)
                    .flatten()
            });
            if let Some(target) = target {
                name.set_reference(target.clone());
            }
        }

        match container.kind() {
            ContainerKind::Insert => pair_insert_values(&leaves),
            ContainerKind::Update => pair_update_values(&leaves),
            ContainerKind::Select | ContainerKind::Delete => {}
        }

        for inner in nested {
            self.resolve_container(inner, &visible);
        }
    }

    fn resolve_table(&self, table: &SqlTableName) {
        if table.entity().is_some() {
            return;
        }
        let metadata = self.ctx.metadata();
        let name = table.last_name();
        let entity = metadata
            .try_get_entity_mapping_by_table_name(name)
            .or_else(|| metadata.try_get_entity_mapping(name));
        match entity {
            Some(entity) => table.set_entity(Arc::clone(entity)),
            None => trace!(table = name, "table not mapped"),
        }
    }
}

/// Collects leaf nodes in order, entering conditional clauses but not nested
/// statements, which are collected separately.
fn flatten<'n>(
    nodes: &'n [AstNode],
    leaves: &mut Vec<&'n AstNode>,
    nested: &mut Vec<&'n SqlContainer>,
) {
    for node in nodes {
        match node {
            AstNode::Container(container) => nested.push(container),
            AstNode::Dynamic(clause) => flatten(clause.nodes(), leaves, nested),
            AstNode::Conditional(clause) => flatten(clause.nodes(), leaves, nested),
            AstNode::If(clause) => {
                for branch in clause.branches() {
                    flatten(branch.body().nodes(), leaves, nested);
                }
                if let Some(branch) = clause.else_branch() {
                    flatten(branch.body().nodes(), leaves, nested);
                }
            }
            _ => leaves.push(node),
        }
    }
}

fn is_blank(node: &AstNode) -> bool {
    matches!(node, AstNode::Text(text) if text.is_blank())
}

/// A select list alias and the name it renames, if any.
struct Alias<'n> {
    index: usize,
    name: &'n str,
    target: Option<&'n SqlObjectName>,
}

/// Finds `expr [as] alias` in select lists.
fn select_aliases<'n>(leaves: &[&'n AstNode]) -> Vec<Alias<'n>> {
    let mut aliases = Vec::new();
    for (i, node) in leaves.iter().enumerate() {
        let AstNode::ObjectName(name) = node else {
            continue;
        };
        if name.scope() != Scope::SelectList {
            continue;
        }
        let mut prev = leaves[..i].iter().rev().filter(|n| !is_blank(n));
        let target = match prev.next() {
            Some(AstNode::Token(token)) if token.keyword() == Keyword::As => {
                match prev.next() {
                    Some(AstNode::ObjectName(target)) => Some(target),
                    _ => None,
                }
            }
            Some(AstNode::ObjectName(target)) if target.scope() == Scope::SelectList => {
                Some(target)
            }
            _ => continue,
        };
        aliases.push(Alias {
            index: i,
            name: name.last_name(),
            target,
        });
    }
    aliases
}

fn find_field<'t>(
    name: &SqlObjectName,
    tables: &[&'t SqlTableName],
) -> Option<&'t Arc<FieldMapping>> {
    if let Some(qualifier) = name.qualifier() {
        return tables
            .iter()
            .find(|table| table.is_named(qualifier))
            .and_then(|table| table.entity())
            .and_then(|entity| entity.resolve_field(name.last_name()));
    }
    tables
        .iter()
        .filter_map(|table| table.entity())
        .find_map(|entity| entity.resolve_field(name.last_name()))
}

/// Targets `VALUES` placeholders at the column in the same position of the
/// column list.
fn pair_insert_values(leaves: &[&AstNode]) {
    let columns: Vec<&SqlObjectName> = leaves
        .iter()
        .filter_map(|node| match node {
            AstNode::ObjectName(name) if name.scope() == Scope::Columns => Some(name),
            _ => None,
        })
        .collect();
    let mut depth = 0usize;
    let mut item = 0usize;
    let mut quoted = false;
    for node in leaves {
        match node {
            AstNode::Text(text) => {
                for c in text.as_str().chars() {
                    match c {
                        '\'' => quoted = !quoted,
                        _ if quoted => {}
                        '(' => depth += 1,
                        ')' => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                item = 0;
                            }
                        }
                        ',' if depth == 1 => item += 1,
                        _ => {}
                    }
                }
            }
            AstNode::Placeholder(param) if param.scope() == Scope::Values && depth == 1 => {
                let field = columns.get(item).and_then(|column| column.resolved_field());
                if let Some(field) = field {
                    param.set_target(ParamTarget::new(Arc::clone(field), ColumnUsage::Insert));
                }
            }
            _ => {}
        }
    }
}

/// Targets `SET` placeholders at the column assigned to.
fn pair_update_values(leaves: &[&AstNode]) {
    let mut column: Option<&SqlObjectName> = None;
    for node in leaves {
        match node {
            AstNode::ObjectName(name) if name.scope() == Scope::Set => column = Some(name),
            AstNode::Placeholder(param) if param.scope() == Scope::Set => {
                if let Some(field) = column.take().and_then(SqlObjectName::resolved_field) {
                    param.set_target(ParamTarget::new(Arc::clone(field), ColumnUsage::Update));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{EntityMapping, OrmMetadata};
    use crate::parser::Parser;

    fn context() -> SqlContext {
        let metadata = OrmMetadata::new()
            .with_entity(
                EntityMapping::new("User", "users")
                    .with_field(FieldMapping::new("userId", "user_id").primary_key())
                    .with_field(FieldMapping::new("firstName", "first_name")),
            )
            .with_entity(
                EntityMapping::new("Order", "orders")
                    .with_field(FieldMapping::new("orderId", "order_id").primary_key())
                    .with_field(FieldMapping::new("userId", "user_id")),
            );
        SqlContext::default().with_metadata(Arc::new(metadata))
    }

    fn names(sql: &Sql) -> Vec<(String, Option<String>)> {
        let mut out = Vec::new();
        sql.traverse(&mut |node| {
            if let AstNode::ObjectName(name) = node {
                out.push((
                    name.raw().to_string(),
                    name.resolved_field().map(|f| f.column_name().to_string()),
                ));
            }
            true
        });
        out
    }

    #[test]
    fn test_resolves_by_qualifier_and_table() {
        let ctx = context();
        let sql = Parser::new(&ctx)
            .parse("select u.firstName, o.orderId from User u join orders o on o.userId = u.id")
            .unwrap();
        SqlResolver::new(&ctx).resolve(&sql);
        assert_eq!(
            names(&sql),
            vec![
                (String::from("u.firstName"), Some(String::from("first_name"))),
                (String::from("o.orderId"), Some(String::from("order_id"))),
                (String::from("o.userId"), Some(String::from("user_id"))),
                (String::from("u.id"), Some(String::from("user_id"))),
            ]
        );
    }

    #[test]
    fn test_aliases_are_not_resolved() {
        let ctx = context();
        let sql = Parser::new(&ctx)
            .parse("select firstName as userId from users order by userId")
            .unwrap();
        SqlResolver::new(&ctx).resolve(&sql);
        let names = names(&sql);
        assert_eq!(names[0].1.as_deref(), Some("first_name"));
        assert_eq!(names[1].1, None);
        // order by the alias follows it to the aliased column
        assert_eq!(names[2].1.as_deref(), Some("first_name"));
    }

    #[test]
    fn test_outer_tables_visible_in_subquery() {
        let ctx = context();
        let sql = Parser::new(&ctx)
            .parse(
                "select * from users u where exists \
                 (select 1 from orders where userId = u.userId)",
            )
            .unwrap();
        SqlResolver::new(&ctx).resolve(&sql);
        let names = names(&sql);
        assert!(names.iter().all(|(_, field)| field.is_some()), "{names:?}");
    }

    #[test]
    fn test_insert_and_update_targets() {
        let ctx = context();
        let sql = Parser::new(&ctx)
            .parse("insert into users (userId, note, firstName) values (:a, 'x', :b)")
            .unwrap();
        SqlResolver::new(&ctx).resolve(&sql);
        let mut targets = Vec::new();
        sql.traverse(&mut |node| {
            if let AstNode::Placeholder(p) = node {
                targets.push(p.target().map(|t| t.field().field_name().to_string()));
            }
            true
        });
        assert_eq!(
            targets,
            vec![Some(String::from("userId")), Some(String::from("firstName"))]
        );

        let sql = Parser::new(&ctx)
            .parse("update users set firstName = :name where userId = :id")
            .unwrap();
        SqlResolver::new(&ctx).resolve(&sql);
        let mut targets = Vec::new();
        sql.traverse(&mut |node| {
            if let AstNode::Placeholder(p) = node {
                targets.push(p.target().map(|t| t.usage()));
            }
            true
        });
        assert_eq!(targets, vec![Some(ColumnUsage::Update), None]);
    }
}
