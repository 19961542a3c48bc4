//! Statement containers and conditional clauses.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::trace;

use super::params::IfCondition;
use super::{build_statement, prepare_batch_statement, render_sql, render_template, AstNode};
use crate::builder::{PreparedBatchStatementBuilder, SqlStatementBuilder};
use crate::context::SqlContext;
use crate::el::Expression;
use crate::error::{Result, SqlError};
use crate::params::{resolve_named, ParamScope, Params};
use crate::tag::TagProcessor;

/// Statement kind of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// `SELECT`
    Select,
    /// `INSERT`
    Insert,
    /// `UPDATE`
    Update,
    /// `DELETE`
    Delete,
}

/// A whole statement or a nested subquery.
#[derive(Debug, Clone)]
pub struct SqlContainer {
    kind: ContainerKind,
    nodes: Vec<AstNode>,
}

impl SqlContainer {
    /// Creates a container.
    #[must_use]
    pub const fn new(kind: ContainerKind, nodes: Vec<AstNode>) -> Self {
        Self { kind, nodes }
    }

    /// Returns the statement kind.
    #[must_use]
    pub const fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Returns the children.
    #[must_use]
    pub fn nodes(&self) -> &[AstNode] {
        &self.nodes
    }
}

/// A parameter read by a dynamic clause, with its index offset inside the
/// clause.
#[derive(Debug, Clone)]
struct ClauseParam {
    name: String,
    offset: usize,
}

/// Returns true for nodes that advance the parameter index when built.
const fn advances_index(node: &AstNode) -> bool {
    matches!(
        node,
        AstNode::Placeholder(_)
            | AstNode::Replacement(_)
            | AstNode::ExprPlaceholder(_)
            | AstNode::ExprReplacement(_)
            | AstNode::JdbcPlaceholder
    )
}

/// Collects named parameters and tags. Names inside nested dynamic clauses
/// are left to those clauses, but their slots still count.
fn collect_params(
    nodes: &[AstNode],
    params: &mut Vec<ClauseParam>,
    slots: &mut usize,
    tags: &mut usize,
) {
    for node in nodes {
        match node {
            AstNode::Placeholder(p) => params.push(ClauseParam {
                name: p.name().to_string(),
                offset: *slots,
            }),
            AstNode::Replacement(p) => params.push(ClauseParam {
                name: p.name().to_string(),
                offset: *slots,
            }),
            AstNode::Tag(_) => *tags += 1,
            AstNode::Dynamic(d) => *slots += d.slots,
            AstNode::Container(c) => collect_params(c.nodes(), params, slots, tags),
            AstNode::Conditional(c) => collect_params(c.nodes(), params, slots, tags),
            AstNode::If(clause) => {
                for branch in clause.branches() {
                    collect_params(branch.body().nodes(), params, slots, tags);
                }
                if let Some(branch) = clause.else_branch() {
                    collect_params(branch.body().nodes(), params, slots, tags);
                }
            }
            _ => {}
        }
        if advances_index(node) {
            *slots += 1;
        }
    }
}

/// Returns how many parameter index slots building `nodes` consumes.
pub(crate) fn slot_count(nodes: &[AstNode]) -> usize {
    let (mut params, mut slots, mut tags) = (Vec::new(), 0, 0);
    collect_params(nodes, &mut params, &mut slots, &mut tags);
    slots
}

/// `{? .. }`: a clause elided when its parameters are missing.
///
/// The whitespace written right before `{?` belongs to the clause and is
/// elided with it. By default the clause is built only when every named
/// parameter it reads resolves to a non-null value. With the
/// `nullable:true` option it is built when every name is present in the
/// source, even with a NULL value. A clause holding only tags is built
/// speculatively and rolled back when a tag emits nothing.
///
/// An elided clause still advances the parameter index by every slot it
/// holds, nested clauses included, so positional sources stay aligned.
#[derive(Debug, Clone)]
pub struct DynamicClause {
    leading: String,
    nodes: Vec<AstNode>,
    options: Option<String>,
    nullable: bool,
    params: Vec<ClauseParam>,
    slots: usize,
    tag_only: bool,
}

impl DynamicClause {
    /// Creates a dynamic clause from its children and raw option text.
    #[must_use]
    pub fn new(nodes: Vec<AstNode>, options: Option<String>) -> Self {
        let mut params = Vec::new();
        let mut slots = 0;
        let mut tags = 0;
        collect_params(&nodes, &mut params, &mut slots, &mut tags);
        let nullable = options.as_deref().is_some_and(|text| {
            text.split(',').any(|option| {
                option.split_once(':').is_some_and(|(key, value)| {
                    key.trim().eq_ignore_ascii_case("nullable")
                        && value.trim().eq_ignore_ascii_case("true")
                })
            })
        });
        let tag_only = params.is_empty() && tags > 0;
        Self {
            leading: String::new(),
            nodes,
            options,
            nullable,
            params,
            slots,
            tag_only,
        }
    }

    /// Sets the whitespace preceding `{?`.
    #[must_use]
    pub fn with_leading(mut self, leading: impl Into<String>) -> Self {
        self.leading = leading.into();
        self
    }

    /// Returns the children.
    #[must_use]
    pub fn nodes(&self) -> &[AstNode] {
        &self.nodes
    }

    /// Returns true if the clause is built whenever its names are present.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns the number of parameter index slots the clause consumes.
    #[must_use]
    pub const fn slots(&self) -> usize {
        self.slots
    }

    /// Returns the names of the parameters the clause depends on.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub(crate) fn render_template(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(&self.leading)?;
        out.write_str("{?")?;
        render_template(&self.nodes, out)?;
        if let Some(options) = &self.options {
            write!(out, ";{options}")?;
        }
        out.write_char('}')
    }

    pub(crate) fn render_sql(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(&self.leading)?;
        render_sql(&self.nodes, out)
    }

    fn is_satisfied(&self, builder: &SqlStatementBuilder<'_>, params: &dyn Params) -> bool {
        let base = builder.parameter_index();
        if self.nullable {
            return self.params.iter().all(|p| {
                params.contains(&p.name)
                    || (params.is_indexed() && params.get_at(base + p.offset).is_some())
            });
        }
        self.params
            .iter()
            .all(|p| !resolve_named(params, &p.name, base + p.offset).is_null())
    }

    /// Builds the clause, or nothing when its parameters are missing.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a child.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        if self.tag_only {
            return self.build_tag_only(builder, params);
        }
        if !self.is_satisfied(builder, params) {
            trace!(names = ?self.names().collect::<Vec<_>>(), "dynamic clause elided");
            builder.skip_parameters(self.slots);
            return Ok(());
        }
        builder.append(&self.leading);
        build_statement(&self.nodes, builder, params)
    }

    /// Prepares the children for batches. Batch statements keep every
    /// dynamic clause.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a child.
    pub fn prepare_batch_statement(
        &self,
        builder: &mut PreparedBatchStatementBuilder<'_>,
    ) -> Result<()> {
        builder.append(&self.leading);
        prepare_batch_statement(&self.nodes, builder)
    }

    fn build_tag_only(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        let clause = builder.create_save_point();
        builder.append(&self.leading);
        for node in &self.nodes {
            if matches!(node, AstNode::Tag(_)) {
                let tag = builder.create_save_point();
                node.build_statement(builder, params)?;
                if !tag.has_changes(builder) {
                    clause.restore(builder);
                    builder.skip_parameters(self.slots);
                    trace!("tag-only dynamic clause elided");
                    return Ok(());
                }
            } else {
                node.build_statement(builder, params)?;
            }
        }
        Ok(())
    }
}

/// Children built only when an expression is true.
#[derive(Debug, Clone)]
pub struct ConditionalNode {
    expr: Arc<dyn Expression>,
    nodes: Vec<AstNode>,
}

impl ConditionalNode {
    /// Creates a conditional node.
    #[must_use]
    pub fn new(expr: Arc<dyn Expression>, nodes: Vec<AstNode>) -> Self {
        Self { expr, nodes }
    }

    /// Returns the children.
    #[must_use]
    pub fn nodes(&self) -> &[AstNode] {
        &self.nodes
    }

    pub(crate) fn render_template(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "@if({})", self.expr.source())?;
        render_template(&self.nodes, out)?;
        out.write_str("@endif")
    }

    /// Builds the children when the expression is true.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression or a child fails.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        let matched = {
            let scope = ParamScope::with_vars(params, builder.vars());
            self.expr.test(&scope)?
        };
        if matched {
            build_statement(&self.nodes, builder, params)?;
        }
        Ok(())
    }
}

/// The body of an `@if`, `@elseif` or `@else` branch.
///
/// `open` and `close` keep the delimiters as written: `{` and `}` for the
/// braced form, empty otherwise.
#[derive(Debug, Clone)]
pub struct IfBody {
    open: String,
    nodes: Vec<AstNode>,
    close: String,
}

impl IfBody {
    /// Creates a body.
    #[must_use]
    pub fn new(open: impl Into<String>, nodes: Vec<AstNode>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            nodes,
            close: close.into(),
        }
    }

    /// Returns the children.
    #[must_use]
    pub fn nodes(&self) -> &[AstNode] {
        &self.nodes
    }

    fn render_template(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(&self.open)?;
        render_template(&self.nodes, out)?;
        out.write_str(&self.close)
    }
}

/// An `@if(..)` or `@elseif(..)` branch.
#[derive(Debug, Clone)]
pub struct IfStatement {
    head: String,
    condition: IfCondition,
    body: IfBody,
}

impl IfStatement {
    /// Creates a branch. `head` is the branch keyword and condition as
    /// written.
    #[must_use]
    pub fn new(head: impl Into<String>, condition: IfCondition, body: IfBody) -> Self {
        Self {
            head: head.into(),
            condition,
            body,
        }
    }

    /// Returns the condition.
    #[must_use]
    pub const fn condition(&self) -> &IfCondition {
        &self.condition
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> &IfBody {
        &self.body
    }
}

/// The `@else` branch.
#[derive(Debug, Clone)]
pub struct ElseStatement {
    head: String,
    body: IfBody,
}

impl ElseStatement {
    /// Creates an else branch.
    #[must_use]
    pub fn new(head: impl Into<String>, body: IfBody) -> Self {
        Self {
            head: head.into(),
            body,
        }
    }

    /// Returns the body.
    #[must_use]
    pub const fn body(&self) -> &IfBody {
        &self.body
    }
}

/// `@if(..) .. @elseif(..) .. @else .. @endif`.
///
/// Branches are not exclusive: every branch whose condition holds is built,
/// in order. The else branch is built only when no condition held.
#[derive(Debug, Clone)]
pub struct IfClause {
    branches: Vec<IfStatement>,
    else_branch: Option<ElseStatement>,
    end: String,
}

impl IfClause {
    /// Creates an `@if` clause. `end` is the closing `@endif` as written.
    #[must_use]
    pub fn new(
        branches: Vec<IfStatement>,
        else_branch: Option<ElseStatement>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            branches,
            else_branch,
            end: end.into(),
        }
    }

    /// Returns the conditional branches.
    #[must_use]
    pub fn branches(&self) -> &[IfStatement] {
        &self.branches
    }

    /// Returns the else branch.
    #[must_use]
    pub const fn else_branch(&self) -> Option<&ElseStatement> {
        self.else_branch.as_ref()
    }

    pub(crate) fn render_template(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for branch in &self.branches {
            out.write_str(&branch.head)?;
            branch.body.render_template(out)?;
        }
        if let Some(branch) = &self.else_branch {
            out.write_str(&branch.head)?;
            branch.body.render_template(out)?;
        }
        out.write_str(&self.end)
    }

    /// Builds every branch whose condition holds, or the else branch.
    ///
    /// # Errors
    ///
    /// Returns an error if a condition or a child fails.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        let mut matched = false;
        for branch in &self.branches {
            if branch.condition.test(builder, params)? {
                matched = true;
                build_statement(&branch.body.nodes, builder, params)?;
            }
        }
        if !matched {
            if let Some(branch) = &self.else_branch {
                build_statement(&branch.body.nodes, builder, params)?;
            }
        }
        Ok(())
    }
}

/// `@name{content}`: SQL generated by a registered tag processor.
#[derive(Clone)]
pub struct Tag {
    name: String,
    content: String,
    braced: bool,
    processor: OnceLock<Arc<dyn TagProcessor>>,
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("name", &self.name)
            .field("content", &self.content)
            .field("prepared", &self.processor.get().is_some())
            .finish_non_exhaustive()
    }
}

impl Tag {
    /// Creates a tag. `braced` selects the `{..}` form over `(..)`.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>, braced: bool) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            braced,
            processor: OnceLock::new(),
        }
    }

    /// Returns the tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn render_template(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        if self.braced {
            write!(out, "@{}{{{}}}", self.name, self.content)
        } else {
            write!(out, "@{}({})", self.name, self.content)
        }
    }

    /// Looks the processor up and lets it validate the content.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ClauseConfig`] when no processor is registered
    /// under the tag's name, or the processor's own error.
    pub fn prepare(&self, ctx: &SqlContext) -> Result<()> {
        if self.processor.get().is_some() {
            return Ok(());
        }
        let processor = ctx.tags().get(&self.name).ok_or_else(|| {
            SqlError::clause_config(format!("No tag processor registered for '@{}'", self.name))
        })?;
        processor.prepare_tag(ctx, &self.name, &self.content)?;
        let _ = self.processor.set(Arc::clone(processor));
        Ok(())
    }

    /// Runs the processor.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ClauseConfig`] if the tag was never prepared, or
    /// the processor's own error.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        let processor = self.processor.get().ok_or_else(|| {
            SqlError::clause_config(format!("Tag '@{}' has not been prepared", self.name))
        })?;
        processor.process_tag(builder, params, &self.content)
    }
}

/// `@include(key)`: a registered fragment spliced in at build time.
#[derive(Debug, Clone)]
pub struct IncludeClause {
    key: String,
    head: String,
}

impl IncludeClause {
    /// Creates an include. `head` is the directive as written.
    #[must_use]
    pub fn new(key: impl Into<String>, head: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            head: head.into(),
        }
    }

    /// Returns the fragment key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the directive as written.
    #[must_use]
    pub fn head(&self) -> &str {
        &self.head
    }

    /// Builds the fragment registered under the key.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::FragmentNotFound`] for an unknown key,
    /// [`SqlError::ClauseConfig`] for includes nested too deeply, or the
    /// first error raised by the fragment.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        let fragment = builder
            .context()
            .fragments()
            .get(&self.key)
            .ok_or_else(|| SqlError::FragmentNotFound(self.key.clone()))?;
        builder.enter_include(&self.key)?;
        let result = build_statement(fragment.sql().nodes(), builder, params);
        builder.leave_include();
        result
    }

    /// Prepares the fragment registered under the key for batches.
    ///
    /// # Errors
    ///
    /// Same as [`build_statement`](Self::build_statement).
    pub fn prepare_batch_statement(
        &self,
        builder: &mut PreparedBatchStatementBuilder<'_>,
    ) -> Result<()> {
        let fragment = builder
            .context()
            .fragments()
            .get(&self.key)
            .ok_or_else(|| SqlError::FragmentNotFound(self.key.clone()))?;
        builder.enter_include(&self.key)?;
        let result = prepare_batch_statement(fragment.sql().nodes(), builder);
        builder.leave_include();
        result
    }
}
