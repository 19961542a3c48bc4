//! Parameter nodes and `@if` conditions.

use std::fmt;
use std::sync::{Arc, OnceLock};

use super::Scope;
use crate::builder::{BatchParameter, PreparedBatchStatementBuilder, SqlStatementBuilder};
use crate::el::Expression;
use crate::error::Result;
use crate::mapping::FieldMapping;
use crate::params::{resolve_named, ParamScope, Params};

/// How a named placeholder was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSyntax {
    /// `:name`
    Colon,
    /// `#name#`
    Sharp,
}

/// Which statement a column value is written by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnUsage {
    /// `INSERT .. VALUES`
    Insert,
    /// `UPDATE .. SET`
    Update,
}

/// The column a placeholder writes to.
#[derive(Debug, Clone)]
pub struct ParamTarget {
    field: Arc<FieldMapping>,
    usage: ColumnUsage,
}

impl ParamTarget {
    /// Creates a target.
    #[must_use]
    pub const fn new(field: Arc<FieldMapping>, usage: ColumnUsage) -> Self {
        Self { field, usage }
    }

    /// Returns the field.
    #[must_use]
    pub const fn field(&self) -> &Arc<FieldMapping> {
        &self.field
    }

    /// Returns the statement kind.
    #[must_use]
    pub const fn usage(&self) -> ColumnUsage {
        self.usage
    }

    /// Returns the expression that supplies the column value in batches.
    ///
    /// Inserts prefer the insert value, then the update value, then the
    /// default value. Updates prefer the update value, then the default.
    #[must_use]
    pub fn value_expression(&self) -> Option<Arc<dyn Expression>> {
        let field = &self.field;
        let value = match self.usage {
            ColumnUsage::Insert => field
                .insert_value()
                .or_else(|| field.update_value())
                .or_else(|| field.default_value()),
            ColumnUsage::Update => field.update_value().or_else(|| field.default_value()),
        };
        value.cloned()
    }
}

/// `:name` or `#name#`: a bind parameter read by name.
#[derive(Debug, Clone)]
pub struct ParamPlaceholder {
    name: String,
    syntax: ParamSyntax,
    scope: Scope,
    target: OnceLock<ParamTarget>,
}

impl ParamPlaceholder {
    /// Creates a placeholder.
    #[must_use]
    pub fn new(name: impl Into<String>, syntax: ParamSyntax, scope: Scope) -> Self {
        Self {
            name: name.into(),
            syntax,
            scope,
            target: OnceLock::new(),
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scope the placeholder appeared in.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the column this placeholder writes, once resolved.
    #[must_use]
    pub fn target(&self) -> Option<&ParamTarget> {
        self.target.get()
    }

    /// Attaches the column written by this placeholder. Only the first call
    /// has an effect.
    pub fn set_target(&self, target: ParamTarget) {
        let _ = self.target.set(target);
    }

    pub(crate) fn render_template(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self.syntax {
            ParamSyntax::Colon => write!(out, ":{}", self.name),
            ParamSyntax::Sharp => write!(out, "#{}#", self.name),
        }
    }

    /// Binds the parameter's value.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` to match the other nodes.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        let index = builder.next_parameter_index();
        let value = resolve_named(params, &self.name, index);
        builder.append_placeholder(value, self.scope);
        Ok(())
    }

    /// Emits `?` and a descriptor resolved against every batch row.
    pub fn prepare_batch_statement(&self, builder: &mut PreparedBatchStatementBuilder<'_>) {
        let index = builder.next_parameter_index();
        builder.append_char('?');
        let target = self.target.get();
        builder.add_batch_parameter(BatchParameter::new(
            index,
            Some(self.name.clone()),
            target.map(|t| Arc::clone(t.field())),
            target.and_then(ParamTarget::value_expression),
        ));
    }
}

fn escape(text: String, scope: Scope) -> String {
    if scope == Scope::String {
        text.replace('\'', "''")
    } else {
        text
    }
}

/// `$name$`: a parameter value written into the SQL text.
#[derive(Debug, Clone)]
pub struct ParamReplacement {
    name: String,
    scope: Scope,
}

impl ParamReplacement {
    /// Creates a replacement.
    #[must_use]
    pub fn new(name: impl Into<String>, scope: Scope) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scope the replacement appeared in.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Appends the parameter's text. Single quotes are doubled inside string
    /// literals.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` to match the other nodes.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        let index = builder.next_parameter_index();
        let value = resolve_named(params, &self.name, index);
        builder.append(&escape(value.to_replacement_text(), self.scope));
        Ok(())
    }
}

/// `#{expr}`: an expression value bound as a parameter.
#[derive(Debug, Clone)]
pub struct ExprParamPlaceholder {
    expr: Arc<dyn Expression>,
    scope: Scope,
}

impl ExprParamPlaceholder {
    /// Creates an expression placeholder.
    #[must_use]
    pub fn new(expr: Arc<dyn Expression>, scope: Scope) -> Self {
        Self { expr, scope }
    }

    /// Returns the expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        self.expr.source()
    }

    /// Returns the compiled expression.
    #[must_use]
    pub const fn expression(&self) -> &Arc<dyn Expression> {
        &self.expr
    }

    /// Evaluates the expression and binds the result.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::Expression`](crate::SqlError::Expression) if the
    /// evaluation fails.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        builder.next_parameter_index();
        let value = {
            let scope = ParamScope::with_vars(params, builder.vars());
            self.expr.value(&scope)?
        };
        builder.append_placeholder(value, self.scope);
        Ok(())
    }

    /// Emits `?` and a descriptor that evaluates the expression per row.
    pub fn prepare_batch_statement(&self, builder: &mut PreparedBatchStatementBuilder<'_>) {
        let index = builder.next_parameter_index();
        builder.append_char('?');
        builder.add_batch_parameter(BatchParameter::new(
            index,
            None,
            None,
            Some(Arc::clone(&self.expr)),
        ));
    }
}

/// `${expr}`: an expression value written into the SQL text.
#[derive(Debug, Clone)]
pub struct ExprParamReplacement {
    expr: Arc<dyn Expression>,
    scope: Scope,
}

impl ExprParamReplacement {
    /// Creates an expression replacement.
    #[must_use]
    pub fn new(expr: Arc<dyn Expression>, scope: Scope) -> Self {
        Self { expr, scope }
    }

    /// Returns the expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        self.expr.source()
    }

    /// Evaluates the expression and appends its text.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::Expression`](crate::SqlError::Expression) if the
    /// evaluation fails.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        builder.next_parameter_index();
        let text = {
            let scope = ParamScope::with_vars(params, builder.vars());
            self.expr.value(&scope)?.to_replacement_text()
        };
        builder.append(&escape(text, self.scope));
        Ok(())
    }
}

/// The condition of an `@if` or `@elseif` branch.
#[derive(Debug, Clone)]
pub struct IfCondition {
    expr: Arc<dyn Expression>,
}

impl IfCondition {
    /// Creates a condition.
    #[must_use]
    pub fn new(expr: Arc<dyn Expression>) -> Self {
        Self { expr }
    }

    /// Returns the expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        self.expr.source()
    }

    /// Evaluates the condition against the parameters and builder variables.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::Expression`](crate::SqlError::Expression) if the
    /// evaluation fails.
    pub fn test(&self, builder: &SqlStatementBuilder<'_>, params: &dyn Params) -> Result<bool> {
        let scope = ParamScope::with_vars(params, builder.vars());
        Ok(self.expr.test(&scope)?)
    }
}
