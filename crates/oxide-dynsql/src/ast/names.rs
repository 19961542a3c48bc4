//! Object and table names.

use std::sync::{Arc, OnceLock};

use super::Scope;
use crate::builder::{PreparedBatchStatementBuilder, SqlStatementBuilder};
use crate::dialect::Dialect;
use crate::error::{Result, SqlError};
use crate::mapping::{EntityMapping, FieldMapping};
use crate::params::Params;

/// Returns the raw text before the last part, `a.b.` for `a.b.c`.
fn raw_prefix(raw: &str, parts: &[String], quoted: bool) -> String {
    let last = parts.last().map_or(0, String::len);
    // quotes around the last part
    let last = if quoted { last + 2 } else { last };
    raw.get(..raw.len().saturating_sub(last))
        .unwrap_or_default()
        .to_string()
}

/// A possibly qualified column or object name (`first.secondary.last`).
#[derive(Debug, Clone)]
pub struct SqlObjectName {
    raw: String,
    raw_prefix: String,
    parts: Vec<String>,
    quoted: bool,
    scope: Scope,
    field: OnceLock<Arc<FieldMapping>>,
    reference: OnceLock<Box<SqlObjectName>>,
}

impl SqlObjectName {
    /// Creates a name from its raw text and unquoted parts.
    ///
    /// `quoted` tells whether the last part was written quoted.
    #[must_use]
    pub fn new(raw: impl Into<String>, parts: Vec<String>, quoted: bool, scope: Scope) -> Self {
        let raw = raw.into();
        let raw_prefix = raw_prefix(&raw, &parts, quoted);
        Self {
            raw,
            raw_prefix,
            parts,
            quoted,
            scope,
            field: OnceLock::new(),
            reference: OnceLock::new(),
        }
    }

    /// Returns the name as written.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the unquoted parts.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Returns the last part.
    #[must_use]
    pub fn last_name(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    /// Returns the part before the last one, the table or alias qualifier.
    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.parts
            .len()
            .checked_sub(2)
            .and_then(|i| self.parts.get(i))
            .map(String::as_str)
    }

    /// Returns true if the last part was quoted.
    #[must_use]
    pub const fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Returns the scope the name appeared in.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the field this name resolved to, following references.
    #[must_use]
    pub fn resolved_field(&self) -> Option<&Arc<FieldMapping>> {
        self.reference
            .get()
            .map_or_else(|| self.field.get(), |target| target.resolved_field())
    }

    /// Returns the name this one refers to.
    #[must_use]
    pub fn reference(&self) -> Option<&Self> {
        self.reference.get().map(AsRef::as_ref)
    }

    /// Attaches a field mapping. Only the first call has an effect.
    pub fn set_field(&self, field: Arc<FieldMapping>) {
        let _ = self.field.set(field);
    }

    /// Makes this name an alias of another one. Only the first call has an
    /// effect.
    pub fn set_reference(&self, target: Self) {
        let _ = self.reference.set(Box::new(target));
    }

    fn write(&self, out: &mut String, dialect: &dyn Dialect) {
        if let Some(target) = self.reference.get() {
            target.write(out, dialect);
            return;
        }
        if let Some(field) = self.field.get() {
            out.push_str(&self.raw_prefix);
            if self.quoted {
                out.push_str(&dialect.quote_identifier_always(field.column_name()));
            } else {
                out.push_str(&dialect.quote_identifier(field.column_name()));
            }
        } else if self.quoted {
            out.push_str(&self.raw_prefix);
            out.push_str(&dialect.quote_identifier_always(self.last_name()));
        } else {
            out.push_str(&self.raw);
        }
    }

    /// Appends the name, mapped to its column when resolved.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` to match the other nodes.
    pub fn build_statement(&self, builder: &mut SqlStatementBuilder<'_>) -> Result<()> {
        let dialect = builder.context().dialect();
        let mut out = String::new();
        self.write(&mut out, dialect);
        builder.append(&out);
        Ok(())
    }

    /// Appends the name to a batch statement.
    ///
    /// # Errors
    ///
    /// Never fails; returns `Result` to match the other nodes.
    pub fn prepare_batch_statement(
        &self,
        builder: &mut PreparedBatchStatementBuilder<'_>,
    ) -> Result<()> {
        let dialect = builder.context().dialect();
        let mut out = String::new();
        self.write(&mut out, dialect);
        builder.append(&out);
        Ok(())
    }
}

/// A table name, with an optional alias.
#[derive(Debug, Clone)]
pub struct SqlTableName {
    raw: String,
    raw_prefix: String,
    parts: Vec<String>,
    quoted: bool,
    alias: Option<String>,
    entity: OnceLock<Arc<EntityMapping>>,
}

impl SqlTableName {
    /// Creates a table name from its raw text and unquoted parts.
    #[must_use]
    pub fn new(raw: impl Into<String>, parts: Vec<String>, quoted: bool) -> Self {
        let raw = raw.into();
        let raw_prefix = raw_prefix(&raw, &parts, quoted);
        Self {
            raw,
            raw_prefix,
            parts,
            quoted,
            alias: None,
            entity: OnceLock::new(),
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Returns the name as written.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the last part, the table itself.
    #[must_use]
    pub fn last_name(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    /// Returns the alias.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Returns the entity this table resolved to.
    #[must_use]
    pub fn entity(&self) -> Option<&Arc<EntityMapping>> {
        self.entity.get()
    }

    /// Attaches an entity mapping. Only the first call has an effect.
    pub fn set_entity(&self, entity: Arc<EntityMapping>) {
        let _ = self.entity.set(entity);
    }

    /// Returns true if `name` is this table's alias or name.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.alias
            .as_deref()
            .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
            || self.last_name().eq_ignore_ascii_case(name)
            || self
                .entity
                .get()
                .is_some_and(|e| e.entity_name().eq_ignore_ascii_case(name))
    }

    fn write_mapped(
        &self,
        out: &mut String,
        table: &str,
        entity: &EntityMapping,
        dialect: &dyn Dialect,
    ) {
        if !self.raw_prefix.is_empty() {
            out.push_str(&self.raw_prefix);
        } else if let Some(schema) = entity.schema() {
            out.push_str(&dialect.quote_identifier(schema));
            out.push('.');
        }
        if self.quoted {
            out.push_str(&dialect.quote_identifier_always(table));
        } else {
            out.push_str(&dialect.quote_identifier(table));
        }
    }

    fn write_unmapped(&self, out: &mut String, dialect: &dyn Dialect) {
        if self.quoted {
            out.push_str(&self.raw_prefix);
            out.push_str(&dialect.quote_identifier_always(self.last_name()));
        } else {
            out.push_str(&self.raw);
        }
    }

    /// Appends the table name, computing a dynamic name once per build.
    ///
    /// # Errors
    ///
    /// Returns the error of a failing dynamic table-name resolver.
    pub fn build_statement(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
    ) -> Result<()> {
        let dialect = builder.context().dialect();
        let mut out = String::new();
        match self.entity.get() {
            Some(entity) if entity.dynamic_table_name().is_some() => {
                let table = builder.dynamic_table_name(entity, params)?;
                self.write_mapped(&mut out, &table, entity, dialect);
            }
            Some(entity) => self.write_mapped(&mut out, entity.table_name(), entity, dialect),
            None => self.write_unmapped(&mut out, dialect),
        }
        builder.append(&out);
        Ok(())
    }

    /// Appends the table name to a batch statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqlError::ClauseConfig`] for entities with a dynamic table
    /// name, which needs a concrete parameter set.
    pub fn prepare_batch_statement(
        &self,
        builder: &mut PreparedBatchStatementBuilder<'_>,
    ) -> Result<()> {
        let dialect = builder.context().dialect();
        let mut out = String::new();
        match self.entity.get() {
            Some(entity) if entity.dynamic_table_name().is_some() => {
                return Err(SqlError::clause_config(format!(
                    "Dynamic table name of entity '{}' is not allowed in batch statements",
                    entity.entity_name()
                )));
            }
            Some(entity) => self.write_mapped(&mut out, entity.table_name(), entity, dialect),
            None => self.write_unmapped(&mut out, dialect),
        }
        builder.append(&out);
        Ok(())
    }
}
