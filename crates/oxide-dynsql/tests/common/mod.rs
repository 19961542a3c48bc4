//! Common test utilities for template building tests.

#![allow(dead_code)]

use std::sync::Arc;

use oxide_dynsql::dialect::Dialect;
use oxide_dynsql::el::{DefaultExpressionLanguage, Expression, ExpressionLanguage};
use oxide_dynsql::{
    DynamicSqlClause, EntityMapping, FieldMapping, OrmMetadata, Params, SqlContext, SqlError,
    SqlStatement, SqlValue,
};

/// A context with the generic dialect and no metadata.
pub fn context() -> Arc<SqlContext> {
    Arc::new(SqlContext::default())
}

/// Compiles an expression with the default expression language.
pub fn expr(text: &str) -> Arc<dyn Expression> {
    DefaultExpressionLanguage::new()
        .compile(text)
        .unwrap_or_else(|e| panic!("Failed to compile: {text}\nError: {e:?}"))
}

/// Metadata for an `Account` entity mapped to `accounts`.
pub fn metadata() -> OrmMetadata {
    OrmMetadata::new().with_entity(
        EntityMapping::new("Account", "accounts")
            .with_field(FieldMapping::new("id", "account_id").primary_key())
            .with_field(FieldMapping::new("name", "account_name"))
            .with_field(FieldMapping::new("order", "order"))
            .with_field(
                FieldMapping::new("createdBy", "created_by").with_insert_value(expr("'system'")),
            )
            .with_field(
                FieldMapping::new("updatedBy", "updated_by")
                    .with_update_value(expr("'updater'")),
            ),
    )
}

/// A context carrying [`metadata`] and the given dialect.
pub fn mapped_context(dialect: Arc<dyn Dialect>) -> Arc<SqlContext> {
    Arc::new(SqlContext::new(dialect).with_metadata(Arc::new(metadata())))
}

/// Parses and prepares a template, panicking on failure.
pub fn clause_in(ctx: &Arc<SqlContext>, text: &str) -> DynamicSqlClause {
    DynamicSqlClause::parse(Arc::clone(ctx), text)
        .unwrap_or_else(|e| panic!("Failed to parse: {text}\nError: {e:?}"))
}

/// Parses and prepares a template in a fresh default context.
pub fn clause(text: &str) -> DynamicSqlClause {
    clause_in(&context(), text)
}

/// Parses a template expecting an error.
pub fn clause_err(text: &str) -> SqlError {
    match DynamicSqlClause::parse(context(), text) {
        Ok(_) => panic!("Expected error for: {text}"),
        Err(e) => e,
    }
}

/// Builds a query statement.
pub fn query(text: &str, params: &dyn Params) -> SqlStatement {
    clause(text)
        .create_query_statement(params)
        .unwrap_or_else(|e| panic!("Failed to build: {text}\nError: {e:?}"))
}

/// Builds an update statement.
pub fn update(text: &str, params: &dyn Params) -> SqlStatement {
    clause(text)
        .create_update_statement(params)
        .unwrap_or_else(|e| panic!("Failed to build: {text}\nError: {e:?}"))
}

/// Shorthand for a text value.
pub fn text(value: &str) -> SqlValue {
    SqlValue::Text(String::from(value))
}
