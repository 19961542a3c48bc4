//! # oxide-dynsql
//!
//! Dynamic SQL templates: SQL text with bind parameters, optional clauses,
//! conditional branches, tags and reusable fragments, built into plain SQL
//! with `?` placeholders and bound values.
//!
//! This crate provides:
//! - A lossless template lexer and a recursive descent template parser
//! - An AST with one exhaustive dispatch per operation
//! - Statement builders for single executions and prepared batches
//! - Name resolution against entity mappings, with dialect quoting
//!
//! ## Optional clauses
//!
//! A `{? .. }` clause is dropped when a parameter it reads is missing:
//!
//! ```rust
//! use std::sync::Arc;
//! use oxide_dynsql::{DynamicSqlClause, MapParams, SqlContext, SqlValue};
//!
//! let clause = DynamicSqlClause::parse(
//!     Arc::new(SqlContext::default()),
//!     "SELECT * FROM users WHERE 1 = 1 {? AND name = :name } {? AND id IN :ids }",
//! )
//! .unwrap();
//!
//! let params = MapParams::new().with("ids", vec![1_i64, 2]);
//! let statement = clause.create_query_statement(&params).unwrap();
//! assert_eq!(statement.sql(), "SELECT * FROM users WHERE 1 = 1  AND id IN (?,?) ");
//! assert_eq!(statement.args(), &[SqlValue::Int(1), SqlValue::Int(2)]);
//! ```
//!
//! ## Replacement parameters
//!
//! `$name$` and `${expr}` write values into the SQL text instead of binding
//! them. Only single quotes inside string literals are escaped, so they must
//! never carry untrusted input.

pub mod ast;
pub mod builder;
pub mod clause;
pub mod context;
pub mod dialect;
pub mod el;
pub mod error;
pub mod fragment;
pub mod lexer;
pub mod mapping;
pub mod params;
pub mod parser;
pub mod resolver;
pub mod sql;
pub mod tag;
pub mod value;

pub use builder::{BatchSqlStatement, PreparedBatchStatement, SqlStatement, SqlStatementBuilder};
pub use clause::DynamicSqlClause;
pub use context::SqlContext;
pub use error::{Result, SqlError};
pub use mapping::{DynamicTableName, EntityMapping, FieldMapping, OrmMetadata};
pub use params::{ArrayParams, EmptyParams, MapParams, Params};
pub use parser::{ParseError, ParseLevel, Parser};
pub use sql::{Sql, SqlType};
pub use tag::TagProcessor;
pub use value::{SqlValue, ToSqlValue};
