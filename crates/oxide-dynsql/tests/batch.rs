//! Tests for prepared batch statements.

mod common;
use common::*;

use std::sync::Arc;

use oxide_dynsql::dialect::GenericDialect;
use oxide_dynsql::{ArrayParams, MapParams, SqlError, SqlValue};

#[test]
fn insert_batch_uses_insert_values() {
    let ctx = mapped_context(Arc::new(GenericDialect::new()));
    let dynamic = clause_in(
        &ctx,
        "insert into Account (id, name, createdBy) values (:id, :name, :createdBy)",
    );
    let rows = vec![
        MapParams::new().with("id", 1_i64).with("name", "a"),
        MapParams::new()
            .with("id", 2_i64)
            .with("name", "b")
            .with("createdBy", "x"),
    ];
    let batch = dynamic.create_batch_statement(&rows).unwrap();
    assert_eq!(
        batch.sql(),
        "insert into accounts (account_id, account_name, created_by) values (?, ?, ?)"
    );
    assert_eq!(
        batch.args(),
        &[
            vec![SqlValue::Int(1), text("a"), text("system")],
            vec![SqlValue::Int(2), text("b"), text("system")],
        ]
    );
}

#[test]
fn update_batch_uses_update_values() {
    let ctx = mapped_context(Arc::new(GenericDialect::new()));
    let dynamic = clause_in(
        &ctx,
        "update Account set name = :name, updatedBy = :updatedBy where id = :id",
    );
    let rows = vec![MapParams::new().with("name", "n").with("id", 1_i64)];
    let batch = dynamic.create_batch_statement(&rows).unwrap();
    assert_eq!(
        batch.sql(),
        "update accounts set account_name = ?, updated_by = ? where account_id = ?"
    );
    assert_eq!(
        batch.args(),
        &[vec![text("n"), text("updater"), SqlValue::Int(1)]]
    );
}

#[test]
fn positional_rows() {
    let dynamic = clause("insert into t (a, b) values (?, ?)");
    let rows = vec![
        ArrayParams::new(vec![SqlValue::Int(1), SqlValue::Int(2)]),
        ArrayParams::new(vec![SqlValue::Int(3)]),
    ];
    let batch = dynamic.create_batch_statement(&rows).unwrap();
    assert_eq!(batch.sql(), "insert into t (a, b) values (?, ?)");
    assert_eq!(
        batch.args(),
        &[
            vec![SqlValue::Int(1), SqlValue::Int(2)],
            vec![SqlValue::Int(3), SqlValue::Null],
        ]
    );
}

#[test]
fn expression_parameters_evaluate_per_row() {
    let dynamic = clause("insert into t (a, b) values (:a, #{a * 2})");
    let rows = vec![
        MapParams::new().with("a", 2_i64),
        MapParams::new().with("a", 5_i64),
    ];
    let batch = dynamic.create_batch_statement(&rows).unwrap();
    assert_eq!(batch.sql(), "insert into t (a, b) values (?, ?)");
    assert_eq!(
        batch.args(),
        &[
            vec![SqlValue::Int(2), SqlValue::Int(4)],
            vec![SqlValue::Int(5), SqlValue::Int(10)],
        ]
    );
}

#[test]
fn dynamic_clauses_are_always_kept() {
    let dynamic = clause("update t set a = :a{?, b = :b} where id = :id");
    let prepared = dynamic.prepared_batch_statement().unwrap();
    assert_eq!(prepared.sql(), "update t set a = ?, b = ? where id = ?");
    assert_eq!(prepared.parameters().len(), 3);
}

#[test]
fn prepared_once() {
    let dynamic = clause("delete from t where id = :id");
    let first = dynamic.prepared_batch_statement().unwrap();
    let second = dynamic.prepared_batch_statement().unwrap();
    assert!(std::ptr::eq(first, second));
}

#[test]
fn select_is_not_a_batch() {
    let dynamic = clause("select * from t");
    let result = dynamic.prepared_batch_statement();
    assert!(matches!(result, Err(SqlError::ClauseConfig(_))));
}

#[test]
fn replacement_is_not_allowed() {
    let dynamic = clause("insert into t (a) values ($a$)");
    let result = dynamic.prepared_batch_statement();
    assert!(matches!(result, Err(SqlError::ClauseConfig(_))));
}

#[test]
fn expression_replacement_is_not_allowed() {
    let dynamic = clause("update t set a = ${x} where id = :id");
    let result = dynamic.prepared_batch_statement();
    match result {
        Err(SqlError::ClauseConfig(message)) => assert!(message.contains("${x}"), "{message}"),
        other => panic!("Expected a clause error, got {other:?}"),
    }
}

#[test]
fn if_clause_is_not_allowed() {
    let dynamic = clause("update t set a = 1 @if(x) where id = :id @endif");
    let result = dynamic.prepared_batch_statement();
    assert!(matches!(result, Err(SqlError::ClauseConfig(_))));
}
