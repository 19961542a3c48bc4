//! Tests for `@include` fragments.

mod common;
use common::*;

use oxide_dynsql::{EmptyParams, MapParams, SqlError, SqlValue};

#[test]
fn include_splices_fragment() {
    let ctx = context();
    ctx.register_fragment("active", "status = :status").unwrap();
    let dynamic = clause_in(&ctx, "select * from t where @include(active)");
    let stmt = dynamic
        .create_query_statement(&MapParams::new().with("status", 1_i64))
        .unwrap();
    assert_eq!(stmt.sql(), "select * from t where status = ?");
    assert_eq!(stmt.args(), &[SqlValue::Int(1)]);
}

#[test]
fn include_sees_replaced_fragment() {
    let ctx = context();
    ctx.register_fragment("cols", "a").unwrap();
    let dynamic = clause_in(&ctx, "select @include(cols) from t");
    assert_eq!(
        dynamic.create_query_statement(&EmptyParams).unwrap().sql(),
        "select a from t"
    );

    ctx.register_fragment("cols", "a, b").unwrap();
    assert_eq!(
        dynamic.create_query_statement(&EmptyParams).unwrap().sql(),
        "select a, b from t"
    );
}

#[test]
fn include_inside_dynamic_clause() {
    let ctx = context();
    ctx.register_fragment("by_name", "name = :name").unwrap();
    let dynamic = clause_in(&ctx, "select * from t where 1=1 {? and @include(by_name) }");

    let stmt = dynamic.create_query_statement(&EmptyParams).unwrap();
    assert_eq!(stmt.sql(), "select * from t where 1=1  and name is null ");
}

#[test]
fn missing_fragment() {
    let dynamic = clause("select * from t where @include(nowhere)");
    let result = dynamic.create_query_statement(&EmptyParams);
    assert!(matches!(result, Err(SqlError::FragmentNotFound(key)) if key == "nowhere"));
}

#[test]
fn recursive_include_is_rejected() {
    let ctx = context();
    ctx.register_fragment("loop", "x = 1 and @include(loop)").unwrap();
    let dynamic = clause_in(&ctx, "select * from t where @include(loop)");
    let result = dynamic.create_query_statement(&EmptyParams);
    assert!(matches!(result, Err(SqlError::ClauseConfig(_))));
}

#[test]
fn include_in_batch() {
    let ctx = context();
    ctx.register_fragment("key", "id = :id").unwrap();
    let dynamic = clause_in(&ctx, "delete from t where @include(key)");
    let rows = vec![MapParams::new().with("id", 4_i64)];
    let batch = dynamic.create_batch_statement(&rows).unwrap();
    assert_eq!(batch.sql(), "delete from t where id = ?");
    assert_eq!(batch.args(), &[vec![SqlValue::Int(4)]]);
}
