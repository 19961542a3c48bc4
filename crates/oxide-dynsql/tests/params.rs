//! Tests for bind parameters, replacements and expression parameters.

mod common;
use common::*;

use oxide_dynsql::{ArrayParams, EmptyParams, MapParams, SqlError, SqlValue};

#[test]
fn named_placeholders_bind_in_order() {
    let params = MapParams::new().with("id", 1_i64).with("name", "a");
    let stmt = query(
        "select * from t where id = :id and name = #name#",
        &params,
    );
    assert_eq!(stmt.sql(), "select * from t where id = ? and name = ?");
    assert_eq!(stmt.args(), &[SqlValue::Int(1), text("a")]);
}

#[test]
fn null_equals_becomes_is_null_in_queries() {
    let stmt = query("select * from t where a = :a", &EmptyParams);
    assert_eq!(stmt.sql(), "select * from t where a is null");
    assert!(stmt.args().is_empty());
}

#[test]
fn null_equals_is_kept_in_updates() {
    let params = MapParams::new()
        .with("a", SqlValue::Null)
        .with("b", SqlValue::Null);
    let stmt = update("update t set a = :a where b = :b", &params);
    assert_eq!(stmt.sql(), "update t set a = ? where b = ?");
    assert_eq!(stmt.args(), &[SqlValue::Null, SqlValue::Null]);
}

#[test]
fn in_list_expands_each_item() {
    let params = MapParams::new().with("ids", vec![1_i64, 2, 3]);
    let stmt = query("select * from t where x in (:ids)", &params);
    assert_eq!(stmt.sql(), "select * from t where x in (?,?,?)");
    assert_eq!(
        stmt.args(),
        &[SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
    );
}

#[test]
fn in_list_without_parens_gets_them() {
    let params = MapParams::new().with("ids", vec!["a"]);
    let stmt = query("select * from t where x in :ids", &params);
    assert_eq!(stmt.sql(), "select * from t where x in (?)");
    assert_eq!(stmt.args(), &[text("a")]);
}

#[test]
fn empty_in_list_binds_one_null() {
    let params = MapParams::new().with("ids", Vec::<i64>::new());
    let stmt = query("select * from t where x in (:ids)", &params);
    assert_eq!(stmt.sql(), "select * from t where x in (?)");
    assert_eq!(stmt.args(), &[SqlValue::Null]);
}

#[test]
fn null_and_scalar_in_list() {
    let stmt = query("select * from t where x in :ids", &EmptyParams);
    assert_eq!(stmt.sql(), "select * from t where x in (?)");
    assert_eq!(stmt.args(), &[SqlValue::Null]);

    let params = MapParams::new().with("ids", 5_i64);
    let stmt = query("select * from t where x in (:ids)", &params);
    assert_eq!(stmt.sql(), "select * from t where x in (?)");
    assert_eq!(stmt.args(), &[SqlValue::Int(5)]);
}

#[test]
fn jdbc_placeholders_read_positions() {
    let params = ArrayParams::new(vec![SqlValue::Int(1), text("x")]);
    let stmt = query("select * from t where a = ? and b = ?", &params);
    assert_eq!(stmt.sql(), "select * from t where a = ? and b = ?");
    assert_eq!(stmt.args(), &[SqlValue::Int(1), text("x")]);
}

#[test]
fn jdbc_placeholders_reject_named_sources() {
    let params = MapParams::new().with("a", 1_i64);
    let result = clause("select * from t where a = ?").create_query_statement(&params);
    assert!(matches!(result, Err(SqlError::IllegalArgument(_))));
}

#[test]
fn named_and_positional_share_the_index() {
    let params = ArrayParams::new(vec![SqlValue::Int(1), SqlValue::Int(2)]);
    let stmt = query("select * from t where a = :a and b = ?", &params);
    assert_eq!(stmt.args(), &[SqlValue::Int(1), SqlValue::Int(2)]);
}

#[test]
fn replacements_substitute_text() {
    let params = MapParams::new().with("table", "users").with("name", "O'Brien");
    let stmt = query(
        "select * from $table$ where name like '%$name$%'",
        &params,
    );
    assert_eq!(
        stmt.sql(),
        "select * from users where name like '%O''Brien%'"
    );
    assert!(stmt.args().is_empty());
}

#[test]
fn replacements_advance_the_index() {
    let params = ArrayParams::new(vec![text("users"), SqlValue::Int(5)]);
    let stmt = query("select * from $t$ where id = :id", &params);
    assert_eq!(stmt.sql(), "select * from users where id = ?");
    assert_eq!(stmt.args(), &[SqlValue::Int(5)]);
}

#[test]
fn expression_parameters() {
    let params = MapParams::new().with("x", 1_i64).with("name", "ab");
    let stmt = query(
        "select * from t where a = #{x + 1} and b = '${upper(name)}'",
        &params,
    );
    assert_eq!(stmt.sql(), "select * from t where a = ? and b = 'AB'");
    assert_eq!(stmt.args(), &[SqlValue::Int(2)]);
}

#[test]
fn expression_errors_surface() {
    let params = MapParams::new().with("x", 1_i64);
    let result = clause("select * from t where a = #{x / 0}").create_query_statement(&params);
    assert!(matches!(result, Err(SqlError::Expression(_))));
}
