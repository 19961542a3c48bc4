//! Tests for dynamic clauses (`{? ... }`) and tags.

mod common;
use common::*;

use std::sync::Arc;

use oxide_dynsql::{
    ArrayParams, EmptyParams, MapParams, Params, SqlContext, SqlError, SqlStatementBuilder,
    SqlValue, TagProcessor,
};

const TEMPLATE: &str = "SELECT * FROM t WHERE {? id = :id } {? and name = :name }";

#[test]
fn missing_parameter_drops_clause() {
    let params = MapParams::new().with("id", 5_i64);
    let stmt = query(TEMPLATE, &params);
    assert_eq!(stmt.sql(), "SELECT * FROM t WHERE  id = ? ");
    assert_eq!(stmt.args(), &[SqlValue::Int(5)]);
}

#[test]
fn all_parameters_keep_every_clause() {
    let params = MapParams::new().with("id", 5_i64).with("name", "x");
    let stmt = query(TEMPLATE, &params);
    assert_eq!(stmt.sql(), "SELECT * FROM t WHERE  id = ?  and name = ? ");
    assert_eq!(stmt.args(), &[SqlValue::Int(5), text("x")]);
}

#[test]
fn null_parameter_drops_clause() {
    let params = MapParams::new().with("id", SqlValue::Null);
    let stmt = query(TEMPLATE, &params);
    assert_eq!(stmt.sql(), "SELECT * FROM t WHERE");
    assert!(stmt.args().is_empty());
}

#[test]
fn nullable_clause_needs_presence_only() {
    let template = "select * from t where 1=1 {? and a = :a ;nullable:true}";

    let params = MapParams::new().with("a", SqlValue::Null);
    let stmt = query(template, &params);
    assert_eq!(stmt.sql(), "select * from t where 1=1  and a is null ");
    assert!(stmt.args().is_empty());

    let stmt = query(template, &EmptyParams);
    assert_eq!(stmt.sql(), "select * from t where 1=1");
}

#[test]
fn positional_source_checks_by_index() {
    let template = "select * from t where 1=1 {? and id = :id }";
    let stmt = query(template, &ArrayParams::new(vec![SqlValue::Int(5)]));
    assert_eq!(stmt.sql(), "select * from t where 1=1  and id = ? ");
    assert_eq!(stmt.args(), &[SqlValue::Int(5)]);

    let stmt = query(template, &ArrayParams::new(vec![]));
    assert_eq!(stmt.sql(), "select * from t where 1=1");
}

#[test]
fn elided_clause_keeps_positions_aligned() {
    let template = "select * from t where 1=1 {? and a = :a } and b = :b";
    let params = ArrayParams::new(vec![SqlValue::Null, SqlValue::Int(2)]);
    let stmt = query(template, &params);
    assert_eq!(stmt.sql(), "select * from t where 1=1 and b = ?");
    assert_eq!(stmt.args(), &[SqlValue::Int(2)]);
}

#[test]
fn nullable_clause_on_positional_source() {
    let template = "select * from t where 1=1 {? and a = :a ;nullable:true} and b = :b";

    let params = ArrayParams::new(vec![SqlValue::Int(1), SqlValue::Int(2)]);
    let stmt = query(template, &params);
    assert_eq!(stmt.sql(), "select * from t where 1=1  and a = ?  and b = ?");
    assert_eq!(stmt.args(), &[SqlValue::Int(1), SqlValue::Int(2)]);

    let params = ArrayParams::new(vec![SqlValue::Null, SqlValue::Int(2)]);
    let stmt = query(template, &params);
    assert_eq!(stmt.sql(), "select * from t where 1=1  and a is null  and b = ?");
    assert_eq!(stmt.args(), &[SqlValue::Int(2)]);
}

#[test]
fn nested_clause_slots_count_for_outer_clause() {
    let template = "select * from t where 1=1 {? and a = :a {? and b = :b } and c = :c }";
    let params = ArrayParams::new(vec![SqlValue::Int(1), SqlValue::Null, SqlValue::Int(3)]);
    let stmt = query(template, &params);
    assert_eq!(stmt.sql(), "select * from t where 1=1  and a = ? and c = ? ");
    assert_eq!(stmt.args(), &[SqlValue::Int(1), SqlValue::Int(3)]);

    let params = ArrayParams::new(vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Null]);
    let stmt = query(template, &params);
    assert_eq!(stmt.sql(), "select * from t where 1=1");
    assert!(stmt.args().is_empty());
}

#[test]
fn template_text_is_kept() {
    let dynamic = clause(TEMPLATE);
    assert_eq!(dynamic.sql().to_string(), TEMPLATE);
    assert_eq!(dynamic.text(), TEMPLATE);
}

struct TenantTag;

impl TagProcessor for TenantTag {
    fn process_tag(
        &self,
        builder: &mut SqlStatementBuilder<'_>,
        params: &dyn Params,
        content: &str,
    ) -> oxide_dynsql::Result<()> {
        if let Some(tenant) = params.get("tenant").filter(|v| !v.is_null()) {
            builder.append(content);
            builder.add_parameter(tenant);
        }
        Ok(())
    }
}

fn tenant_context() -> Arc<SqlContext> {
    Arc::new(SqlContext::default().with_tag("tenant", Arc::new(TenantTag)))
}

#[test]
fn tag_only_clause_follows_its_tag() {
    let ctx = tenant_context();
    let dynamic = clause_in(&ctx, "select * from t where 1=1 {? and @tenant{tenant_id = ?} }");

    let params = MapParams::new().with("tenant", 7_i64);
    let stmt = dynamic.create_query_statement(&params).unwrap();
    assert_eq!(stmt.sql(), "select * from t where 1=1  and tenant_id = ? ");
    assert_eq!(stmt.args(), &[SqlValue::Int(7)]);

    let stmt = dynamic.create_query_statement(&EmptyParams).unwrap();
    assert_eq!(stmt.sql(), "select * from t where 1=1");
    assert!(stmt.args().is_empty());
}

#[test]
fn tag_outside_clause() {
    let ctx = tenant_context();
    let dynamic = clause_in(&ctx, "select * from t where @tenant(tenant_id = ?)");
    let params = MapParams::new().with("tenant", 3_i64);
    let stmt = dynamic.create_query_statement(&params).unwrap();
    assert_eq!(stmt.sql(), "select * from t where tenant_id = ?");
    assert_eq!(stmt.args(), &[SqlValue::Int(3)]);
}

#[test]
fn unknown_tag_fails_at_prepare() {
    let err = clause_err("select * from t where {? and @nothere{x} }");
    assert!(matches!(err, SqlError::ClauseConfig(_)), "{err:?}");
}
