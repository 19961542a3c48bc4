//! Tests for name resolution against entity metadata and dialect quoting.

mod common;
use common::*;

use std::sync::Arc;

use oxide_dynsql::dialect::{GenericDialect, MySqlDialect, SqlServerDialect};
use oxide_dynsql::{
    EmptyParams, EntityMapping, FieldMapping, MapParams, OrmMetadata, Params, SqlContext,
};

#[test]
fn fields_resolve_to_columns() {
    let ctx = mapped_context(Arc::new(GenericDialect::new()));
    let dynamic = clause_in(&ctx, "select a.id, a.order from Account a where a.name = :name");
    let stmt = dynamic
        .create_query_statement(&MapParams::new().with("name", "x"))
        .unwrap();
    assert_eq!(
        stmt.sql(),
        "select a.account_id, a.\"order\" from accounts a where a.account_name = ?"
    );
}

#[test]
fn mysql_quotes_with_backticks() {
    let ctx = mapped_context(Arc::new(MySqlDialect::new()));
    let dynamic = clause_in(&ctx, "select a.order, \"Some Col\" from Account a");
    let stmt = dynamic.create_query_statement(&EmptyParams).unwrap();
    assert_eq!(
        stmt.sql(),
        "select a.`order`, `Some Col` from accounts a"
    );
}

#[test]
fn sqlserver_quotes_with_brackets() {
    let ctx = mapped_context(Arc::new(SqlServerDialect::new()));
    let dynamic = clause_in(&ctx, "select \"Some Col\" from Account");
    let stmt = dynamic.create_query_statement(&EmptyParams).unwrap();
    assert_eq!(stmt.sql(), "select [Some Col] from accounts");
}

#[test]
fn unresolved_names_are_emitted_as_written() {
    let ctx = mapped_context(Arc::new(GenericDialect::new()));
    let dynamic = clause_in(&ctx, "select Foo, x.bar from other x");
    let stmt = dynamic.create_query_statement(&EmptyParams).unwrap();
    assert_eq!(stmt.sql(), "select Foo, x.bar from other x");
}

#[test]
fn order_by_alias_follows_the_aliased_column() {
    let ctx = mapped_context(Arc::new(GenericDialect::new()));
    let dynamic = clause_in(&ctx, "select name as n from Account order by n");
    let stmt = dynamic.create_query_statement(&EmptyParams).unwrap();
    assert_eq!(
        stmt.sql(),
        "select account_name as n from accounts order by account_name"
    );
}

#[test]
fn schema_prefixes_mapped_tables() {
    let metadata = OrmMetadata::new().with_entity(
        EntityMapping::new("Item", "items")
            .with_schema("app")
            .with_field(FieldMapping::new("id", "item_id").primary_key()),
    );
    let ctx = Arc::new(SqlContext::default().with_metadata(Arc::new(metadata)));
    let dynamic = clause_in(&ctx, "select id from Item where id = :id");
    let stmt = dynamic
        .create_query_statement(&MapParams::new().with("id", 1_i64))
        .unwrap();
    assert_eq!(stmt.sql(), "select item_id from app.items where item_id = ?");
}

#[test]
fn dynamic_table_names() {
    let metadata = OrmMetadata::new().with_entity(
        EntityMapping::new("Log", "logs")
            .with_field(FieldMapping::new("level", "log_level"))
            .with_dynamic_table_name(Arc::new(
                |entity: &EntityMapping, params: &dyn Params| -> oxide_dynsql::Result<String> {
                    let month = params
                        .get("month")
                        .map(|v| v.to_replacement_text())
                        .unwrap_or_default();
                    Ok(format!("{}_{month}", entity.table_name()))
                },
            )),
    );
    let ctx = Arc::new(SqlContext::default().with_metadata(Arc::new(metadata)));
    let dynamic = clause_in(&ctx, "select * from Log where level = :level");
    let params = MapParams::new().with("month", 202_601_i64).with("level", 3_i64);
    let stmt = dynamic.create_query_statement(&params).unwrap();
    assert_eq!(stmt.sql(), "select * from logs_202601 where log_level = ?");

    let clause = clause_in(&ctx, "delete from Log where level = :level");
    let batch = clause.prepared_batch_statement();
    assert!(batch.is_err());
}
