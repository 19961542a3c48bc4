//! A prepared template is shared between threads.

mod common;
use common::*;

use std::sync::Arc;
use std::thread;

use oxide_dynsql::{MapParams, SqlValue};

#[test]
fn shared_clause_builds_from_many_threads() {
    let dynamic = Arc::new(clause(
        "select * from t where 1=1 {? and a = :a } {? and b in (:b) }",
    ));

    let handles: Vec<_> = (0..8_i64)
        .map(|i| {
            let dynamic = Arc::clone(&dynamic);
            thread::spawn(move || {
                let mut params = MapParams::new().with("a", i);
                if i % 2 == 0 {
                    params.set("b", vec![i, i + 1]);
                }
                let stmt = dynamic.create_query_statement(&params).unwrap();
                (i, stmt)
            })
        })
        .collect();

    for handle in handles {
        let (i, stmt) = handle.join().unwrap();
        if i % 2 == 0 {
            assert_eq!(
                stmt.sql(),
                "select * from t where 1=1  and a = ?   and b in (?,?) "
            );
            assert_eq!(
                stmt.args(),
                &[SqlValue::Int(i), SqlValue::Int(i), SqlValue::Int(i + 1)]
            );
        } else {
            assert_eq!(stmt.sql(), "select * from t where 1=1  and a = ? ");
            assert_eq!(stmt.args(), &[SqlValue::Int(i)]);
        }
    }
}

#[test]
fn batch_preparation_races_settle_on_one_value() {
    let dynamic = Arc::new(clause("insert into t (a) values (:a)"));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dynamic = Arc::clone(&dynamic);
            thread::spawn(move || dynamic.prepared_batch_statement().unwrap().sql().to_string())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), "insert into t (a) values (?)");
    }
}
