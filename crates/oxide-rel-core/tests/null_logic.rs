//! Three-valued logic, in isolation and inside WHERE.

mod common;
use common::*;

use oxide_rel_core::expr::{coalesce, col, exists, lit, not_exists, null};
use oxide_rel_core::logic::{self, CompareOp};
use oxide_rel_core::plan::Select;
use oxide_rel_core::{row, TriBool, Value};

#[test]
fn test_null_comparisons_are_unknown() {
    for op in [
        CompareOp::Eq,
        CompareOp::NotEq,
        CompareOp::Lt,
        CompareOp::LtEq,
        CompareOp::Gt,
        CompareOp::GtEq,
    ] {
        assert_eq!(
            logic::compare(&Value::Null, &Value::Null, op).unwrap(),
            TriBool::Unknown
        );
        assert_eq!(
            logic::compare(&Value::Integer(1), &Value::Null, op).unwrap(),
            TriBool::Unknown
        );
    }
}

#[test]
fn test_null_checks_are_definite() {
    assert!(logic::is_not_distinct_from(&Value::Null, &Value::Null).unwrap());
    assert!(!logic::is_not_distinct_from(&Value::Null, &Value::Integer(1)).unwrap());
    assert!(logic::is_null(&Value::Null));
    assert!(!logic::is_not_null(&Value::Null));
    assert_eq!(
        logic::coalesce([&Value::Null, &Value::Null, &Value::Boolean(false)]),
        Value::Boolean(false)
    );
}

#[test]
fn test_and_or_not_truth_tables() {
    use TriBool::{False, True, Unknown};
    assert_eq!(False.and(Unknown), False);
    assert_eq!(True.and(Unknown), Unknown);
    assert_eq!(True.or(Unknown), True);
    assert_eq!(False.or(Unknown), Unknown);
    assert_eq!(!Unknown, Unknown);
}

#[test]
fn test_where_equality_drops_unknown_rows() {
    let plan = Select::new()
        .all()
        .from("pairs")
        .filter(col("a").eq(col("b")))
        .build();
    assert_eq!(run(&plan).rows(), &[row![1, 1]]);

    // Neither = nor <> keeps the NULL row.
    let plan = Select::new()
        .all()
        .from("pairs")
        .filter(col("a").not_eq(col("b")))
        .build();
    assert!(run(&plan).is_empty());
}

#[test]
fn test_is_not_distinct_from_matches_nulls() {
    let plan = Select::new()
        .all()
        .from("pairs")
        .filter(col("b").is_not_distinct_from(null()))
        .build();
    assert_eq!(run(&plan).len(), 1);
}

#[test]
fn test_not_in_with_null_member_keeps_nothing() {
    let plan = Select::new()
        .all()
        .from("users")
        .filter(col("id").not_in_list(vec![lit(1), null()]))
        .build();
    assert!(run(&plan).is_empty());

    let sub = Select::new().columns([col("b").into()]).from("pairs").build();
    let plan = Select::new()
        .all()
        .from("users")
        .filter(col("id").not_in_subquery(sub))
        .build();
    assert!(run(&plan).is_empty());
}

#[test]
fn test_in_list_finds_definite_matches_despite_nulls() {
    let plan = Select::new()
        .columns([col("name").into()])
        .from("users")
        .filter(col("id").in_list(vec![lit(2), null()]))
        .build();
    assert_eq!(run(&plan).rows(), &[row!["bob"]]);
}

#[test]
fn test_between_is_inclusive_and_ordered() {
    let inclusive = Select::new()
        .columns([col("name").into()])
        .from("users")
        .filter(col("dob").between(lit(2000), lit(2004)))
        .build();
    assert_eq!(run(&inclusive).rows(), &[row!["ann"]]);

    let reversed = Select::new()
        .all()
        .from("users")
        .filter(col("dob").between(lit(2010), lit(1990)))
        .build();
    assert!(run(&reversed).is_empty());

    assert_eq!(
        logic::between(&Value::Integer(5), &Value::Null, &Value::Integer(9)).unwrap(),
        TriBool::Unknown
    );
}

#[test]
fn test_coalesce_in_select() {
    let plan = Select::new()
        .columns([coalesce([col("b"), lit(0)]).alias("b")])
        .from("pairs")
        .build();
    assert_eq!(run(&plan).rows(), &[row![0], row![1]]);
}

#[test]
fn test_exists_is_never_unknown() {
    let matching = Select::new()
        .columns([lit(1).into()])
        .from("locations")
        .filter(col("locations.user_id").eq(col("users.id")))
        .build();
    let plan = Select::new()
        .columns([col("name").into()])
        .from("users")
        .filter(exists(matching.clone()))
        .build();
    assert_eq!(run(&plan).rows(), &[row!["ann"], row!["bob"]]);

    let plan = Select::new()
        .columns([col("name").into()])
        .from("users")
        .filter(not_exists(matching))
        .build();
    assert_eq!(run(&plan).rows(), &[row!["cid"]]);
}

#[test]
fn test_comparing_text_with_integer_fails() {
    let plan = Select::new()
        .all()
        .from("users")
        .filter(col("name").eq(lit(1)))
        .build();
    assert!(matches!(
        try_run(&plan),
        Err(oxide_rel_core::EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn test_like_patterns() {
    let plan = Select::new()
        .columns([col("name").into()])
        .from("users")
        .filter(col("name").like(lit("_o%")))
        .build();
    assert_eq!(run(&plan).rows(), &[row!["bob"]]);
}

#[test]
fn test_and_binds_tighter_than_or() {
    // id = 1 OR id = 2 AND dob = 2000  is  id = 1 OR (id = 2 AND dob = 2000)
    let predicate = col("id")
        .eq(lit(1))
        .or(col("id").eq(lit(2)).and(col("dob").eq(lit(2000))));
    assert_eq!(predicate.to_string(), "id = 1 OR id = 2 AND dob = 2000");
    let plan = Select::new()
        .columns([col("name").into()])
        .from("users")
        .filter(predicate)
        .build();
    assert_eq!(run(&plan).rows(), &[row!["ann"]]);

    let grouped = col("id")
        .eq(lit(1))
        .or(col("id").eq(lit(2)))
        .and(col("dob").eq(lit(2005)));
    assert_eq!(grouped.to_string(), "(id = 1 OR id = 2) AND dob = 2005");
    let plan = Select::new()
        .columns([col("name").into()])
        .from("users")
        .filter(grouped)
        .build();
    assert_eq!(run(&plan).rows(), &[row!["bob"]]);
}
