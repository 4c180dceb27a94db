//! UNION and UNION ALL over whole relations.

mod common;
use common::*;

use oxide_rel_core::relation::Relation;
use oxide_rel_core::set_ops::distinct;
use oxide_rel_core::value::DataType;
use oxide_rel_core::{row, union, union_all, EvalError, NULL};

fn ids(name: &str, rows: Vec<oxide_rel_core::Row>) -> Relation {
    Relation::builder(name)
        .column("id", DataType::Integer)
        .column("tag", DataType::Text)
        .rows(rows)
        .build()
        .unwrap()
}

#[test]
fn test_union_all_keeps_every_row() {
    let a = ids("a", vec![row![1, "x"], row![1, "x"], row![2, NULL]]);
    let b = ids("b", vec![row![2, NULL], row![3, "z"]]);
    let out = union_all(&a, &b).unwrap();
    assert_eq!(out.len(), a.len() + b.len());
    assert_eq!(out.rows()[..3], a.rows()[..]);
}

#[test]
fn test_union_has_no_duplicates() {
    let a = ids("a", vec![row![1, "x"], row![1, "x"], row![2, NULL]]);
    let b = ids("b", vec![row![2, NULL], row![3, "z"]]);
    let out = union(&a, &b).unwrap();
    assert_eq!(out.rows(), &[row![1, "x"], row![2, NULL], row![3, "z"]]);
    assert_eq!(out.rows(), distinct(&out).rows());
}

#[test]
fn test_union_requires_matching_types() {
    let a = ids("a", vec![]);
    let err = union_all(&a, &users()).unwrap_err();
    assert!(matches!(err, EvalError::SchemaMismatch { .. }));
}

#[test]
fn test_union_takes_left_names() {
    let renamed = Relation::builder("b")
        .column("key", DataType::Integer)
        .column("label", DataType::Text)
        .row(row![5, "q"])
        .build()
        .unwrap();
    let out = union(&ids("a", vec![]), &renamed).unwrap();
    assert_eq!(names(&out), ["id", "tag"]);
}
