#![allow(dead_code)]

use oxide_rel_core::relation::{Relation, Row};
use oxide_rel_core::value::DataType;
use oxide_rel_core::{row, Catalog, EvalError, EvalOptions, Evaluator, JoinStrategy, QueryPlan, NULL};

/// `users(id, name, dob)`: ann 2000, bob 2005, cid 2005.
pub fn users() -> Relation {
    Relation::builder("users")
        .column("id", DataType::Integer)
        .column("name", DataType::Text)
        .column("dob", DataType::Integer)
        .rows([row![1, "ann", 2000], row![2, "bob", 2005], row![3, "cid", 2005]])
        .build()
        .unwrap()
}

/// `locations(user_id, city)`: user 2 has two rows, user 3 none, user 9
/// does not exist.
pub fn locations() -> Relation {
    Relation::builder("locations")
        .column("user_id", DataType::Integer)
        .column("city", DataType::Text)
        .rows([
            row![1, "oslo"],
            row![2, "rome"],
            row![2, "lima"],
            row![9, "kyiv"],
        ])
        .build()
        .unwrap()
}

/// `pairs(a, b)`: `(1, NULL)` and `(1, 1)`.
pub fn pairs() -> Relation {
    Relation::builder("pairs")
        .column("a", DataType::Integer)
        .column("b", DataType::Integer)
        .rows([row![1, NULL], row![1, 1]])
        .build()
        .unwrap()
}

/// `scores(team, player, points)`, with ties inside team red.
pub fn scores() -> Relation {
    Relation::builder("scores")
        .column("team", DataType::Text)
        .column("player", DataType::Text)
        .column("points", DataType::Integer)
        .rows([
            row!["red", "a", 10],
            row!["blue", "b", 7],
            row!["red", "c", 20],
            row!["red", "d", 10],
            row!["blue", "e", NULL],
        ])
        .build()
        .unwrap()
}

pub fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    for relation in [users(), locations(), pairs(), scores()] {
        catalog.register(relation).unwrap();
    }
    catalog
}

pub fn run(plan: &QueryPlan) -> Relation {
    try_run(plan).unwrap_or_else(|e| panic!("evaluation failed: {e}\nplan: {plan}"))
}

pub fn try_run(plan: &QueryPlan) -> Result<Relation, EvalError> {
    Evaluator::new(&catalog()).evaluate(plan)
}

pub fn run_with(plan: &QueryPlan, join_strategy: JoinStrategy) -> Relation {
    Evaluator::new(&catalog())
        .with_options(EvalOptions { join_strategy })
        .evaluate(plan)
        .unwrap_or_else(|e| panic!("evaluation failed: {e}\nplan: {plan}"))
}

/// Rows in ascending order, for comparisons that ignore row order.
pub fn sorted(rows: &[Row]) -> Vec<Row> {
    let mut rows = rows.to_vec();
    rows.sort();
    rows
}

pub fn names(relation: &Relation) -> Vec<String> {
    relation
        .schema()
        .columns()
        .iter()
        .map(|c| c.name.clone())
        .collect()
}
