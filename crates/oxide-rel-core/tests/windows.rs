//! Window functions and their default frames.

mod common;
use common::*;

use oxide_rel_core::expr::{col, sum};
use oxide_rel_core::plan::{QueryPlan, Select};
use oxide_rel_core::window::{
    dense_rank, first_value, lag, last_value, lead, nth_value, rank, row_number, WindowCall,
};
use oxide_rel_core::{row, EvalError, Expr, Relation, NULL};

/// `SELECT player, <call> AS w FROM scores ORDER BY player`.
fn per_player(call: WindowCall) -> Relation {
    let plan: QueryPlan = Select::new()
        .columns([col("player").into(), Expr::from(call).alias("w")])
        .from("scores")
        .order_by([col("player").asc()])
        .build();
    run(&plan)
}

#[test]
fn test_row_number_per_partition() {
    let out = per_player(
        row_number()
            .partition_by(vec![col("team")])
            .order_by(vec![col("points").desc()]),
    );
    assert_eq!(
        out.rows(),
        &[
            row!["a", 2],
            row!["b", 2],
            row!["c", 1],
            row!["d", 3],
            row!["e", 1],
        ]
    );
}

#[test]
fn test_rank_and_dense_rank_share_peers() {
    let ranked = per_player(rank().order_by(vec![col("points").asc()]));
    assert_eq!(
        ranked.rows(),
        &[
            row!["a", 2],
            row!["b", 1],
            row!["c", 4],
            row!["d", 2],
            row!["e", 5],
        ]
    );
    let dense = per_player(dense_rank().order_by(vec![col("points").asc()]));
    assert_eq!(
        dense.rows(),
        &[
            row!["a", 2],
            row!["b", 1],
            row!["c", 3],
            row!["d", 2],
            row!["e", 4],
        ]
    );
}

#[test]
fn test_last_value_frame_ends_at_last_peer() {
    let out = per_player(
        last_value(col("player"))
            .partition_by(vec![col("team")])
            .order_by(vec![col("points").asc()]),
    );
    assert_eq!(
        out.rows(),
        &[
            row!["a", "d"],
            row!["b", "b"],
            row!["c", "c"],
            row!["d", "d"],
            row!["e", "e"],
        ]
    );
}

#[test]
fn test_last_value_without_order_sees_whole_partition() {
    let out = per_player(last_value(col("player")).partition_by(vec![col("team")]));
    assert_eq!(
        out.rows(),
        &[
            row!["a", "d"],
            row!["b", "e"],
            row!["c", "d"],
            row!["d", "d"],
            row!["e", "e"],
        ]
    );
}

#[test]
fn test_nth_value_is_null_before_the_frame_reaches_it() {
    let out = per_player(
        nth_value(col("player"), 2)
            .partition_by(vec![col("team")])
            .order_by(vec![col("points").asc()]),
    );
    assert_eq!(
        out.rows(),
        &[
            row!["a", "d"],
            row!["b", NULL],
            row!["c", "d"],
            row!["d", "d"],
            row!["e", "e"],
        ]
    );
}

#[test]
fn test_nth_value_zero_is_invalid() {
    let plan = Select::new()
        .columns([Expr::from(nth_value(col("player"), 0)).into()])
        .from("scores")
        .build();
    assert!(matches!(try_run(&plan), Err(EvalError::InvalidPlan(_))));
}

#[test]
fn test_first_value_lag_and_lead() {
    let first = per_player(
        first_value(col("player"))
            .partition_by(vec![col("team")])
            .order_by(vec![col("points").desc()]),
    );
    assert_eq!(first.rows()[0], row!["a", "c"]);
    assert_eq!(first.rows()[1], row!["b", "e"]);

    let previous = per_player(lag(col("points"), 1).order_by(vec![col("player").asc()]));
    assert_eq!(
        previous.rows(),
        &[
            row!["a", NULL],
            row!["b", 10],
            row!["c", 7],
            row!["d", 20],
            row!["e", 10],
        ]
    );

    let next = per_player(lead(col("points"), 1).order_by(vec![col("player").asc()]));
    assert_eq!(
        next.rows(),
        &[
            row!["a", 7],
            row!["b", 20],
            row!["c", 10],
            row!["d", NULL],
            row!["e", NULL],
        ]
    );
}

#[test]
fn test_window_over_groups() {
    let ranking = Expr::from(rank().order_by(vec![sum(col("points")).desc()]));
    let plan = Select::new()
        .columns([col("team").into(), ranking.alias("place")])
        .from("scores")
        .group_by([col("team")])
        .build();
    assert_eq!(run(&plan).rows(), &[row!["red", 1], row!["blue", 2]]);
}

#[test]
fn test_order_by_window_call() {
    let numbering = Expr::from(row_number().order_by(vec![col("player").desc()]));
    let plan = Select::new()
        .columns([col("player").into()])
        .from("scores")
        .order_by([numbering.asc()])
        .limit(2)
        .build();
    assert_eq!(run(&plan).rows(), &[row!["e"], row!["d"]]);
}

#[test]
fn test_window_in_where_is_rejected() {
    let plan = Select::new()
        .all()
        .from("scores")
        .filter(Expr::from(row_number()).eq(oxide_rel_core::lit(1)))
        .build();
    assert!(matches!(
        try_run(&plan),
        Err(EvalError::InvalidReference {
            stage: oxide_rel_core::Stage::Where,
            ..
        })
    ));
}
