//! Clause order, grouping, sub-selects and nested plans.

mod common;
use common::*;

use oxide_rel_core::expr::{avg, col, count, count_distinct, count_star, lit, max, min, null, scalar, sum};
use oxide_rel_core::plan::Select;
use oxide_rel_core::{row, DataType, EvalError, Evaluator, Source, Stage, Value, NULL};

#[test]
fn test_order_by_desc_then_name_limit_one() {
    let plan = Select::new()
        .all()
        .from("users")
        .order_by([col("dob").desc(), col("name").asc()])
        .limit(1)
        .build();
    let out = run(&plan);
    assert_eq!(out.rows(), &[row![2, "bob", 2005]]);
    assert_eq!(names(&out), ["id", "name", "dob"]);
}

#[test]
fn test_group_by_having_count() {
    let plan = Select::new()
        .columns([col("dob").into(), count_star().alias("count")])
        .from("users")
        .group_by([col("dob")])
        .having(count_star().gt(lit(1)))
        .build();
    let out = run(&plan);
    assert_eq!(out.rows(), &[row![2005, 2]]);
    assert_eq!(names(&out), ["dob", "count"]);
}

#[test]
fn test_groups_keep_first_appearance_order() {
    let plan = Select::new()
        .columns([col("dob").into(), count_star().into()])
        .from("users")
        .group_by([col("dob")])
        .build();
    let out = run(&plan);
    assert_eq!(out.rows(), &[row![2000, 1], row![2005, 2]]);
    assert_eq!(names(&out), ["dob", "COUNT(*)"]);
}

#[test]
fn test_aggregates_ignore_nulls() {
    let plan = Select::new()
        .columns([
            count_star().alias("rows"),
            count(col("points")).alias("scored"),
            count_distinct(col("points")).alias("distinct"),
            sum(col("points")).alias("total"),
            min(col("points")).alias("low"),
            max(col("points")).alias("high"),
            avg(col("points")).alias("mean"),
        ])
        .from("scores")
        .build();
    assert_eq!(run(&plan).rows(), &[row![5, 4, 3, 47, 7, 20, 11.75]]);
}

#[test]
fn test_aggregates_over_empty_input_form_one_group() {
    let plan = Select::new()
        .columns([count_star().into(), sum(col("points")).into()])
        .from("scores")
        .filter(lit(false))
        .build();
    let out = run(&plan);
    assert_eq!(out.rows(), &[row![0, NULL]]);
    assert_eq!(out.schema().column(1).unwrap().data_type, DataType::Integer);

    // With GROUP BY there are no groups at all.
    let plan = Select::new()
        .columns([col("team").into(), count_star().into()])
        .from("scores")
        .filter(lit(false))
        .group_by([col("team")])
        .build();
    assert!(run(&plan).is_empty());
}

#[test]
fn test_order_by_aggregate_not_projected() {
    let plan = Select::new()
        .columns([col("team").into()])
        .from("scores")
        .group_by([col("team")])
        .order_by([sum(col("points")).desc()])
        .build();
    assert_eq!(run(&plan).rows(), &[row!["red"], row!["blue"]]);
}

#[test]
fn test_order_by_alias_and_nulls_placement() {
    let plan = Select::new()
        .columns([col("player").into(), col("points").alias("p")])
        .from("scores")
        .order_by([col("p").asc()])
        .build();
    let players: Vec<Value> = run(&plan).column_values("player").unwrap();
    assert_eq!(players.last(), Some(&Value::Text(String::from("e"))));

    let plan = Select::new()
        .columns([col("player").into(), col("points").alias("p")])
        .from("scores")
        .order_by([col("p").asc().nulls_first()])
        .limit(1)
        .build();
    assert_eq!(run(&plan).rows(), &[row!["e", NULL]]);
}

#[test]
fn test_order_by_is_stable() {
    let plan = Select::new()
        .columns([col("player").into()])
        .from("scores")
        .filter(col("team").eq(lit("red")))
        .order_by([col("points").asc()])
        .build();
    assert_eq!(run(&plan).rows(), &[row!["a"], row!["d"], row!["c"]]);
}

#[test]
fn test_distinct_sorts_and_dedupes() {
    let plan = Select::new()
        .distinct()
        .columns([col("dob").into()])
        .from("users")
        .build();
    assert_eq!(run(&plan).rows(), &[row![2000], row![2005]]);
}

#[test]
fn test_scalar_subquery_with_two_rows_fails() {
    let city = Select::new()
        .columns([col("locations.city").into()])
        .from("locations")
        .filter(col("locations.user_id").eq(col("users.id")))
        .build();
    let plan = Select::new()
        .columns([col("name").into(), scalar(city).alias("city")])
        .from("users")
        .build();
    assert_eq!(try_run(&plan).unwrap_err(), EvalError::Cardinality { rows: 2 });
}

#[test]
fn test_scalar_subquery_zero_rows_is_null() {
    let city = Select::new()
        .columns([col("locations.city").into()])
        .from("locations")
        .filter(col("locations.user_id").eq(col("users.id")))
        .build();
    let plan = Select::new()
        .columns([col("name").into(), scalar(city).alias("city")])
        .from("users")
        .filter(col("id").not_eq(lit(2)))
        .build();
    let out = run(&plan);
    assert_eq!(out.rows(), &[row!["ann", "oslo"], row!["cid", NULL]]);
}

#[test]
fn test_scalar_subquery_must_have_one_column() {
    let plan = Select::new()
        .columns([scalar(Select::new().all().from("users").build()).into()])
        .build();
    assert!(matches!(try_run(&plan), Err(EvalError::InvalidPlan(_))));
}

#[test]
fn test_evaluation_is_idempotent() {
    let plan = Select::new()
        .columns([col("users.name").into(), col("locations.city").into()])
        .from("users")
        .left_join("locations", col("users.id").eq(col("locations.user_id")))
        .order_by([col("locations.city").desc()])
        .build();
    let catalog = catalog();
    let evaluator = Evaluator::new(&catalog);
    let first = evaluator.evaluate(&plan).unwrap();
    let second = evaluator.evaluate(&plan).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_cte_referenced_twice() {
    let born_2005 = Select::new()
        .columns([col("id").into(), col("name").into()])
        .from("users")
        .filter(col("dob").eq(lit(2005)))
        .build();
    let plan = Select::new()
        .with("young", born_2005)
        .columns([col("a.name").into(), col("b.name").alias("other")])
        .from(Source::table("young").alias("a"))
        .inner_join(
            Source::table("young").alias("b"),
            col("a.id").lt(col("b.id")),
        )
        .build();
    assert_eq!(run(&plan).rows(), &[row!["bob", "cid"]]);
}

#[test]
fn test_cte_sees_earlier_cte() {
    let plan = Select::new()
        .with("one", Select::new().columns([lit(1).alias("x")]).build())
        .with(
            "two",
            Select::new()
                .columns([(col("x") + lit(1)).alias("x")])
                .from("one")
                .build(),
        )
        .all()
        .from("two")
        .build();
    assert_eq!(run(&plan).rows(), &[row![2]]);
}

#[test]
fn test_view_is_inlined_per_reference() {
    let mut catalog = catalog();
    catalog
        .create_view(
            "adults",
            Select::new()
                .columns([col("name").into()])
                .from("users")
                .filter(col("dob").lt(lit(2005)))
                .build(),
        )
        .unwrap();
    let plan = Select::new()
        .columns([col("adults.name").into()])
        .from("adults")
        .build();
    let out = Evaluator::new(&catalog).evaluate(&plan).unwrap();
    assert_eq!(out.rows(), &[row!["ann"]]);
}

#[test]
fn test_subquery_in_from() {
    let inner = Select::new()
        .columns([col("team").into(), sum(col("points")).alias("total")])
        .from("scores")
        .group_by([col("team")])
        .build();
    let plan = Select::new()
        .columns([col("t.team").into()])
        .from(Source::subquery(inner, "t"))
        .filter(col("t.total").gt(lit(10)))
        .build();
    assert_eq!(run(&plan).rows(), &[row!["red"]]);
}

#[test]
fn test_union_as_source() {
    let names = |dob: i64| {
        Select::new()
            .columns([col("name").into()])
            .from("users")
            .filter(col("dob").eq(lit(dob)))
            .build()
    };
    let all = Select::new()
        .all()
        .from(Source::union_all(names(2005), names(2005), "u"))
        .build();
    assert_eq!(run(&all).len(), 4);
    let distinct = Select::new()
        .all()
        .from(Source::union(names(2005), names(2000), "u"))
        .build();
    assert_eq!(
        run(&distinct).rows(),
        &[row!["ann"], row!["bob"], row!["cid"]]
    );
}

#[test]
fn test_union_of_mismatched_plans_fails() {
    let left = Select::new().columns([col("id").into()]).from("users").build();
    let right = Select::new().columns([col("name").into()]).from("users").build();
    let plan = Select::new()
        .all()
        .from(Source::union(left, right, "u"))
        .build();
    assert!(matches!(try_run(&plan), Err(EvalError::SchemaMismatch { .. })));
}

#[test]
fn test_group_by_cannot_use_select_alias() {
    let plan = Select::new()
        .columns([(col("dob") / lit(10)).alias("decade"), count_star().into()])
        .from("users")
        .group_by([col("decade")])
        .build();
    assert!(matches!(
        try_run(&plan),
        Err(EvalError::InvalidReference {
            stage: Stage::GroupBy,
            ..
        })
    ));
}

#[test]
fn test_having_cannot_use_window() {
    let plan = Select::new()
        .columns([col("team").into()])
        .from("scores")
        .group_by([col("team")])
        .having(oxide_rel_core::Expr::from(oxide_rel_core::window::row_number()).gt(lit(1)))
        .build();
    assert!(matches!(
        try_run(&plan),
        Err(EvalError::InvalidReference {
            stage: Stage::Having,
            ..
        })
    ));
}

#[test]
fn test_nested_aggregates_are_rejected() {
    let plan = Select::new()
        .columns([sum(count_star()).into()])
        .from("users")
        .build();
    assert!(matches!(try_run(&plan), Err(EvalError::InvalidPlan(_))));
}

#[test]
fn test_wildcard_after_group_by_is_rejected() {
    let plan = Select::new()
        .all()
        .from("users")
        .group_by([col("dob")])
        .build();
    assert!(matches!(
        try_run(&plan),
        Err(EvalError::InvalidReference {
            stage: Stage::Select,
            ..
        })
    ));
}

#[test]
fn test_qualified_wildcard_selects_one_side() {
    let plan = Select::new()
        .columns([oxide_rel_core::plan::Projection::QualifiedWildcard(String::from("locations"))])
        .from("users")
        .inner_join("locations", col("users.id").eq(col("locations.user_id")))
        .build();
    let out = run(&plan);
    assert_eq!(names(&out), ["user_id", "city"]);
    assert_eq!(out.len(), 3);
}

#[test]
fn test_null_literal_column_takes_text() {
    let plan = Select::new().columns([null().alias("nothing")]).build();
    let out = run(&plan);
    assert_eq!(out.schema().column(0).unwrap().data_type, DataType::Text);
    assert!(out.rows()[0][0].is_null());
}

#[test]
fn test_integer_division_truncates_and_zero_fails() {
    let plan = Select::new().columns([(lit(7) / lit(2)).alias("q")]).build();
    assert_eq!(run(&plan).rows(), &[row![3]]);
    let plan = Select::new().columns([(lit(7) / lit(0)).alias("q")]).build();
    assert_eq!(try_run(&plan).unwrap_err(), EvalError::DivisionByZero);
}

#[test]
fn test_profile_counts() {
    let out = oxide_rel_core::profile(&scores()).unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out.rows()[2], row!["points", "INTEGER", 5, 1, 3, "7", "20"]);
}

#[test]
fn test_inner_expression_shadows_outer_group_key() {
    let born_2000 = Select::new()
        .columns([count_star().into()])
        .from(Source::table("users").alias("i"))
        .filter((col("dob") + lit(0)).eq(lit(2000)))
        .build();
    let plan = Select::new()
        .columns([
            (col("dob") + lit(0)).alias("d"),
            scalar(born_2000).alias("n"),
        ])
        .from("users")
        .group_by([col("dob") + lit(0)])
        .build();
    assert_eq!(run(&plan).rows(), &[row![2000, 1], row![2005, 1]]);
}

#[test]
fn test_correlated_subquery_reads_outer_group_key() {
    let same_year = Select::new()
        .columns([count_star().into()])
        .from(Source::table("users").alias("i"))
        .filter(col("i.dob").eq(col("users.dob")))
        .build();
    let plan = Select::new()
        .columns([col("dob").into(), scalar(same_year).alias("n")])
        .from("users")
        .group_by([col("dob")])
        .build();
    assert_eq!(run(&plan).rows(), &[row![2000, 1], row![2005, 2]]);
}

#[test]
fn test_group_by_cannot_use_window() {
    let plan = Select::new()
        .columns([count_star().into()])
        .from("users")
        .group_by([oxide_rel_core::Expr::from(oxide_rel_core::window::row_number())])
        .build();
    assert!(matches!(
        try_run(&plan),
        Err(EvalError::InvalidReference {
            stage: Stage::GroupBy,
            ..
        })
    ));
}

#[test]
fn test_group_by_cannot_use_aggregate() {
    let plan = Select::new()
        .columns([count_star().into()])
        .from("users")
        .group_by([count_star()])
        .build();
    assert!(matches!(
        try_run(&plan),
        Err(EvalError::InvalidReference {
            stage: Stage::GroupBy,
            ..
        })
    ));
}

#[test]
fn test_join_on_cannot_use_aggregate() {
    let plan = Select::new()
        .all()
        .from("users")
        .inner_join("locations", col("users.id").eq(max(col("locations.user_id"))))
        .build();
    assert!(matches!(
        try_run(&plan),
        Err(EvalError::InvalidReference {
            stage: Stage::JoinOn,
            ..
        })
    ));
}
