//! Per-column data profiling.
//!
//! Each column is profiled by one aggregate query over the relation; the
//! per-column results are concatenated with UNION ALL.

use tracing::debug;

use crate::error::Result;
use crate::expr::{count, count_distinct, count_star, lit, max, min, Expr};
use crate::pipeline;
use crate::plan::{QueryPlan, Select, Source};
use crate::relation::{Column, ComputedColumn, Relation};
use crate::set_ops;
use crate::value::DataType;

/// Output columns of [`profile`] and their types.
pub const PROFILE_COLUMNS: [(&str, DataType); 7] = [
    ("column", DataType::Text),
    ("data_type", DataType::Text),
    ("row_count", DataType::Integer),
    ("null_count", DataType::Integer),
    ("distinct_count", DataType::Integer),
    ("min", DataType::Text),
    ("max", DataType::Text),
];

fn column_plan(relation: &Relation, column: &Column) -> QueryPlan {
    let value = match &column.qualifier {
        Some(q) => Expr::qualified_column(q.as_str(), column.name.as_str()),
        None => Expr::column(column.name.as_str()),
    };
    Select::new()
        .columns([
            lit(column.name.as_str()).alias("column"),
            lit(column.data_type.as_str()).alias("data_type"),
            count_star().alias("row_count"),
            (count_star() - count(value.clone())).alias("null_count"),
            count_distinct(value.clone()).alias("distinct_count"),
            min(value.clone()).cast(DataType::Text).alias("min"),
            max(value).cast(DataType::Text).alias("max"),
        ])
        .from(Source::values(relation.clone()))
        .build()
}

/// Profiles every column of `relation`, one output row per column in schema
/// order.
///
/// `min` and `max` are rendered as text so that one output column can hold
/// values of every source type; they are NULL for all-NULL columns.
///
/// # Errors
///
/// Returns any error raised while evaluating the per-column queries.
pub fn profile(relation: &Relation) -> Result<Relation> {
    let mut result: Option<Relation> = None;
    for column in relation.schema().columns() {
        let part = pipeline::evaluate(&column_plan(relation, column))?;
        result = Some(match result {
            Some(acc) => set_ops::union_all(&acc, &part)?,
            None => part,
        });
    }
    debug!(
        relation = relation.name(),
        columns = relation.schema().len(),
        rows = relation.len(),
        "profiled relation"
    );
    match result {
        Some(profiled) => Ok(profiled.renamed("profile")),
        None => Relation::computed(
            "profile",
            PROFILE_COLUMNS
                .iter()
                .map(|(name, data_type)| ComputedColumn::new(*name, Some(*data_type)))
                .collect(),
            Vec::new(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crate::{row, NULL};

    #[test]
    fn test_profile_counts() {
        let relation = Relation::builder("t")
            .column("id", DataType::Integer)
            .column("tag", DataType::Text)
            .rows([row![3, "x"], row![1, NULL], row![2, "x"]])
            .build()
            .unwrap();
        let out = profile(&relation).unwrap();
        assert_eq!(out.name(), "profile");
        assert_eq!(
            out.rows(),
            &[
                row!["id", "INTEGER", 3, 0, 3, "1", "3"],
                row!["tag", "TEXT", 3, 1, 1, "x", "x"],
            ]
        );
        let names: Vec<_> = out.schema().columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, PROFILE_COLUMNS.map(|(n, _)| n));
    }

    #[test]
    fn test_profile_empty_relation() {
        let relation = Relation::builder("t")
            .column("id", DataType::Integer)
            .build()
            .unwrap();
        let out = profile(&relation).unwrap();
        assert_eq!(out.rows()[0][2], Value::Integer(0));
        assert!(out.rows()[0][5].is_null());
        assert_eq!(out.schema().column(5).unwrap().data_type, DataType::Text);
    }

    #[test]
    fn test_profile_without_columns() {
        let relation = Relation::builder("t").build().unwrap();
        let out = profile(&relation).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.schema().len(), 7);
    }
}
