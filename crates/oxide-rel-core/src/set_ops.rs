//! UNION, UNION ALL and DISTINCT.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{EvalError, Result};
use crate::relation::{Relation, Row};

/// Set operators usable as a FROM source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOp {
    /// UNION (distinct rows).
    Union,
    /// UNION ALL (every row).
    UnionAll,
}

impl SetOp {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
        }
    }
}

impl fmt::Display for SetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies `op` to `a` and `b`.
///
/// # Errors
///
/// See [`union_all`].
pub fn apply(op: SetOp, a: &Relation, b: &Relation) -> Result<Relation> {
    match op {
        SetOp::Union => union(a, b),
        SetOp::UnionAll => union_all(a, b),
    }
}

/// Concatenates `a` and `b`, keeping order and duplicates.
///
/// The output takes its name and column names from `a`.
///
/// # Errors
///
/// Returns [`EvalError::SchemaMismatch`] unless both operands have the same
/// number of columns with the same types, column by column.
pub fn union_all(a: &Relation, b: &Relation) -> Result<Relation> {
    let (left, right) = (a.schema(), b.schema());
    if left.len() != right.len() || !left.types().eq(right.types()) {
        return Err(EvalError::SchemaMismatch {
            left: left.to_string(),
            right: right.to_string(),
        });
    }
    let mut rows = Vec::with_capacity(a.len() + b.len());
    rows.extend_from_slice(a.rows());
    rows.extend_from_slice(b.rows());
    trace!(left = a.len(), right = b.len(), "union all");
    Ok(Relation::from_trusted(a.name(), left.clone(), rows))
}

/// `a UNION b`: the distinct rows of both operands, in ascending row order.
///
/// # Errors
///
/// See [`union_all`].
pub fn union(a: &Relation, b: &Relation) -> Result<Relation> {
    Ok(distinct(&union_all(a, b)?))
}

/// The distinct rows of `relation`, in ascending row order (NULL first).
#[must_use]
pub fn distinct(relation: &Relation) -> Relation {
    let rows = dedup_sorted(relation.rows().to_vec());
    Relation::from_trusted(relation.name(), relation.schema().clone(), rows)
}

pub(crate) fn dedup_sorted(mut rows: Vec<Row>) -> Vec<Row> {
    rows.sort();
    rows.dedup();
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::DataType;
    use crate::{row, NULL};

    fn rel(name: &str, rows: Vec<Row>) -> Relation {
        Relation::builder(name)
            .column("id", DataType::Integer)
            .column("name", DataType::Text)
            .rows(rows)
            .build()
            .unwrap()
    }

    #[test]
    fn test_union_all_keeps_everything() {
        let a = rel("a", vec![row![2, "b"], row![1, "a"]]);
        let b = rel("b", vec![row![1, "a"]]);
        let out = union_all(&a, &b).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.rows()[2], row![1, "a"]);
        assert_eq!(out.name(), "a");
    }

    #[test]
    fn test_union_sorts_and_dedupes() {
        let a = rel("a", vec![row![2, "b"], row![1, "a"], row![NULL, "z"]]);
        let b = rel("b", vec![row![1, "a"], row![NULL, "z"]]);
        let out = union(&a, &b).unwrap();
        assert_eq!(out.rows(), &[row![NULL, "z"], row![1, "a"], row![2, "b"]]);
    }

    #[test]
    fn test_schema_mismatch() {
        let a = rel("a", vec![]);
        let b = Relation::builder("b")
            .column("id", DataType::Integer)
            .build()
            .unwrap();
        assert!(matches!(union_all(&a, &b), Err(EvalError::SchemaMismatch { .. })));
        let c = Relation::builder("c")
            .column("id", DataType::Text)
            .column("name", DataType::Text)
            .build()
            .unwrap();
        assert!(matches!(union(&a, &c), Err(EvalError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_distinct() {
        let a = rel("a", vec![row![1, "a"], row![1, "a"], row![0, "b"]]);
        assert_eq!(distinct(&a).rows(), &[row![0, "b"], row![1, "a"]]);
    }
}
