//! Join operators.
//!
//! Every join kind outputs the left columns followed by the right columns.
//! Rows come out in left-input order, each followed by its matches in
//! right-input order; outer joins emit exactly one NULL-padded row for an
//! unmatched input row. RIGHT JOIN is computed as the mirrored LEFT JOIN with
//! the column order restored, and FULL JOIN is the LEFT JOIN followed by the
//! unmatched right rows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{EvalError, Result};
use crate::logic::TriBool;
use crate::relation::{Relation, Row};
use crate::value::Value;

/// Join kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    /// INNER JOIN
    Inner,
    /// LEFT OUTER JOIN
    Left,
    /// RIGHT OUTER JOIN
    Right,
    /// FULL OUTER JOIN
    Full,
    /// CROSS JOIN
    Cross,
}

impl JoinKind {
    /// Returns the SQL representation of the join kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// How the evaluator executes joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinStrategy {
    /// Hash join for single-column equi-joins, nested loop otherwise.
    #[default]
    Auto,
    /// Always nested loop.
    NestedLoop,
    /// Hash join whenever the predicate allows it.
    Hash,
}

impl JoinStrategy {
    /// Returns the CLI spelling of the strategy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::NestedLoop => "nested-loop",
            Self::Hash => "hash",
        }
    }
}

/// Joins `left` and `right` with a nested loop.
///
/// `predicate` receives a left row and a right row and keeps the pair when it
/// is definitely true. It is ignored for [`JoinKind::Cross`].
///
/// # Errors
///
/// Returns the first error raised by `predicate`.
pub fn join<P>(left: &Relation, right: &Relation, kind: JoinKind, predicate: P) -> Result<Relation>
where
    P: Fn(&Row, &Row) -> Result<TriBool>,
{
    let rows = match kind {
        JoinKind::Right => {
            let mirrored = assemble(right, left, JoinKind::Left, |r| {
                matching(left, |l| predicate(l, r))
            })?;
            restore_column_order(mirrored, right.schema().len())
        }
        JoinKind::Cross => assemble(left, right, kind, |_| Ok((0..right.len()).collect()))?,
        _ => assemble(left, right, kind, |l| matching(right, |r| predicate(l, r)))?,
    };
    Ok(output(left, right, kind, rows))
}

/// `left CROSS JOIN right`.
#[must_use]
pub fn cross_join(left: &Relation, right: &Relation) -> Relation {
    let rows = left
        .iter()
        .flat_map(|l| right.iter().map(move |r| l.concat(r)))
        .collect();
    output(left, right, JoinKind::Cross, rows)
}

/// Joins on `left[left_key] = right[right_key]` through a hash table.
///
/// Produces the same rows in the same order as [`join`] with the equivalent
/// equality predicate. NULL keys never match.
///
/// # Errors
///
/// Returns a type mismatch when the key columns are not comparable and both
/// sides have rows to compare.
pub fn hash_join(
    left: &Relation,
    right: &Relation,
    kind: JoinKind,
    left_key: usize,
    right_key: usize,
) -> Result<Relation> {
    check_key_types(left, right, left_key, right_key)?;
    let rows = match kind {
        JoinKind::Right => {
            let table = build(left, left_key);
            let mirrored = assemble(right, left, JoinKind::Left, |r| Ok(probe(&table, &r[right_key])))?;
            restore_column_order(mirrored, right.schema().len())
        }
        JoinKind::Cross => assemble(left, right, kind, |_| Ok((0..right.len()).collect()))?,
        _ => {
            let table = build(right, right_key);
            assemble(left, right, kind, |l| Ok(probe(&table, &l[left_key])))?
        }
    };
    trace!(kind = kind.as_str(), rows = rows.len(), "hash join");
    Ok(output(left, right, kind, rows))
}

fn output(left: &Relation, right: &Relation, kind: JoinKind, rows: Vec<Row>) -> Relation {
    trace!(
        kind = kind.as_str(),
        left = left.len(),
        right = right.len(),
        rows = rows.len(),
        "joined"
    );
    Relation::from_trusted(left.name(), left.schema().concat(right.schema()), rows)
}

fn matching<P>(relation: &Relation, predicate: P) -> Result<Vec<usize>>
where
    P: Fn(&Row) -> Result<TriBool>,
{
    let mut found = Vec::new();
    for (i, row) in relation.iter().enumerate() {
        if predicate(row)?.is_true() {
            found.push(i);
        }
    }
    Ok(found)
}

/// Builds output rows for INNER, LEFT, FULL and CROSS joins.
fn assemble<M>(outer: &Relation, inner: &Relation, kind: JoinKind, mut find: M) -> Result<Vec<Row>>
where
    M: FnMut(&Row) -> Result<Vec<usize>>,
{
    let inner_width = inner.schema().len();
    let mut inner_matched = vec![false; inner.len()];
    let mut rows = Vec::new();
    for row in outer {
        let found = find(row)?;
        if found.is_empty() && matches!(kind, JoinKind::Left | JoinKind::Full) {
            rows.push(row.concat(&Row::nulls(inner_width)));
        }
        for j in found {
            inner_matched[j] = true;
            rows.push(row.concat(&inner.rows()[j]));
        }
    }
    if kind == JoinKind::Full {
        let padding = Row::nulls(outer.schema().len());
        for (row, matched) in inner.iter().zip(inner_matched) {
            if !matched {
                rows.push(padding.concat(row));
            }
        }
    }
    Ok(rows)
}

/// Turns `right ++ left` rows back into `left ++ right`.
fn restore_column_order(rows: Vec<Row>, right_width: usize) -> Vec<Row> {
    rows.into_iter()
        .map(|row| {
            let mut values = row.into_values();
            values.rotate_left(right_width);
            Row::new(values)
        })
        .collect()
}

/// Hash key under SQL equality: integral reals meet their integer.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn hash_key(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Real(r) if r.fract() == 0.0 && *r >= i64::MIN as f64 && *r < i64::MAX as f64 => {
            Some(Value::Integer(*r as i64))
        }
        other => Some(other.clone()),
    }
}

fn build(relation: &Relation, key: usize) -> HashMap<Value, Vec<usize>> {
    let mut table: HashMap<Value, Vec<usize>> = HashMap::new();
    for (i, row) in relation.iter().enumerate() {
        if let Some(k) = hash_key(&row[key]) {
            table.entry(k).or_default().push(i);
        }
    }
    table
}

fn probe(table: &HashMap<Value, Vec<usize>>, value: &Value) -> Vec<usize> {
    hash_key(value)
        .and_then(|k| table.get(&k))
        .cloned()
        .unwrap_or_default()
}

fn check_key_types(left: &Relation, right: &Relation, left_key: usize, right_key: usize) -> Result<()> {
    let (Some(l), Some(r)) = (left.schema().column(left_key), right.schema().column(right_key)) else {
        return Err(EvalError::InvalidPlan(String::from("hash join key out of range")));
    };
    let comparable = l.data_type == r.data_type || (l.data_type.is_numeric() && r.data_type.is_numeric());
    let has_keys = |relation: &Relation, key: usize| relation.iter().any(|row| !row[key].is_null());
    if !comparable && has_keys(left, left_key) && has_keys(right, right_key) {
        return Err(EvalError::type_mismatch("=", l.data_type, r.data_type));
    }
    Ok(())
}
