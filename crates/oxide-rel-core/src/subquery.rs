//! Sub-select evaluation.
//!
//! Sub-selects run once per outer row, with the outer row visible to the
//! inner query for correlation.

use tracing::trace;

use crate::error::{EvalError, Result};
use crate::eval::Scope;
use crate::logic::{self, TriBool};
use crate::plan::QueryPlan;
use crate::relation::Relation;
use crate::value::Value;

/// Runs nested query plans on behalf of the expression evaluator.
pub trait QueryRunner {
    /// Evaluates `plan` with `outer` visible to its expressions.
    ///
    /// # Errors
    ///
    /// Returns any error raised while evaluating the plan.
    fn run(&self, plan: &QueryPlan, outer: Option<&Scope<'_>>) -> Result<Relation>;
}

fn single_column(relation: Relation, context: &str) -> Result<Relation> {
    match relation.schema().len() {
        1 => Ok(relation),
        n => Err(EvalError::InvalidPlan(format!(
            "{context} must return exactly one column, got {n}"
        ))),
    }
}

/// Evaluates a scalar sub-select.
///
/// Zero rows yield NULL and one row yields its value.
///
/// # Errors
///
/// Returns [`EvalError::Cardinality`] when the sub-select produces more than
/// one row and [`EvalError::InvalidPlan`] when it has more than one column.
pub fn eval_scalar(runner: &dyn QueryRunner, outer: &Scope<'_>, plan: &QueryPlan) -> Result<Value> {
    let relation = single_column(runner.run(plan, Some(outer))?, "scalar sub-select")?;
    trace!(rows = relation.len(), "scalar sub-select evaluated");
    match relation.rows() {
        [] => Ok(Value::Null),
        [row] => Ok(row[0].clone()),
        rows => Err(EvalError::Cardinality { rows: rows.len() }),
    }
}

/// Evaluates `EXISTS (plan)`. Never unknown.
///
/// # Errors
///
/// Returns any error raised while evaluating the plan.
pub fn eval_exists(runner: &dyn QueryRunner, outer: &Scope<'_>, plan: &QueryPlan) -> Result<bool> {
    Ok(!runner.run(plan, Some(outer))?.is_empty())
}

/// Evaluates `probe IN (plan)` with the same NULL rules as an IN list.
///
/// # Errors
///
/// Returns [`EvalError::InvalidPlan`] when the sub-select has more than one
/// column, or a type mismatch for incomparable values.
pub fn eval_in(
    runner: &dyn QueryRunner,
    outer: &Scope<'_>,
    probe: &Value,
    plan: &QueryPlan,
) -> Result<TriBool> {
    let relation = single_column(runner.run(plan, Some(outer))?, "IN sub-select")?;
    logic::in_list(probe, relation.rows().iter().map(|row| &row[0]))
}
