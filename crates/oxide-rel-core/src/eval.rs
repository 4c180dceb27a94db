//! Expression evaluation against a row scope.
//!
//! A [`Scope`] is one row of one schema plus an optional link to the scope of
//! the enclosing query. Column lookup tries the innermost scope first and
//! walks outward, which is what makes correlated sub-selects work and why
//! inner names shadow outer ones.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{EvalError, Result, Stage};
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::logic::{self, CompareOp, TriBool};
use crate::relation::{Row, Schema};
use crate::subquery::{self, QueryRunner};
use crate::value::{DataType, Value, DATETIME_FORMAT};

/// One row visible to an expression, plus the scopes enclosing it.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    schema: &'a Schema,
    row: &'a Row,
    outer: Option<&'a Scope<'a>>,
    stage: Stage,
    computed: bool,
    grouped: bool,
}

impl<'a> Scope<'a> {
    /// Creates a scope over `row`, laid out by `schema`.
    #[must_use]
    pub const fn new(schema: &'a Schema, row: &'a Row, stage: Stage) -> Self {
        Self {
            schema,
            row,
            outer: None,
            stage,
            computed: false,
            grouped: false,
        }
    }

    /// Links the scope of the enclosing query.
    #[must_use]
    pub const fn with_outer(mut self, outer: Option<&'a Scope<'a>>) -> Self {
        self.outer = outer;
        self
    }

    /// Marks the row as a group: composite expressions are looked up by
    /// their SQL rendering, and bare columns must be grouping keys.
    #[must_use]
    pub const fn grouped(mut self, grouped: bool) -> Self {
        self.grouped = grouped;
        self.computed = grouped;
        self
    }

    /// Enables lookup of composite expressions by their SQL rendering.
    #[must_use]
    pub const fn with_computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// The clause this scope belongs to.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// The schema of this (innermost) scope.
    #[must_use]
    pub const fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Looks a column up, innermost scope first.
    ///
    /// # Errors
    ///
    /// Returns an ambiguity error when the innermost scope that knows the
    /// name has several matching columns.
    pub fn lookup(&self, table: Option<&str>, name: &str) -> Result<Option<&'a Value>> {
        let row: &'a Row = self.row;
        if let Some(i) = self.schema.find(table, name)? {
            return Ok(row.get(i));
        }
        match self.outer {
            Some(outer) => outer.lookup(table, name),
            None => Ok(None),
        }
    }

    /// Whether a column resolves in this scope or an enclosing one.
    ///
    /// # Errors
    ///
    /// See [`Scope::lookup`].
    pub fn resolves(&self, table: Option<&str>, name: &str) -> Result<bool> {
        Ok(self.lookup(table, name)?.is_some())
    }

    fn any_computed(&self) -> bool {
        self.computed || self.outer.is_some_and(Scope::any_computed)
    }

    /// Looks `expr` up by its rendering `key`, innermost scope first.
    ///
    /// The walk stops at the first scope that owns one of the expression's
    /// column references, so an inner query never reads an outer group key
    /// that happens to share its text.
    fn computed(&self, expr: &Expr, key: &str) -> Result<Option<&'a Value>> {
        let row: &'a Row = self.row;
        if self.computed {
            if let Some(i) = self.schema.find(None, key)? {
                return Ok(row.get(i));
            }
        }
        for (table, name) in expr.column_refs() {
            if self.schema.find(table, name)?.is_some() {
                return Ok(None);
            }
        }
        match self.outer {
            Some(outer) => outer.computed(expr, key),
            None => Ok(None),
        }
    }

    fn unresolved(&self, table: Option<&str>, name: &str) -> EvalError {
        let display = table.map_or_else(|| String::from(name), |t| format!("{t}.{name}"));
        let reason = if self.grouped {
            "column must appear in GROUP BY or be used in an aggregate function"
        } else {
            "no such column"
        };
        EvalError::invalid_reference(display, self.stage, reason)
    }
}

/// Evaluates expressions, running sub-selects through a [`QueryRunner`].
#[derive(Clone, Copy)]
pub struct Eval<'r> {
    runner: &'r dyn QueryRunner,
}

impl<'r> Eval<'r> {
    /// Creates an evaluator.
    #[must_use]
    pub const fn new(runner: &'r dyn QueryRunner) -> Self {
        Self { runner }
    }

    /// Evaluates `expr` to a value.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the expression or a sub-select.
    pub fn value(&self, expr: &Expr, scope: &Scope<'_>) -> Result<Value> {
        if scope.any_computed() && !matches!(expr, Expr::Literal(_) | Expr::Column { .. }) {
            if let Some(v) = scope.computed(expr, &expr.to_string())? {
                return Ok(v.clone());
            }
        }
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Column { table, name } => scope
                .lookup(table.as_deref(), name)?
                .cloned()
                .ok_or_else(|| scope.unresolved(table.as_deref(), name)),
            Expr::Binary { left, op, right } => self.binary(left, *op, right, scope),
            Expr::Unary { op, operand } => {
                let v = self.value(operand, scope)?;
                match op {
                    UnaryOp::Not => Ok((!TriBool::from_value(&v)?).to_value()),
                    UnaryOp::Neg => negate(v),
                }
            }
            Expr::IsNull { expr, negated } => {
                Ok(Value::Boolean(self.value(expr, scope)?.is_null() != *negated))
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let v = self.value(expr, scope)?;
                let low = self.value(low, scope)?;
                let high = self.value(high, scope)?;
                Ok(negate_if(logic::between(&v, &low, &high)?, *negated).to_value())
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let v = self.value(expr, scope)?;
                let items = list
                    .iter()
                    .map(|e| self.value(e, scope))
                    .collect::<Result<Vec<_>>>()?;
                Ok(negate_if(logic::in_list(&v, &items)?, *negated).to_value())
            }
            Expr::InSubquery {
                expr,
                query,
                negated,
            } => {
                let v = self.value(expr, scope)?;
                let found = subquery::eval_in(self.runner, scope, &v, query)?;
                Ok(negate_if(found, *negated).to_value())
            }
            Expr::Exists { query, negated } => Ok(Value::Boolean(
                subquery::eval_exists(self.runner, scope, query)? != *negated,
            )),
            Expr::Subquery(query) => subquery::eval_scalar(self.runner, scope, query),
            Expr::Coalesce(items) => {
                for item in items {
                    let v = self.value(item, scope)?;
                    if !v.is_null() {
                        return Ok(v);
                    }
                }
                Ok(Value::Null)
            }
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                let operand = operand
                    .as_ref()
                    .map(|e| self.value(e, scope))
                    .transpose()?;
                for (when, then) in when_clauses {
                    let hit = match &operand {
                        Some(v) => logic::compare(v, &self.value(when, scope)?, CompareOp::Eq)?,
                        None => self.predicate(when, scope)?,
                    };
                    if hit.is_true() {
                        return self.value(then, scope);
                    }
                }
                else_clause
                    .as_ref()
                    .map_or(Ok(Value::Null), |e| self.value(e, scope))
            }
            Expr::Cast { expr, data_type } => cast(self.value(expr, scope)?, *data_type),
            Expr::Aggregate(_) => Err(EvalError::invalid_reference(
                expr.to_string(),
                scope.stage,
                "aggregate functions are only visible after GROUP BY",
            )),
            Expr::Window(_) => Err(EvalError::invalid_reference(
                expr.to_string(),
                scope.stage,
                "window functions are only visible in SELECT and ORDER BY",
            )),
        }
    }

    /// Evaluates `expr` as a three-valued predicate.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch when the expression is not boolean.
    pub fn predicate(&self, expr: &Expr, scope: &Scope<'_>) -> Result<TriBool> {
        TriBool::from_value(&self.value(expr, scope)?)
    }

    fn binary(&self, left: &Expr, op: BinaryOp, right: &Expr, scope: &Scope<'_>) -> Result<Value> {
        match op {
            BinaryOp::And => {
                let l = self.predicate(left, scope)?;
                if l == TriBool::False {
                    return Ok(Value::Boolean(false));
                }
                Ok(l.and(self.predicate(right, scope)?).to_value())
            }
            BinaryOp::Or => {
                let l = self.predicate(left, scope)?;
                if l == TriBool::True {
                    return Ok(Value::Boolean(true));
                }
                Ok(l.or(self.predicate(right, scope)?).to_value())
            }
            _ => {
                let l = self.value(left, scope)?;
                let r = self.value(right, scope)?;
                if let Some(cmp) = op.compare_op() {
                    return Ok(logic::compare(&l, &r, cmp)?.to_value());
                }
                match op {
                    BinaryOp::Like => Ok(logic::like(&l, &r)?.to_value()),
                    BinaryOp::Concat => Ok(if l.is_null() || r.is_null() {
                        Value::Null
                    } else {
                        Value::Text(format!("{l}{r}"))
                    }),
                    _ => arithmetic(op, &l, &r),
                }
            }
        }
    }
}

fn negate_if(value: TriBool, negated: bool) -> TriBool {
    if negated {
        !value
    } else {
        value
    }
}

fn negate(value: Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Integer(i) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| EvalError::InvalidPlan(format!("integer overflow in -{i}"))),
        Value::Real(r) => Ok(Value::Real(-r)),
        other => {
            let t = other.data_type().unwrap_or(DataType::Text);
            Err(EvalError::type_mismatch("-", t, t))
        }
    }
}

/// Applies an arithmetic operator. NULL in, NULL out; integer operands stay
/// integers (division truncates), anything mixed with Real is Real.
///
/// # Errors
///
/// Returns division by zero, integer overflow (as an invalid plan) or a type
/// mismatch for non-numeric operands.
pub fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Integer(a), Value::Integer(b)) => {
            let (a, b) = (*a, *b);
            if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                BinaryOp::Mod => a.checked_rem(b),
                other => {
                    return Err(EvalError::InvalidPlan(format!(
                        "{} is not an arithmetic operator",
                        other.as_str()
                    )))
                }
            };
            result.map(Value::Integer).ok_or_else(|| {
                EvalError::InvalidPlan(format!("integer overflow in {a} {} {b}", op.as_str()))
            })
        }
        (l, r) => {
            let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
                return Err(EvalError::type_mismatch(
                    op.as_str(),
                    l.data_type().unwrap_or(DataType::Text),
                    r.data_type().unwrap_or(DataType::Text),
                ));
            };
            if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            match op {
                BinaryOp::Add => Ok(Value::Real(a + b)),
                BinaryOp::Sub => Ok(Value::Real(a - b)),
                BinaryOp::Mul => Ok(Value::Real(a * b)),
                BinaryOp::Div => Ok(Value::Real(a / b)),
                BinaryOp::Mod => Ok(Value::Real(a % b)),
                other => Err(EvalError::InvalidPlan(format!(
                    "{} is not an arithmetic operator",
                    other.as_str()
                ))),
            }
        }
    }
}

/// Converts `value` to `target`.
///
/// # Errors
///
/// Returns a type mismatch when the value has no representation in `target`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn cast(value: Value, target: DataType) -> Result<Value> {
    let source = match value.data_type() {
        None => return Ok(Value::Null),
        Some(t) if t == target => return Ok(value),
        Some(t) => t,
    };
    let fail = || EvalError::type_mismatch("CAST", source, target);
    match (value, target) {
        (v, DataType::Text) => Ok(Value::Text(v.to_string())),
        (Value::Integer(i), DataType::Real) => Ok(Value::Real(i as f64)),
        (Value::Real(r), DataType::Integer) => {
            let t = r.trunc();
            if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
                Ok(Value::Integer(t as i64))
            } else {
                Err(fail())
            }
        }
        (Value::Boolean(b), DataType::Integer) => Ok(Value::Integer(i64::from(b))),
        (Value::Integer(i), DataType::Boolean) => Ok(Value::Boolean(i != 0)),
        (Value::Text(s), DataType::Integer) => {
            s.trim().parse().map(Value::Integer).map_err(|_| fail())
        }
        (Value::Text(s), DataType::Real) => s.trim().parse().map(Value::Real).map_err(|_| fail()),
        (Value::Text(s), DataType::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(Value::Boolean(true)),
            "false" | "f" | "0" => Ok(Value::Boolean(false)),
            _ => Err(fail()),
        },
        (Value::Text(s), DataType::DateTime) => parse_datetime(&s).map(Value::DateTime).ok_or_else(fail),
        _ => Err(fail()),
    }
}

/// Parses `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`.
#[must_use]
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{coalesce, col, lit, null};
    use crate::plan::QueryPlan;
    use crate::relation::{Column, Relation};
    use crate::row;

    struct NoQueries;

    impl QueryRunner for NoQueries {
        fn run(&self, _plan: &QueryPlan, _outer: Option<&Scope<'_>>) -> Result<Relation> {
            Err(EvalError::InvalidPlan(String::from("no sub-selects here")))
        }
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Column::qualified("t", "a", DataType::Integer),
            Column::qualified("t", "b", DataType::Integer),
            Column::qualified("t", "s", DataType::Text),
        ])
    }

    fn eval(expr: &Expr, row: &Row) -> Result<Value> {
        let schema = schema();
        let scope = Scope::new(&schema, row, Stage::Select);
        Eval::new(&NoQueries).value(expr, &scope)
    }

    #[test]
    fn test_null_equality_is_unknown() {
        let row = row![1, crate::NULL, "x"];
        assert_eq!(eval(&col("a").eq(col("b")), &row).unwrap(), Value::Null);
        assert_eq!(
            eval(&col("b").is_not_distinct_from(null()), &row).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            eval(&coalesce([null(), col("b"), lit(false)]), &row).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_and_short_circuit_false() {
        let row = row![1, crate::NULL, "x"];
        let e = col("a").eq(lit(2)).and(col("b").eq(lit(1)));
        assert_eq!(eval(&e, &row).unwrap(), Value::Boolean(false));
        let e = col("a").eq(lit(1)).and(col("b").eq(lit(1)));
        assert_eq!(eval(&e, &row).unwrap(), Value::Null);
    }

    #[test]
    fn test_arithmetic() {
        let row = row![7, 2, "x"];
        assert_eq!(eval(&(col("a") / col("b")), &row).unwrap(), Value::Integer(3));
        assert_eq!(eval(&(col("a") % col("b")), &row).unwrap(), Value::Integer(1));
        assert_eq!(eval(&(col("a") * lit(0.5)), &row).unwrap(), Value::Real(3.5));
        assert_eq!(eval(&(col("a") + null()), &row).unwrap(), Value::Null);
        assert_eq!(
            eval(&(col("a") / lit(0)), &row).unwrap_err(),
            EvalError::DivisionByZero
        );
        assert!(matches!(
            eval(&(col("a") + col("s")), &row),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_column() {
        let row = row![1, 2, "x"];
        let err = eval(&col("zzz"), &row).unwrap_err();
        assert!(matches!(err, EvalError::InvalidReference { stage: Stage::Select, .. }));
    }

    #[test]
    fn test_outer_scope_lookup_and_shadowing() {
        let outer_schema = Schema::new(vec![
            Column::qualified("o", "a", DataType::Integer),
            Column::qualified("o", "z", DataType::Integer),
        ]);
        let outer_row = row![100, 5];
        let outer = Scope::new(&outer_schema, &outer_row, Stage::Where);
        let inner_schema = schema();
        let inner_row = row![1, 2, "x"];
        let scope = Scope::new(&inner_schema, &inner_row, Stage::Where).with_outer(Some(&outer));
        let ev = Eval::new(&NoQueries);
        assert_eq!(ev.value(&col("a"), &scope).unwrap(), Value::Integer(1));
        assert_eq!(ev.value(&col("o.a"), &scope).unwrap(), Value::Integer(100));
        assert_eq!(ev.value(&col("z"), &scope).unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_case_and_like() {
        let row = row![1, 2, "anna"];
        let e = Expr::Case {
            operand: None,
            when_clauses: vec![(col("s").like(lit("a%")), lit("a-name"))],
            else_clause: Some(Box::new(lit("other"))),
        };
        assert_eq!(eval(&e, &row).unwrap(), Value::Text(String::from("a-name")));
        let e = Expr::Case {
            operand: Some(Box::new(col("a"))),
            when_clauses: vec![(lit(2), lit("two"))],
            else_clause: None,
        };
        assert_eq!(eval(&e, &row).unwrap(), Value::Null);
    }

    #[test]
    fn test_cast() {
        assert_eq!(cast(Value::Integer(3), DataType::Text).unwrap(), Value::Text(String::from("3")));
        assert_eq!(cast(Value::Real(2.9), DataType::Integer).unwrap(), Value::Integer(2));
        assert_eq!(
            cast(Value::Text(String::from(" 42 ")), DataType::Integer).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(cast(Value::Null, DataType::Integer).unwrap(), Value::Null);
        assert!(cast(Value::Text(String::from("x")), DataType::Real).is_err());
        assert_eq!(
            parse_datetime("2005-03-01"),
            NaiveDate::from_ymd_opt(2005, 3, 1).map(|d| d.and_time(NaiveTime::MIN))
        );
    }

    #[test]
    fn test_aggregate_outside_group_is_rejected() {
        let row = row![1, 2, "x"];
        let err = eval(&crate::expr::count_star(), &row).unwrap_err();
        assert!(matches!(err, EvalError::InvalidReference { .. }));
    }
}
