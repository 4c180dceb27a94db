//! Aggregate calls and grouping.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EvalError, Result, Stage};
use crate::eval::{Eval, Scope};
use crate::expr::Expr;
use crate::logic::sql_cmp;
use crate::relation::{ComputedColumn, Relation, Row, Schema};
use crate::value::{DataType, Value};

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunc {
    /// COUNT
    Count,
    /// SUM
    Sum,
    /// MIN
    Min,
    /// MAX
    Max,
    /// AVG
    Avg,
}

impl AggregateFunc {
    /// Returns the SQL name of the function.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
        }
    }
}

/// An aggregate call such as `COUNT(*)` or `SUM(DISTINCT price)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCall {
    /// The function.
    pub func: AggregateFunc,
    /// The argument; `None` means `*`.
    pub arg: Option<Box<Expr>>,
    /// Whether duplicates are discarded before aggregation.
    #[serde(default)]
    pub distinct: bool,
}

impl AggregateCall {
    /// Result type of the call over `schema`.
    #[must_use]
    pub fn type_hint(&self, schema: &Schema) -> Option<DataType> {
        match self.func {
            AggregateFunc::Count => Some(DataType::Integer),
            AggregateFunc::Avg => Some(DataType::Real),
            AggregateFunc::Sum | AggregateFunc::Min | AggregateFunc::Max => {
                self.arg.as_ref().and_then(|arg| arg.type_hint(schema))
            }
        }
    }

    fn accumulator(&self) -> Box<dyn Accumulator> {
        let inner: Box<dyn Accumulator> = match (self.func, &self.arg) {
            (AggregateFunc::Count, None) => return Box::new(CountStar::default()),
            (AggregateFunc::Count, Some(_)) => Box::new(Count::default()),
            (AggregateFunc::Sum, _) => Box::new(Sum::default()),
            (AggregateFunc::Min, _) => Box::new(Extreme::new("MIN", Ordering::Less)),
            (AggregateFunc::Max, _) => Box::new(Extreme::new("MAX", Ordering::Greater)),
            (AggregateFunc::Avg, _) => Box::new(Avg::default()),
        };
        if self.distinct {
            Box::new(Distinct {
                seen: BTreeSet::new(),
                inner,
            })
        } else {
            inner
        }
    }
}

impl fmt::Display for AggregateCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.func.as_str())?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        match &self.arg {
            Some(arg) => write!(f, "{arg})"),
            None => f.write_str("*)"),
        }
    }
}

/// Running state of one aggregate over one group.
pub trait Accumulator {
    /// Feeds one input value.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for values the aggregate cannot combine.
    fn add(&mut self, value: &Value) -> Result<()>;

    /// The aggregate of everything fed so far.
    fn finish(&self) -> Value;
}

fn count_value(n: u64) -> Value {
    Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}

#[derive(Default)]
struct CountStar {
    n: u64,
}

impl Accumulator for CountStar {
    fn add(&mut self, _value: &Value) -> Result<()> {
        self.n += 1;
        Ok(())
    }

    fn finish(&self) -> Value {
        count_value(self.n)
    }
}

#[derive(Default)]
struct Count {
    n: u64,
}

impl Accumulator for Count {
    fn add(&mut self, value: &Value) -> Result<()> {
        if !value.is_null() {
            self.n += 1;
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        count_value(self.n)
    }
}

#[derive(Default)]
struct Sum {
    total: Option<Value>,
}

impl Accumulator for Sum {
    fn add(&mut self, value: &Value) -> Result<()> {
        let next = match (&self.total, value) {
            (_, Value::Null) => return Ok(()),
            (None, v @ (Value::Integer(_) | Value::Real(_))) => v.clone(),
            (Some(Value::Integer(a)), Value::Integer(b)) => a
                .checked_add(*b)
                .map(Value::Integer)
                .ok_or_else(|| EvalError::InvalidPlan(String::from("integer overflow in SUM")))?,
            (Some(total), v) => match (total.as_f64(), v.as_f64()) {
                (Some(a), Some(b)) => Value::Real(a + b),
                _ => {
                    return Err(EvalError::type_mismatch(
                        "SUM",
                        v.data_type().unwrap_or(DataType::Text),
                        DataType::Real,
                    ))
                }
            },
            (None, v) => {
                return Err(EvalError::type_mismatch(
                    "SUM",
                    v.data_type().unwrap_or(DataType::Text),
                    DataType::Real,
                ))
            }
        };
        self.total = Some(next);
        Ok(())
    }

    fn finish(&self) -> Value {
        self.total.clone().unwrap_or(Value::Null)
    }
}

struct Extreme {
    name: &'static str,
    keep: Ordering,
    best: Option<Value>,
}

impl Extreme {
    const fn new(name: &'static str, keep: Ordering) -> Self {
        Self {
            name,
            keep,
            best: None,
        }
    }
}

impl Accumulator for Extreme {
    fn add(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let replace = match &self.best {
            None => true,
            Some(best) => sql_cmp(value, best, self.name)? == Some(self.keep),
        };
        if replace {
            self.best = Some(value.clone());
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        self.best.clone().unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct Avg {
    sum: f64,
    n: u64,
}

impl Accumulator for Avg {
    fn add(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let x = value.as_f64().ok_or_else(|| {
            EvalError::type_mismatch(
                "AVG",
                value.data_type().unwrap_or(DataType::Text),
                DataType::Real,
            )
        })?;
        self.sum += x;
        self.n += 1;
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&self) -> Value {
        if self.n == 0 {
            Value::Null
        } else {
            Value::Real(self.sum / self.n as f64)
        }
    }
}

struct Distinct {
    seen: BTreeSet<Value>,
    inner: Box<dyn Accumulator>,
}

impl Accumulator for Distinct {
    fn add(&mut self, value: &Value) -> Result<()> {
        if value.is_null() || !self.seen.insert(value.clone()) {
            return Ok(());
        }
        self.inner.add(value)
    }

    fn finish(&self) -> Value {
        self.inner.finish()
    }
}

/// Groups `input` by `keys` and computes `calls` per group.
///
/// The output has one row per group, in first-appearance order, holding the
/// key values followed by one column per aggregate call. Key columns that are
/// plain column references keep their source qualifier and name; other keys
/// and the aggregates are named by their SQL rendering, which is how later
/// clauses find them. Without keys there is exactly one group, even when
/// `input` is empty.
pub(crate) fn group(
    input: &Relation,
    keys: &[Expr],
    calls: &[AggregateCall],
    eval: &Eval<'_>,
    outer: Option<&Scope<'_>>,
) -> Result<Relation> {
    let schema = input.schema();
    let mut columns = Vec::with_capacity(keys.len() + calls.len());
    for key in keys {
        columns.push(match key {
            Expr::Column { table, name } => {
                let column = schema
                    .find(table.as_deref(), name)?
                    .and_then(|i| schema.column(i))
                    .ok_or_else(|| {
                        EvalError::invalid_reference(key.to_string(), Stage::GroupBy, "no such column")
                    })?;
                ComputedColumn {
                    qualifier: column.qualifier.clone(),
                    name: column.name.clone(),
                    hint: Some(column.data_type),
                }
            }
            other => ComputedColumn::new(other.to_string(), other.type_hint(schema)),
        });
    }
    for call in calls {
        columns.push(ComputedColumn::new(call.to_string(), call.type_hint(schema)));
    }

    let fresh = || calls.iter().map(AggregateCall::accumulator).collect::<Vec<_>>();
    let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, Vec<Box<dyn Accumulator>>)> = Vec::new();
    if keys.is_empty() {
        index.insert(Vec::new(), 0);
        groups.push((Vec::new(), fresh()));
    }

    for row in input {
        let scope = Scope::new(schema, row, Stage::GroupBy).with_outer(outer);
        let key = keys
            .iter()
            .map(|k| eval.value(k, &scope))
            .collect::<Result<Vec<_>>>()?;
        let slot = if let Some(&slot) = index.get(&key) {
            slot
        } else {
            groups.push((key.clone(), fresh()));
            index.insert(key, groups.len() - 1);
            groups.len() - 1
        };
        for (call, acc) in calls.iter().zip(groups[slot].1.iter_mut()) {
            let value = match &call.arg {
                Some(arg) => eval.value(arg, &scope)?,
                None => Value::Boolean(true),
            };
            acc.add(&value)?;
        }
    }

    debug!(
        relation = input.name(),
        rows = input.len(),
        groups = groups.len(),
        aggregates = calls.len(),
        "grouped rows"
    );

    let rows: Vec<Row> = groups
        .into_iter()
        .map(|(key, accs)| key.into_iter().chain(accs.iter().map(|a| a.finish())).collect())
        .collect();
    Relation::computed(input.name(), columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(call: &AggregateCall, values: &[Value]) -> Result<Value> {
        let mut acc = call.accumulator();
        for v in values {
            acc.add(v)?;
        }
        Ok(acc.finish())
    }

    fn call(func: AggregateFunc, distinct: bool) -> AggregateCall {
        AggregateCall {
            func,
            arg: Some(Box::new(Expr::column("x"))),
            distinct,
        }
    }

    #[test]
    fn test_count_star_counts_nulls() {
        let star = AggregateCall {
            func: AggregateFunc::Count,
            arg: None,
            distinct: false,
        };
        let values = [Value::Null, Value::Integer(1)];
        assert_eq!(run(&star, &values).unwrap(), Value::Integer(2));
        assert_eq!(
            run(&call(AggregateFunc::Count, false), &values).unwrap(),
            Value::Integer(1)
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(run(&call(AggregateFunc::Count, false), &[]).unwrap(), Value::Integer(0));
        for func in [
            AggregateFunc::Sum,
            AggregateFunc::Min,
            AggregateFunc::Max,
            AggregateFunc::Avg,
        ] {
            assert_eq!(run(&call(func, false), &[Value::Null]).unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_sum_widens_to_real() {
        let values = [Value::Integer(1), Value::Real(0.5)];
        assert_eq!(run(&call(AggregateFunc::Sum, false), &values).unwrap(), Value::Real(1.5));
        let ints = [Value::Integer(1), Value::Integer(2)];
        assert_eq!(run(&call(AggregateFunc::Sum, false), &ints).unwrap(), Value::Integer(3));
    }

    #[test]
    fn test_distinct() {
        let values = [Value::Integer(2), Value::Integer(2), Value::Integer(3), Value::Null];
        assert_eq!(run(&call(AggregateFunc::Count, true), &values).unwrap(), Value::Integer(2));
        assert_eq!(run(&call(AggregateFunc::Sum, true), &values).unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_min_max_avg() {
        let values = [Value::Integer(4), Value::Null, Value::Integer(1), Value::Integer(7)];
        assert_eq!(run(&call(AggregateFunc::Min, false), &values).unwrap(), Value::Integer(1));
        assert_eq!(run(&call(AggregateFunc::Max, false), &values).unwrap(), Value::Integer(7));
        assert_eq!(run(&call(AggregateFunc::Avg, false), &values).unwrap(), Value::Real(4.0));
    }

    #[test]
    fn test_sum_of_text_fails() {
        let err = run(&call(AggregateFunc::Sum, false), &[Value::Text(String::from("a"))]).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { .. }));
    }

    #[test]
    fn test_display() {
        assert_eq!(call(AggregateFunc::Sum, true).to_string(), "SUM(DISTINCT x)");
        assert_eq!(call(AggregateFunc::Avg, false).to_string(), "AVG(x)");
    }
}
