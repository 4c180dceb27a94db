//! Window functions.
//!
//! A window call partitions the working rows, orders each partition, and
//! computes one value per row. The frame is fixed: from the start of the
//! partition to the last peer of the current row when the window is ordered,
//! and the whole partition otherwise. This is why `LAST_VALUE` over an ordered
//! window returns the current row's peer group, not the end of the partition.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{EvalError, Result, Stage};
use crate::eval::{Eval, Scope};
use crate::expr::Expr;
use crate::plan::{compare_sort_keys, OrderBy};
use crate::relation::{Relation, Schema};
use crate::value::{DataType, Value};

/// Window functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WindowFunc {
    /// Position within the partition, from 1.
    RowNumber,
    /// Rank with gaps after ties.
    Rank,
    /// Rank without gaps.
    DenseRank,
    /// Value at the first row of the frame.
    FirstValue(Box<Expr>),
    /// Value at the last row of the frame.
    LastValue(Box<Expr>),
    /// Value at the n-th (1-based) row of the frame.
    NthValue(Box<Expr>, u64),
    /// Value `offset` rows before the current row.
    Lag {
        /// Argument.
        expr: Box<Expr>,
        /// Distance.
        offset: u64,
        /// Value when no such row exists (NULL if absent).
        default: Option<Box<Expr>>,
    },
    /// Value `offset` rows after the current row.
    Lead {
        /// Argument.
        expr: Box<Expr>,
        /// Distance.
        offset: u64,
        /// Value when no such row exists (NULL if absent).
        default: Option<Box<Expr>>,
    },
}

impl WindowFunc {
    /// Returns the SQL name of the function.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RowNumber => "ROW_NUMBER",
            Self::Rank => "RANK",
            Self::DenseRank => "DENSE_RANK",
            Self::FirstValue(_) => "FIRST_VALUE",
            Self::LastValue(_) => "LAST_VALUE",
            Self::NthValue(..) => "NTH_VALUE",
            Self::Lag { .. } => "LAG",
            Self::Lead { .. } => "LEAD",
        }
    }

    /// Argument expressions, evaluated per row.
    #[must_use]
    pub fn args(&self) -> Vec<&Expr> {
        match self {
            Self::RowNumber | Self::Rank | Self::DenseRank => vec![],
            Self::FirstValue(e) | Self::LastValue(e) | Self::NthValue(e, _) => vec![e.as_ref()],
            Self::Lag { expr, default, .. } | Self::Lead { expr, default, .. } => {
                let mut args = vec![expr.as_ref()];
                if let Some(default) = default {
                    args.push(default.as_ref());
                }
                args
            }
        }
    }

    fn value_arg(&self) -> Option<&Expr> {
        match self {
            Self::RowNumber | Self::Rank | Self::DenseRank => None,
            Self::FirstValue(e) | Self::LastValue(e) | Self::NthValue(e, _) => Some(e.as_ref()),
            Self::Lag { expr, .. } | Self::Lead { expr, .. } => Some(expr.as_ref()),
        }
    }
}

impl fmt::Display for WindowFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.as_str())?;
        match self {
            Self::RowNumber | Self::Rank | Self::DenseRank => {}
            Self::FirstValue(e) | Self::LastValue(e) => write!(f, "{e}")?,
            Self::NthValue(e, n) => write!(f, "{e}, {n}")?,
            Self::Lag {
                expr,
                offset,
                default,
            }
            | Self::Lead {
                expr,
                offset,
                default,
            } => {
                write!(f, "{expr}, {offset}")?;
                if let Some(default) = default {
                    write!(f, ", {default}")?;
                }
            }
        }
        f.write_str(")")
    }
}

/// A window call: `func OVER (PARTITION BY ... ORDER BY ...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowCall {
    /// The function.
    pub func: WindowFunc,
    /// Partition keys.
    #[serde(default)]
    pub partition_by: Vec<Expr>,
    /// Ordering within each partition.
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
}

impl WindowCall {
    /// Creates a call over a single, unordered partition.
    #[must_use]
    pub const fn new(func: WindowFunc) -> Self {
        Self {
            func,
            partition_by: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Sets the partition keys.
    #[must_use]
    pub fn partition_by(mut self, keys: Vec<Expr>) -> Self {
        self.partition_by = keys;
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn order_by(mut self, keys: Vec<OrderBy>) -> Self {
        self.order_by = keys;
        self
    }

    /// Result type of the call over `schema`.
    #[must_use]
    pub fn type_hint(&self, schema: &Schema) -> Option<DataType> {
        match &self.func {
            WindowFunc::RowNumber | WindowFunc::Rank | WindowFunc::DenseRank => {
                Some(DataType::Integer)
            }
            WindowFunc::Lag { expr, default, .. } | WindowFunc::Lead { expr, default, .. } => expr
                .type_hint(schema)
                .or_else(|| default.as_ref().and_then(|d| d.type_hint(schema))),
            other => other.value_arg().and_then(|e| e.type_hint(schema)),
        }
    }
}

impl fmt::Display for WindowCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} OVER (", self.func)?;
        if !self.partition_by.is_empty() {
            f.write_str("PARTITION BY ")?;
            for (i, key) in self.partition_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}")?;
            }
        }
        if !self.order_by.is_empty() {
            if !self.partition_by.is_empty() {
                f.write_str(" ")?;
            }
            f.write_str("ORDER BY ")?;
            for (i, key) in self.order_by.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}")?;
            }
        }
        f.write_str(")")
    }
}

/// ROW_NUMBER().
#[must_use]
pub const fn row_number() -> WindowCall {
    WindowCall::new(WindowFunc::RowNumber)
}

/// RANK().
#[must_use]
pub const fn rank() -> WindowCall {
    WindowCall::new(WindowFunc::Rank)
}

/// DENSE_RANK().
#[must_use]
pub const fn dense_rank() -> WindowCall {
    WindowCall::new(WindowFunc::DenseRank)
}

/// FIRST_VALUE(expr).
#[must_use]
pub fn first_value(expr: Expr) -> WindowCall {
    WindowCall::new(WindowFunc::FirstValue(Box::new(expr)))
}

/// LAST_VALUE(expr).
#[must_use]
pub fn last_value(expr: Expr) -> WindowCall {
    WindowCall::new(WindowFunc::LastValue(Box::new(expr)))
}

/// NTH_VALUE(expr, n), with `n` counted from 1.
#[must_use]
pub fn nth_value(expr: Expr, n: u64) -> WindowCall {
    WindowCall::new(WindowFunc::NthValue(Box::new(expr), n))
}

/// LAG(expr, offset).
#[must_use]
pub fn lag(expr: Expr, offset: u64) -> WindowCall {
    WindowCall::new(WindowFunc::Lag {
        expr: Box::new(expr),
        offset,
        default: None,
    })
}

/// LEAD(expr, offset).
#[must_use]
pub fn lead(expr: Expr, offset: u64) -> WindowCall {
    WindowCall::new(WindowFunc::Lead {
        expr: Box::new(expr),
        offset,
        default: None,
    })
}

struct Entry {
    index: usize,
    order: Vec<Value>,
    arg: Value,
    default: Value,
}

fn to_index(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// Computes `call` for every row of `input`, in input order.
pub(crate) fn compute(
    call: &WindowCall,
    input: &Relation,
    eval: &Eval<'_>,
    grouped: bool,
    outer: Option<&Scope<'_>>,
) -> Result<Vec<Value>> {
    if let WindowFunc::NthValue(_, 0) = call.func {
        return Err(EvalError::InvalidPlan(String::from(
            "NTH_VALUE position must be at least 1",
        )));
    }
    let default_expr = match &call.func {
        WindowFunc::Lag { default, .. } | WindowFunc::Lead { default, .. } => default.as_deref(),
        _ => None,
    };

    let mut slots: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut partitions: Vec<Vec<Entry>> = Vec::new();
    for (index, row) in input.iter().enumerate() {
        let scope = Scope::new(input.schema(), row, Stage::Window)
            .with_outer(outer)
            .grouped(grouped);
        let key = call
            .partition_by
            .iter()
            .map(|e| eval.value(e, &scope))
            .collect::<Result<Vec<_>>>()?;
        let order = call
            .order_by
            .iter()
            .map(|o| eval.value(&o.expr, &scope))
            .collect::<Result<Vec<_>>>()?;
        let arg = match call.func.value_arg() {
            Some(e) => eval.value(e, &scope)?,
            None => Value::Null,
        };
        let default = match default_expr {
            Some(e) => eval.value(e, &scope)?,
            None => Value::Null,
        };
        let entry = Entry {
            index,
            order,
            arg,
            default,
        };
        if let Some(&slot) = slots.get(&key) {
            partitions[slot].push(entry);
        } else {
            slots.insert(key, partitions.len());
            partitions.push(vec![entry]);
        }
    }

    let mut out = vec![Value::Null; input.len()];
    for mut partition in partitions {
        partition.sort_by(|a, b| compare_sort_keys(&a.order, &b.order, &call.order_by));
        fill(call, &partition, &mut out);
    }
    trace!(call = %call, rows = out.len(), "window computed");
    Ok(out)
}

fn fill(call: &WindowCall, partition: &[Entry], out: &mut [Value]) {
    let n = partition.len();
    let ordered = !call.order_by.is_empty();
    let as_value = |i: usize| Value::Integer(i64::try_from(i).unwrap_or(i64::MAX));
    let mut dense = 0;
    let mut start = 0;
    while start < n {
        // Peers share the current row's ORDER BY values; the frame ends at
        // the last of them.
        let mut frame_end = n - 1;
        if ordered {
            frame_end = start;
            while frame_end + 1 < n && partition[frame_end + 1].order == partition[start].order {
                frame_end += 1;
            }
        }
        dense += 1;
        for (q, entry) in partition.iter().enumerate().take(frame_end + 1).skip(start) {
            let value = match &call.func {
                WindowFunc::RowNumber => as_value(q + 1),
                WindowFunc::Rank => as_value(start + 1),
                WindowFunc::DenseRank => as_value(dense),
                WindowFunc::FirstValue(_) => partition[0].arg.clone(),
                WindowFunc::LastValue(_) => partition[frame_end].arg.clone(),
                WindowFunc::NthValue(_, nth) => {
                    let at = to_index(*nth) - 1;
                    if at <= frame_end {
                        partition[at].arg.clone()
                    } else {
                        Value::Null
                    }
                }
                WindowFunc::Lag { offset, .. } => q
                    .checked_sub(to_index(*offset))
                    .map_or_else(|| entry.default.clone(), |i| partition[i].arg.clone()),
                WindowFunc::Lead { offset, .. } => q
                    .checked_add(to_index(*offset))
                    .filter(|&i| i < n)
                    .map_or_else(|| entry.default.clone(), |i| partition[i].arg.clone()),
            };
            out[entry.index] = value;
        }
        start = frame_end + 1;
    }
}
