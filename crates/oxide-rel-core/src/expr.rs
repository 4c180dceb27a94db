//! Expression trees.
//!
//! Expressions are plain data: they can be built with the helpers in this
//! module, serialized with serde, and rendered back to SQL text with
//! `Display`. Rendering is precedence-aware, so `a OR b AND c` and
//! `(a OR b) AND c` print differently.
//!
//! ```rust
//! use oxide_rel_core::expr::{col, lit};
//!
//! let e = col("age").gt(lit(18)).and(col("status").eq(lit("active")));
//! assert_eq!(e.to_string(), "age > 18 AND status = 'active'");
//! ```

use std::fmt;
use std::ops;

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateCall, AggregateFunc};
use crate::logic::CompareOp;
use crate::plan::{OrderBy, OrderDirection, Projection, QueryPlan};
use crate::relation::Schema;
use crate::value::{DataType, ToValue, Value};
use crate::window::WindowCall;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    IsNotDistinctFrom,
    IsDistinctFrom,

    // Logical
    And,
    Or,

    // String
    Concat,
    Like,
}

impl BinaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::IsNotDistinctFrom => "IS NOT DISTINCT FROM",
            Self::IsDistinctFrom => "IS DISTINCT FROM",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Concat => "||",
            Self::Like => "LIKE",
        }
    }

    /// Returns the precedence of the operator (higher = binds tighter).
    #[must_use]
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq
            | Self::NotEq
            | Self::Lt
            | Self::LtEq
            | Self::Gt
            | Self::GtEq
            | Self::IsNotDistinctFrom
            | Self::IsDistinctFrom
            | Self::Like => 4,
            Self::Add | Self::Sub | Self::Concat => 8,
            Self::Mul | Self::Div | Self::Mod => 9,
        }
    }

    /// The comparison this operator performs, if it is one.
    #[must_use]
    pub const fn compare_op(&self) -> Option<CompareOp> {
        match self {
            Self::Eq => Some(CompareOp::Eq),
            Self::NotEq => Some(CompareOp::NotEq),
            Self::Lt => Some(CompareOp::Lt),
            Self::LtEq => Some(CompareOp::LtEq),
            Self::Gt => Some(CompareOp::Gt),
            Self::GtEq => Some(CompareOp::GtEq),
            Self::IsNotDistinctFrom => Some(CompareOp::IsNotDistinctFrom),
            Self::IsDistinctFrom => Some(CompareOp::IsDistinctFrom),
            _ => None,
        }
    }

    /// Whether the operator is `+ - * / %`.
    #[must_use]
    pub const fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }

    const fn is_associative(&self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Add | Self::Mul | Self::Concat)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
    /// Logical NOT
    Not,
}

impl UnaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "NOT",
        }
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A literal value.
    Literal(Value),

    /// A column reference (optionally qualified with a relation name or alias).
    Column {
        /// Relation name or alias (optional).
        table: Option<String>,
        /// Column name.
        name: String,
    },

    /// A binary expression.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },

    /// A unary expression.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },

    /// IS NULL / IS NOT NULL.
    IsNull {
        /// The expression to check.
        expr: Box<Expr>,
        /// Whether this is IS NOT NULL.
        negated: bool,
    },

    /// BETWEEN / NOT BETWEEN.
    Between {
        /// The expression to check.
        expr: Box<Expr>,
        /// Lower bound.
        low: Box<Expr>,
        /// Upper bound.
        high: Box<Expr>,
        /// Whether this is NOT BETWEEN.
        negated: bool,
    },

    /// IN / NOT IN over a list.
    InList {
        /// The expression to check.
        expr: Box<Expr>,
        /// The candidates.
        list: Vec<Expr>,
        /// Whether this is NOT IN.
        negated: bool,
    },

    /// IN / NOT IN over a sub-select.
    InSubquery {
        /// The expression to check.
        expr: Box<Expr>,
        /// Single-column sub-select.
        query: Box<QueryPlan>,
        /// Whether this is NOT IN.
        negated: bool,
    },

    /// EXISTS / NOT EXISTS.
    Exists {
        /// The sub-select.
        query: Box<QueryPlan>,
        /// Whether this is NOT EXISTS.
        negated: bool,
    },

    /// A scalar (possibly correlated) sub-select.
    Subquery(Box<QueryPlan>),

    /// COALESCE(...).
    Coalesce(Vec<Expr>),

    /// CASE expression.
    Case {
        /// The operand (if any).
        operand: Option<Box<Expr>>,
        /// WHEN/THEN clauses.
        when_clauses: Vec<(Expr, Expr)>,
        /// ELSE clause.
        else_clause: Option<Box<Expr>>,
    },

    /// CAST expression.
    Cast {
        /// Expression to cast.
        expr: Box<Expr>,
        /// Target type.
        data_type: DataType,
    },

    /// An aggregate call; only visible from HAVING onwards.
    Aggregate(AggregateCall),

    /// A window call; only visible in SELECT and ORDER BY.
    Window(WindowCall),
}

/// Creates a column reference. `"t.c"` is qualified, `"c"` is not.
#[must_use]
pub fn col(name: &str) -> Expr {
    match name.split_once('.') {
        Some((table, name)) => Expr::qualified_column(table, name),
        None => Expr::column(name),
    }
}

/// Creates a literal.
#[must_use]
pub fn lit<T: ToValue>(value: T) -> Expr {
    Expr::Literal(value.to_value())
}

/// The NULL literal.
#[must_use]
pub const fn null() -> Expr {
    Expr::Literal(Value::Null)
}

/// COALESCE over `exprs`.
#[must_use]
pub fn coalesce(exprs: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Coalesce(exprs.into_iter().collect())
}

/// A scalar sub-select.
#[must_use]
pub fn scalar(query: QueryPlan) -> Expr {
    Expr::Subquery(Box::new(query))
}

/// EXISTS (sub-select).
#[must_use]
pub fn exists(query: QueryPlan) -> Expr {
    Expr::Exists {
        query: Box::new(query),
        negated: false,
    }
}

/// NOT EXISTS (sub-select).
#[must_use]
pub fn not_exists(query: QueryPlan) -> Expr {
    Expr::Exists {
        query: Box::new(query),
        negated: true,
    }
}

/// COUNT(*).
#[must_use]
pub const fn count_star() -> Expr {
    Expr::Aggregate(AggregateCall {
        func: AggregateFunc::Count,
        arg: None,
        distinct: false,
    })
}

fn aggregate(func: AggregateFunc, arg: Expr, distinct: bool) -> Expr {
    Expr::Aggregate(AggregateCall {
        func,
        arg: Some(Box::new(arg)),
        distinct,
    })
}

/// COUNT(expr).
#[must_use]
pub fn count(arg: Expr) -> Expr {
    aggregate(AggregateFunc::Count, arg, false)
}

/// COUNT(DISTINCT expr).
#[must_use]
pub fn count_distinct(arg: Expr) -> Expr {
    aggregate(AggregateFunc::Count, arg, true)
}

/// SUM(expr).
#[must_use]
pub fn sum(arg: Expr) -> Expr {
    aggregate(AggregateFunc::Sum, arg, false)
}

/// MIN(expr).
#[must_use]
pub fn min(arg: Expr) -> Expr {
    aggregate(AggregateFunc::Min, arg, false)
}

/// MAX(expr).
#[must_use]
pub fn max(arg: Expr) -> Expr {
    aggregate(AggregateFunc::Max, arg, false)
}

/// AVG(expr).
#[must_use]
pub fn avg(arg: Expr) -> Expr {
    aggregate(AggregateFunc::Avg, arg, false)
}

impl Expr {
    /// Creates a new column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column {
            table: None,
            name: name.into(),
        }
    }

    /// Creates a new qualified column reference.
    #[must_use]
    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Column {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Creates a binary expression.
    #[must_use]
    pub fn binary(self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// Creates an equality expression.
    #[must_use]
    pub fn eq(self, right: Self) -> Self {
        self.binary(BinaryOp::Eq, right)
    }

    /// Creates an inequality expression.
    #[must_use]
    pub fn not_eq(self, right: Self) -> Self {
        self.binary(BinaryOp::NotEq, right)
    }

    /// Creates a less-than expression.
    #[must_use]
    pub fn lt(self, right: Self) -> Self {
        self.binary(BinaryOp::Lt, right)
    }

    /// Creates a less-than-or-equal expression.
    #[must_use]
    pub fn lt_eq(self, right: Self) -> Self {
        self.binary(BinaryOp::LtEq, right)
    }

    /// Creates a greater-than expression.
    #[must_use]
    pub fn gt(self, right: Self) -> Self {
        self.binary(BinaryOp::Gt, right)
    }

    /// Creates a greater-than-or-equal expression.
    #[must_use]
    pub fn gt_eq(self, right: Self) -> Self {
        self.binary(BinaryOp::GtEq, right)
    }

    /// Creates an IS NOT DISTINCT FROM expression.
    #[must_use]
    pub fn is_not_distinct_from(self, right: Self) -> Self {
        self.binary(BinaryOp::IsNotDistinctFrom, right)
    }

    /// Creates an IS DISTINCT FROM expression.
    #[must_use]
    pub fn is_distinct_from(self, right: Self) -> Self {
        self.binary(BinaryOp::IsDistinctFrom, right)
    }

    /// Creates an AND expression.
    #[must_use]
    pub fn and(self, right: Self) -> Self {
        self.binary(BinaryOp::And, right)
    }

    /// Creates an OR expression.
    #[must_use]
    pub fn or(self, right: Self) -> Self {
        self.binary(BinaryOp::Or, right)
    }

    /// Creates a string concatenation.
    #[must_use]
    pub fn concat(self, right: Self) -> Self {
        self.binary(BinaryOp::Concat, right)
    }

    /// Creates a LIKE expression.
    #[must_use]
    pub fn like(self, pattern: Self) -> Self {
        self.binary(BinaryOp::Like, pattern)
    }

    /// Creates an IS NULL expression.
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// Creates an IS NOT NULL expression.
    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// Creates a BETWEEN expression.
    #[must_use]
    pub fn between(self, low: Self, high: Self) -> Self {
        Self::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    /// Creates a NOT BETWEEN expression.
    #[must_use]
    pub fn not_between(self, low: Self, high: Self) -> Self {
        Self::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: true,
        }
    }

    /// Creates an IN expression.
    #[must_use]
    pub fn in_list(self, list: Vec<Self>) -> Self {
        Self::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    /// Creates a NOT IN expression.
    #[must_use]
    pub fn not_in_list(self, list: Vec<Self>) -> Self {
        Self::InList {
            expr: Box::new(self),
            list,
            negated: true,
        }
    }

    /// Creates an IN (sub-select) expression.
    #[must_use]
    pub fn in_subquery(self, query: QueryPlan) -> Self {
        Self::InSubquery {
            expr: Box::new(self),
            query: Box::new(query),
            negated: false,
        }
    }

    /// Creates a NOT IN (sub-select) expression.
    #[must_use]
    pub fn not_in_subquery(self, query: QueryPlan) -> Self {
        Self::InSubquery {
            expr: Box::new(self),
            query: Box::new(query),
            negated: true,
        }
    }

    /// Creates a CAST expression.
    #[must_use]
    pub fn cast(self, data_type: DataType) -> Self {
        Self::Cast {
            expr: Box::new(self),
            data_type,
        }
    }

    /// Names the expression in a SELECT list.
    #[must_use]
    pub fn alias(self, alias: impl Into<String>) -> Projection {
        Projection::Expr {
            expr: self,
            alias: Some(alias.into()),
        }
    }

    /// Ascending ORDER BY key.
    #[must_use]
    pub const fn asc(self) -> OrderBy {
        OrderBy {
            expr: self,
            direction: OrderDirection::Asc,
            nulls: None,
        }
    }

    /// Descending ORDER BY key.
    #[must_use]
    pub const fn desc(self) -> OrderBy {
        OrderBy {
            expr: self,
            direction: OrderDirection::Desc,
            nulls: None,
        }
    }

    /// Visits this expression and its sub-expressions, pre-order.
    ///
    /// `f` returns whether to descend into the node's children. Sub-selects
    /// are a different query level and are never entered.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Self) -> bool) {
        if !f(self) {
            return;
        }
        match self {
            Self::Literal(_) | Self::Column { .. } | Self::Exists { .. } | Self::Subquery(_) => {}
            Self::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Self::Unary { operand, .. } => operand.walk(f),
            Self::IsNull { expr, .. } | Self::InSubquery { expr, .. } | Self::Cast { expr, .. } => {
                expr.walk(f);
            }
            Self::Between { expr, low, high, .. } => {
                expr.walk(f);
                low.walk(f);
                high.walk(f);
            }
            Self::InList { expr, list, .. } => {
                expr.walk(f);
                for item in list {
                    item.walk(f);
                }
            }
            Self::Coalesce(items) => {
                for item in items {
                    item.walk(f);
                }
            }
            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(operand) = operand {
                    operand.walk(f);
                }
                for (when, then) in when_clauses {
                    when.walk(f);
                    then.walk(f);
                }
                if let Some(else_clause) = else_clause {
                    else_clause.walk(f);
                }
            }
            Self::Aggregate(call) => {
                if let Some(arg) = &call.arg {
                    arg.walk(f);
                }
            }
            Self::Window(call) => {
                for arg in call.func.args() {
                    arg.walk(f);
                }
                for key in &call.partition_by {
                    key.walk(f);
                }
                for key in &call.order_by {
                    key.expr.walk(f);
                }
            }
        }
    }

    /// Whether an aggregate call appears at this query level.
    #[must_use]
    pub fn contains_aggregate(&self) -> bool {
        self.first_aggregate().is_some()
    }

    /// The first aggregate call at this query level, if any.
    #[must_use]
    pub fn first_aggregate(&self) -> Option<&AggregateCall> {
        let mut found = None;
        self.walk(&mut |e| {
            if found.is_some() {
                return false;
            }
            if let Self::Aggregate(call) = e {
                found = Some(call);
                return false;
            }
            true
        });
        found
    }

    /// Whether a window call appears at this query level.
    #[must_use]
    pub fn contains_window(&self) -> bool {
        self.first_window().is_some()
    }

    /// The first window call at this query level, if any.
    #[must_use]
    pub fn first_window(&self) -> Option<&WindowCall> {
        let mut found = None;
        self.walk(&mut |e| {
            if found.is_some() {
                return false;
            }
            if let Self::Window(call) = e {
                found = Some(call);
                return false;
            }
            true
        });
        found
    }

    /// Appends every distinct aggregate call at this query level to `out`.
    pub fn collect_aggregates(&self, out: &mut Vec<AggregateCall>) {
        self.walk(&mut |e| {
            if let Self::Aggregate(call) = e {
                if !out.contains(call) {
                    out.push(call.clone());
                }
                return false;
            }
            true
        });
    }

    /// Appends every distinct window call at this query level to `out`.
    pub fn collect_windows(&self, out: &mut Vec<WindowCall>) {
        self.walk(&mut |e| {
            if let Self::Window(call) = e {
                if !out.contains(call) {
                    out.push(call.clone());
                }
                return false;
            }
            true
        });
    }

    /// Column references at this query level, outside aggregate and window
    /// calls.
    #[must_use]
    pub fn column_refs(&self) -> Vec<(Option<&str>, &str)> {
        let mut refs = vec![];
        self.walk(&mut |e| match e {
            Self::Column { table, name } => {
                refs.push((table.as_deref(), name.as_str()));
                false
            }
            Self::Aggregate(_) | Self::Window(_) => false,
            _ => true,
        });
        refs
    }

    /// Best-effort static type of the expression over `schema`.
    ///
    /// Used as the type of computed columns whose values are all NULL.
    #[must_use]
    pub fn type_hint(&self, schema: &Schema) -> Option<DataType> {
        if !matches!(self, Self::Literal(_) | Self::Column { .. }) {
            if let Ok(Some(i)) = schema.find(None, &self.to_string()) {
                return schema.column(i).map(|c| c.data_type);
            }
        }
        match self {
            Self::Literal(v) => v.data_type(),
            Self::Column { table, name } => schema
                .find(table.as_deref(), name)
                .ok()
                .flatten()
                .and_then(|i| schema.column(i))
                .map(|c| c.data_type),
            Self::Binary { left, op, right } => {
                if op.is_arithmetic() {
                    match (left.type_hint(schema), right.type_hint(schema)) {
                        (Some(a), Some(b)) => a.unify(b),
                        (a, b) => a.or(b),
                    }
                } else if *op == BinaryOp::Concat {
                    Some(DataType::Text)
                } else {
                    Some(DataType::Boolean)
                }
            }
            Self::Unary {
                op: UnaryOp::Neg,
                operand,
            } => operand.type_hint(schema),
            Self::Unary { op: UnaryOp::Not, .. }
            | Self::IsNull { .. }
            | Self::Between { .. }
            | Self::InList { .. }
            | Self::InSubquery { .. }
            | Self::Exists { .. } => Some(DataType::Boolean),
            Self::Subquery(_) => None,
            Self::Coalesce(items) => items.iter().find_map(|e| e.type_hint(schema)),
            Self::Case {
                when_clauses,
                else_clause,
                ..
            } => when_clauses
                .iter()
                .find_map(|(_, then)| then.type_hint(schema))
                .or_else(|| else_clause.as_ref().and_then(|e| e.type_hint(schema))),
            Self::Cast { data_type, .. } => Some(*data_type),
            Self::Aggregate(call) => call.type_hint(schema),
            Self::Window(call) => call.type_hint(schema),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Binary { op, .. } => op.precedence(),
            Self::Unary { op: UnaryOp::Not, .. } => 3,
            Self::IsNull { .. }
            | Self::Between { .. }
            | Self::InList { .. }
            | Self::InSubquery { .. } => 4,
            Self::Unary { op: UnaryOp::Neg, .. } => 10,
            _ => u8::MAX,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.write_str(&v.to_sql_inline()),
            Self::Column { table, name } => match table {
                Some(t) => write!(f, "{t}.{name}"),
                None => f.write_str(name),
            },
            Self::Binary { left, op, right } => {
                let p = op.precedence();
                left.fmt_operand(f, p)?;
                write!(f, " {} ", op.as_str())?;
                // Right operands of the same precedence need parentheses
                // unless the operator is associative.
                let right_min = if op.is_associative() && right.precedence() == p {
                    match right.as_ref() {
                        Self::Binary { op: inner, .. } if inner == op => p,
                        _ => p + 1,
                    }
                } else {
                    p + 1
                };
                right.fmt_operand(f, right_min)
            }
            Self::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                f.write_str("NOT ")?;
                operand.fmt_operand(f, 3)
            }
            Self::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                f.write_str("-")?;
                operand.fmt_operand(f, 10)
            }
            Self::IsNull { expr, negated } => {
                expr.fmt_operand(f, 5)?;
                f.write_str(if *negated { " IS NOT NULL" } else { " IS NULL" })
            }
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                expr.fmt_operand(f, 5)?;
                f.write_str(if *negated { " NOT BETWEEN " } else { " BETWEEN " })?;
                low.fmt_operand(f, 5)?;
                f.write_str(" AND ")?;
                high.fmt_operand(f, 5)
            }
            Self::InList {
                expr,
                list,
                negated,
            } => {
                expr.fmt_operand(f, 5)?;
                f.write_str(if *negated { " NOT IN (" } else { " IN (" })?;
                write_list(f, list)?;
                f.write_str(")")
            }
            Self::InSubquery {
                expr,
                query,
                negated,
            } => {
                expr.fmt_operand(f, 5)?;
                write!(f, "{} ({query})", if *negated { " NOT IN" } else { " IN" })
            }
            Self::Exists { query, negated } => {
                write!(f, "{}EXISTS ({query})", if *negated { "NOT " } else { "" })
            }
            Self::Subquery(query) => write!(f, "({query})"),
            Self::Coalesce(items) => {
                f.write_str("COALESCE(")?;
                write_list(f, items)?;
                f.write_str(")")
            }
            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                f.write_str("CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {operand}")?;
                }
                for (when, then) in when_clauses {
                    write!(f, " WHEN {when} THEN {then}")?;
                }
                if let Some(else_clause) = else_clause {
                    write!(f, " ELSE {else_clause}")?;
                }
                f.write_str(" END")
            }
            Self::Cast { expr, data_type } => write!(f, "CAST({expr} AS {data_type})"),
            Self::Aggregate(call) => write!(f, "{call}"),
            Self::Window(call) => write!(f, "{call}"),
        }
    }
}

impl From<AggregateCall> for Expr {
    fn from(call: AggregateCall) -> Self {
        Self::Aggregate(call)
    }
}

impl From<WindowCall> for Expr {
    fn from(call: WindowCall) -> Self {
        Self::Window(call)
    }
}

impl ops::Not for Expr {
    type Output = Self;

    fn not(self) -> Self {
        Self::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

impl ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self {
        Self::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(self),
        }
    }
}

macro_rules! impl_arith_op {
    ($($trait:ident :: $method:ident => $op:ident),+ $(,)?) => {
        $(
            impl ops::$trait for Expr {
                type Output = Self;

                fn $method(self, rhs: Self) -> Self {
                    self.binary(BinaryOp::$op, rhs)
                }
            }
        )+
    };
}

impl_arith_op!(
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
    Rem::rem => Mod,
);
