//! Query plans and the SELECT builder.
//!
//! A [`QueryPlan`] is the data form of one SELECT: CTEs, a FROM clause with
//! joins, filters, grouping, projection, ordering and limits. Plans
//! serialize with serde and render as SQL text.
//!
//! [`Select`] builds plans with the typestate pattern: joins are only
//! available after FROM, and `build()` only after the SELECT list is given.
//!
//! ```rust
//! use oxide_rel_core::expr::{col, count_star, lit};
//! use oxide_rel_core::plan::Select;
//!
//! let plan = Select::new()
//!     .columns([col("dob").into(), count_star().alias("n")])
//!     .from("users")
//!     .group_by([col("dob")])
//!     .having(count_star().gt(lit(1)))
//!     .build();
//!
//! assert_eq!(
//!     plan.to_string(),
//!     "SELECT dob, COUNT(*) AS n FROM users GROUP BY dob HAVING COUNT(*) > 1"
//! );
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateCall;
use crate::cardinality::Cardinality;
use crate::expr::Expr;
use crate::join::JoinKind;
use crate::relation::Relation;
use crate::set_ops::SetOp;
use crate::value::Value;
use crate::window::WindowCall;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Placement of NULLs in a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullOrdering {
    /// NULLs before every value.
    First,
    /// NULLs after every value.
    Last,
}

impl NullOrdering {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    /// The key expression.
    pub expr: Expr,
    /// Direction.
    #[serde(default)]
    pub direction: OrderDirection,
    /// NULL placement; defaults to last for ASC and first for DESC.
    #[serde(default)]
    pub nulls: Option<NullOrdering>,
}

impl OrderBy {
    /// Places NULLs first.
    #[must_use]
    pub const fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullOrdering::First);
        self
    }

    /// Places NULLs last.
    #[must_use]
    pub const fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullOrdering::Last);
        self
    }

    const fn nulls_sort_first(&self) -> bool {
        match (self.nulls, self.direction) {
            (Some(NullOrdering::First), _) | (None, OrderDirection::Desc) => true,
            (Some(NullOrdering::Last), _) | (None, OrderDirection::Asc) => false,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if self.direction == OrderDirection::Desc {
            write!(f, " {}", self.direction.as_str())?;
        }
        if let Some(nulls) = self.nulls {
            write!(f, " {}", nulls.as_str())?;
        }
        Ok(())
    }
}

/// Compares two key tuples under `specs` (direction and NULL placement).
pub(crate) fn compare_sort_keys(a: &[Value], b: &[Value], specs: &[OrderBy]) -> Ordering {
    for ((x, y), spec) in a.iter().zip(b).zip(specs) {
        let ordering = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if spec.nulls_sort_first() => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if spec.nulls_sort_first() => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match spec.direction {
                OrderDirection::Asc => x.cmp(y),
                OrderDirection::Desc => y.cmp(x),
            },
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// One item of the SELECT list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// `*`: every source column.
    Wildcard,
    /// `t.*`: every column of one source.
    QualifiedWildcard(String),
    /// An expression, optionally named.
    Expr {
        /// The expression.
        expr: Expr,
        /// Output column name.
        #[serde(default)]
        alias: Option<String>,
    },
}

impl Projection {
    /// The expression, if this item is one.
    #[must_use]
    pub const fn expr(&self) -> Option<&Expr> {
        match self {
            Self::Expr { expr, .. } => Some(expr),
            _ => None,
        }
    }
}

impl From<Expr> for Projection {
    fn from(expr: Expr) -> Self {
        Self::Expr { expr, alias: None }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => f.write_str("*"),
            Self::QualifiedWildcard(t) => write!(f, "{t}.*"),
            Self::Expr { expr, alias } => {
                write!(f, "{expr}")?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
        }
    }
}

/// A FROM source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Source {
    /// A catalog relation, view or CTE by name.
    Table {
        /// Name.
        name: String,
        /// Alias.
        #[serde(default)]
        alias: Option<String>,
    },
    /// An inline relation. Not serializable.
    #[serde(skip)]
    Values {
        /// The relation.
        relation: Relation,
        /// Alias.
        alias: Option<String>,
    },
    /// A nested plan.
    Subquery {
        /// The plan.
        query: Box<QueryPlan>,
        /// Alias (required).
        alias: String,
    },
    /// UNION / UNION ALL of two plans.
    SetOperation {
        /// Operator.
        op: SetOp,
        /// Left operand.
        left: Box<QueryPlan>,
        /// Right operand.
        right: Box<QueryPlan>,
        /// Alias (required).
        alias: String,
    },
}

impl Source {
    /// A catalog relation, view or CTE.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table {
            name: name.into(),
            alias: None,
        }
    }

    /// An inline relation.
    #[must_use]
    pub const fn values(relation: Relation) -> Self {
        Self::Values {
            relation,
            alias: None,
        }
    }

    /// A nested plan.
    #[must_use]
    pub fn subquery(query: QueryPlan, alias: impl Into<String>) -> Self {
        Self::Subquery {
            query: Box::new(query),
            alias: alias.into(),
        }
    }

    /// `left UNION right`.
    #[must_use]
    pub fn union(left: QueryPlan, right: QueryPlan, alias: impl Into<String>) -> Self {
        Self::set_operation(SetOp::Union, left, right, alias)
    }

    /// `left UNION ALL right`.
    #[must_use]
    pub fn union_all(left: QueryPlan, right: QueryPlan, alias: impl Into<String>) -> Self {
        Self::set_operation(SetOp::UnionAll, left, right, alias)
    }

    fn set_operation(op: SetOp, left: QueryPlan, right: QueryPlan, alias: impl Into<String>) -> Self {
        Self::SetOperation {
            op,
            left: Box::new(left),
            right: Box::new(right),
            alias: alias.into(),
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn alias(mut self, new_alias: impl Into<String>) -> Self {
        let new_alias = new_alias.into();
        match &mut self {
            Self::Table { alias, .. } | Self::Values { alias, .. } => *alias = Some(new_alias),
            Self::Subquery { alias, .. } | Self::SetOperation { alias, .. } => *alias = new_alias,
        }
        self
    }
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Self::table(name)
    }
}

impl From<Relation> for Source {
    fn from(relation: Relation) -> Self {
        Self::values(relation)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { name, alias } => {
                f.write_str(name)?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
            Self::Values { relation, alias } => {
                f.write_str(relation.name())?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
            Self::Subquery { query, alias } => write!(f, "({query}) AS {alias}"),
            Self::SetOperation {
                op,
                left,
                right,
                alias,
            } => write!(f, "({left} {op} {right}) AS {alias}"),
        }
    }
}

/// One JOIN in a FROM clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    /// Join kind.
    pub kind: JoinKind,
    /// Right-hand source.
    pub source: Source,
    /// ON predicate (absent for CROSS JOIN).
    #[serde(default)]
    pub on: Option<Expr>,
    /// Expected cardinality; a mismatch is logged, not an error.
    #[serde(default)]
    pub cardinality: Option<Cardinality>,
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.source)?;
        if let Some(on) = &self.on {
            write!(f, " ON {on}")?;
        }
        Ok(())
    }
}

/// The FROM clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromClause {
    /// First source.
    pub source: Source,
    /// Joins, applied left to right.
    #[serde(default)]
    pub joins: Vec<JoinClause>,
}

/// A common table expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cte {
    /// Name the CTE is referenced by.
    pub name: String,
    /// Its plan.
    pub query: QueryPlan,
}

/// A SELECT.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPlan {
    /// WITH clause.
    pub with: Vec<Cte>,
    /// FROM clause; without one the query runs over a single empty row.
    pub from: Option<FromClause>,
    /// WHERE predicate.
    pub filter: Option<Expr>,
    /// GROUP BY keys.
    pub group_by: Vec<Expr>,
    /// HAVING predicate.
    pub having: Option<Expr>,
    /// SELECT list; empty means `*`.
    pub projection: Vec<Projection>,
    /// SELECT DISTINCT.
    pub distinct: bool,
    /// ORDER BY keys.
    pub order_by: Vec<OrderBy>,
    /// LIMIT.
    pub limit: Option<u64>,
    /// OFFSET.
    pub offset: Option<u64>,
}

impl QueryPlan {
    /// Expressions of the SELECT list.
    pub fn select_exprs(&self) -> impl Iterator<Item = &Expr> {
        self.projection.iter().filter_map(Projection::expr)
    }

    /// Aliases given in the SELECT list.
    #[must_use]
    pub fn aliases(&self) -> Vec<&str> {
        self.projection
            .iter()
            .filter_map(|p| match p {
                Projection::Expr {
                    alias: Some(alias), ..
                } => Some(alias.as_str()),
                _ => None,
            })
            .collect()
    }

    fn post_group_exprs(&self) -> impl Iterator<Item = &Expr> {
        self.having
            .iter()
            .chain(self.select_exprs())
            .chain(self.order_by.iter().map(|o| &o.expr))
    }

    /// Distinct aggregate calls used by HAVING, SELECT and ORDER BY.
    #[must_use]
    pub fn aggregate_calls(&self) -> Vec<AggregateCall> {
        let mut calls = Vec::new();
        for expr in self.post_group_exprs() {
            expr.collect_aggregates(&mut calls);
        }
        calls
    }

    /// Distinct window calls used by SELECT and ORDER BY.
    #[must_use]
    pub fn window_calls(&self) -> Vec<WindowCall> {
        let mut calls = Vec::new();
        for expr in self.select_exprs().chain(self.order_by.iter().map(|o| &o.expr)) {
            expr.collect_windows(&mut calls);
        }
        calls
    }

    /// Whether the plan groups its rows: it has GROUP BY, HAVING, or any
    /// aggregate call.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty()
            || self.having.is_some()
            || self.post_group_exprs().any(Expr::contains_aggregate)
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

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.with.is_empty() {
            f.write_str("WITH ")?;
            for (i, cte) in self.with.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} AS ({})", cte.name, cte.query)?;
            }
            f.write_str(" ")?;
        }
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        if self.projection.is_empty() {
            f.write_str("*")?;
        } else {
            write_list(f, &self.projection)?;
        }
        if let Some(from) = &self.from {
            write!(f, " FROM {}", from.source)?;
            for join in &from.joins {
                write!(f, " {join}")?;
            }
        }
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {filter}")?;
        }
        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            write_list(f, &self.group_by)?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {having}")?;
        }
        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            write_list(f, &self.order_by)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

// Typestate markers (zero-sized types)

/// Marker: No columns specified yet.
pub struct NoColumns;
/// Marker: Columns have been specified.
pub struct HasColumns;
/// Marker: No FROM clause specified yet.
pub struct NoFrom;
/// Marker: FROM clause has been specified.
pub struct HasFrom;

/// SELECT builder.
///
/// Uses the typestate pattern to ensure that:
/// - `build()` is only available once the SELECT list is specified
/// - joins are only available after FROM is specified
pub struct Select<Cols, From> {
    plan: QueryPlan,
    _state: PhantomData<(Cols, From)>,
}

impl Select<NoColumns, NoFrom> {
    /// Creates a new SELECT builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            plan: QueryPlan::default(),
            _state: PhantomData,
        }
    }
}

impl Default for Select<NoColumns, NoFrom> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cols, From> Select<Cols, From> {
    fn transition<C, F>(self) -> Select<C, F> {
        Select {
            plan: self.plan,
            _state: PhantomData,
        }
    }

    /// Adds a common table expression.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, query: QueryPlan) -> Self {
        self.plan.with.push(Cte {
            name: name.into(),
            query,
        });
        self
    }

    /// Makes this a SELECT DISTINCT.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.plan.distinct = true;
        self
    }

    /// Sets the WHERE predicate.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.plan.filter = Some(predicate);
        self
    }

    /// Sets the GROUP BY keys.
    #[must_use]
    pub fn group_by(mut self, keys: impl IntoIterator<Item = Expr>) -> Self {
        self.plan.group_by = keys.into_iter().collect();
        self
    }

    /// Sets the HAVING predicate.
    #[must_use]
    pub fn having(mut self, predicate: Expr) -> Self {
        self.plan.having = Some(predicate);
        self
    }

    /// Sets the ORDER BY keys.
    #[must_use]
    pub fn order_by(mut self, keys: impl IntoIterator<Item = OrderBy>) -> Self {
        self.plan.order_by = keys.into_iter().collect();
        self
    }

    /// Sets LIMIT.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.plan.limit = Some(limit);
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.plan.offset = Some(offset);
        self
    }
}

// Transition: NoColumns -> HasColumns
impl<From> Select<NoColumns, From> {
    /// Specifies the SELECT list.
    #[must_use]
    pub fn columns(mut self, items: impl IntoIterator<Item = Projection>) -> Select<HasColumns, From> {
        self.plan.projection = items.into_iter().collect();
        self.transition()
    }

    /// Selects all columns (*).
    #[must_use]
    pub fn all(mut self) -> Select<HasColumns, From> {
        self.plan.projection = vec![Projection::Wildcard];
        self.transition()
    }
}

// Transition: NoFrom -> HasFrom
impl<Cols> Select<Cols, NoFrom> {
    /// Specifies the first FROM source.
    #[must_use]
    pub fn from(mut self, source: impl Into<Source>) -> Select<Cols, HasFrom> {
        self.plan.from = Some(FromClause {
            source: source.into(),
            joins: vec![],
        });
        self.transition()
    }
}

impl<Cols> Select<Cols, HasFrom> {
    /// Adds a join.
    #[must_use]
    pub fn join(mut self, kind: JoinKind, source: impl Into<Source>, on: Option<Expr>) -> Self {
        if let Some(from) = &mut self.plan.from {
            from.joins.push(JoinClause {
                kind,
                source: source.into(),
                on,
                cardinality: None,
            });
        }
        self
    }

    /// Adds an INNER JOIN.
    #[must_use]
    pub fn inner_join(self, source: impl Into<Source>, on: Expr) -> Self {
        self.join(JoinKind::Inner, source, Some(on))
    }

    /// Adds a LEFT JOIN.
    #[must_use]
    pub fn left_join(self, source: impl Into<Source>, on: Expr) -> Self {
        self.join(JoinKind::Left, source, Some(on))
    }

    /// Adds a RIGHT JOIN.
    #[must_use]
    pub fn right_join(self, source: impl Into<Source>, on: Expr) -> Self {
        self.join(JoinKind::Right, source, Some(on))
    }

    /// Adds a FULL JOIN.
    #[must_use]
    pub fn full_join(self, source: impl Into<Source>, on: Expr) -> Self {
        self.join(JoinKind::Full, source, Some(on))
    }

    /// Adds a CROSS JOIN.
    #[must_use]
    pub fn cross_join(self, source: impl Into<Source>) -> Self {
        self.join(JoinKind::Cross, source, None)
    }

    /// Declares the expected cardinality of the most recent join.
    #[must_use]
    pub fn expect(mut self, cardinality: Cardinality) -> Self {
        if let Some(join) = self
            .plan
            .from
            .as_mut()
            .and_then(|from| from.joins.last_mut())
        {
            join.cardinality = Some(cardinality);
        }
        self
    }
}

impl<From> Select<HasColumns, From> {
    /// Builds the plan.
    #[must_use]
    pub fn build(self) -> QueryPlan {
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, lit};
    use crate::window::row_number;

    #[test]
    fn test_select_rendering() {
        let plan = Select::new()
            .all()
            .from(Source::table("users").alias("u"))
            .left_join("locations", col("u.id").eq(col("locations.user_id")))
            .filter(col("u.name").is_not_null())
            .order_by([col("u.dob").desc(), col("u.name").asc().nulls_first()])
            .limit(1)
            .offset(2)
            .build();
        assert_eq!(
            plan.to_string(),
            "SELECT * FROM users AS u LEFT JOIN locations ON u.id = locations.user_id \
             WHERE u.name IS NOT NULL ORDER BY u.dob DESC, u.name NULLS FIRST LIMIT 1 OFFSET 2"
        );
    }

    #[test]
    fn test_cte_and_subquery_rendering() {
        let inner = Select::new().columns([lit(1).alias("x")]).build();
        let plan = Select::new()
            .with("one", inner.clone())
            .all()
            .from(Source::subquery(inner, "s"))
            .cross_join("one")
            .build();
        assert_eq!(
            plan.to_string(),
            "WITH one AS (SELECT 1 AS x) SELECT * FROM (SELECT 1 AS x) AS s CROSS JOIN one"
        );
    }

    #[test]
    fn test_aggregate_and_window_collection() {
        let plan = Select::new()
            .columns([
                col("dept").into(),
                crate::expr::count_star().alias("n"),
                Expr::from(row_number().order_by(vec![crate::expr::count_star().desc()])).into(),
            ])
            .from("emp")
            .group_by([col("dept")])
            .build();
        assert!(plan.is_aggregate());
        assert_eq!(plan.aggregate_calls().len(), 1);
        assert_eq!(plan.window_calls().len(), 1);
        assert_eq!(plan.aliases(), vec!["n"]);
    }

    #[test]
    fn test_default_null_placement() {
        let asc = [col("x").asc()];
        let desc = [col("x").desc()];
        let null = [Value::Null];
        let one = [Value::Integer(1)];
        assert_eq!(compare_sort_keys(&null, &one, &asc), Ordering::Greater);
        assert_eq!(compare_sort_keys(&null, &one, &desc), Ordering::Less);
        let first = [col("x").asc().nulls_first()];
        assert_eq!(compare_sort_keys(&null, &one, &first), Ordering::Less);
    }

    #[test]
    fn test_plan_serde_round_trip() {
        let plan = Select::new()
            .columns([col("name").into()])
            .from("users")
            .filter(col("dob").gt(lit(2000)))
            .build();
        let json = serde_json::to_string(&plan).unwrap();
        let back: QueryPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }
}
