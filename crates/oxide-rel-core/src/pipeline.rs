//! The clause pipeline.
//!
//! A plan runs through a fixed sequence of [`Clause`] states, each consuming
//! the working relation the previous one produced:
//!
//! FROM/JOIN, WHERE, GROUP BY, HAVING, WINDOW, SELECT, DISTINCT, ORDER BY,
//! LIMIT/OFFSET.
//!
//! Nested plans (FROM sub-selects, set operations, views, CTEs and
//! expression sub-selects) run through the same pipeline with their own
//! working state. Column lookups fall through to the enclosing query's
//! current row, which is how correlation works.

use std::cell::Cell;

use tracing::{debug, trace, warn};

use crate::aggregate;
use crate::cardinality::Cardinality;
use crate::catalog::Catalog;
use crate::error::{EvalError, Result, Stage};
use crate::eval::{Eval, Scope};
use crate::expr::{BinaryOp, Expr};
use crate::join::{self, JoinKind, JoinStrategy};
use crate::logic::TriBool;
use crate::plan::{compare_sort_keys, JoinClause, Projection, QueryPlan, Source};
use crate::relation::{Column, ComputedColumn, Relation, Row, Schema};
use crate::set_ops;
use crate::subquery::QueryRunner;
use crate::value::{DataType, Value};
use crate::window;

/// Maximum nesting of sub-selects, views and CTEs.
pub const MAX_DEPTH: usize = 64;

const NO_SUCH_COLUMN: &str = "no such column";
const NOT_GROUPED: &str = "column must appear in GROUP BY or be used in an aggregate function";
const NOT_PROJECTED: &str = "ORDER BY terms of SELECT DISTINCT must appear in the select list";
const ALIAS_NOT_VISIBLE: &str = "select-list aliases are not visible in this clause";

/// Pipeline states, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clause {
    /// FROM and JOIN.
    From,
    /// WHERE.
    Where,
    /// GROUP BY (also entered for aggregates without GROUP BY).
    GroupBy,
    /// HAVING.
    Having,
    /// Window computation.
    Window,
    /// SELECT list.
    Select,
    /// DISTINCT.
    Distinct,
    /// ORDER BY.
    OrderBy,
    /// LIMIT / OFFSET.
    Limit,
}

impl Clause {
    /// Every clause, in evaluation order.
    pub const ORDER: [Self; 9] = [
        Self::From,
        Self::Where,
        Self::GroupBy,
        Self::Having,
        Self::Window,
        Self::Select,
        Self::Distinct,
        Self::OrderBy,
        Self::Limit,
    ];

    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::Window => "WINDOW",
            Self::Select => "SELECT",
            Self::Distinct => "DISTINCT",
            Self::OrderBy => "ORDER BY",
            Self::Limit => "LIMIT",
        }
    }
}

/// Evaluation options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalOptions {
    /// How joins with an ON predicate are executed.
    pub join_strategy: JoinStrategy,
}

/// Evaluates plans against a catalog.
///
/// # Example
///
/// ```rust
/// use oxide_rel_core::catalog::Catalog;
/// use oxide_rel_core::expr::col;
/// use oxide_rel_core::pipeline::Evaluator;
/// use oxide_rel_core::plan::Select;
/// use oxide_rel_core::relation::Relation;
/// use oxide_rel_core::row;
/// use oxide_rel_core::value::DataType;
///
/// let mut catalog = Catalog::new();
/// catalog
///     .register(
///         Relation::builder("users")
///             .column("name", DataType::Text)
///             .rows([row!["ann"], row!["bob"]])
///             .build()
///             .unwrap(),
///     )
///     .unwrap();
///
/// let plan = Select::new()
///     .columns([col("name").into()])
///     .from("users")
///     .order_by([col("name").desc()])
///     .build();
/// let result = Evaluator::new(&catalog).evaluate(&plan).unwrap();
/// assert_eq!(result.rows()[0], row!["bob"]);
/// ```
pub struct Evaluator<'c> {
    catalog: &'c Catalog,
    options: EvalOptions,
    depth: Cell<usize>,
}

impl<'c> Evaluator<'c> {
    /// Creates an evaluator with default options.
    #[must_use]
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            options: EvalOptions::default(),
            depth: Cell::new(0),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub const fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    /// The options in use.
    #[must_use]
    pub const fn options(&self) -> EvalOptions {
        self.options
    }

    /// Evaluates `plan`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any clause or nested plan.
    pub fn evaluate(&self, plan: &QueryPlan) -> Result<Relation> {
        debug!(
            plan = %plan,
            strategy = self.options.join_strategy.as_str(),
            "evaluating plan"
        );
        let result = self.run(plan, None, None)?;
        debug!(rows = result.len(), columns = result.schema().len(), "plan evaluated");
        Ok(result)
    }

    fn run(&self, plan: &QueryPlan, env: Option<&Env<'_>>, outer: Option<&Scope<'_>>) -> Result<Relation> {
        let depth = self.depth.get();
        if depth >= MAX_DEPTH {
            return Err(EvalError::InvalidPlan(format!(
                "query nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        self.depth.set(depth + 1);
        let result = self.run_level(plan, env, outer);
        self.depth.set(depth);
        result
    }

    fn run_level(
        &self,
        plan: &QueryPlan,
        parent: Option<&Env<'_>>,
        outer: Option<&Scope<'_>>,
    ) -> Result<Relation> {
        validate(plan)?;

        let mut env = Env {
            bindings: Vec::with_capacity(plan.with.len()),
            parent,
        };
        for cte in &plan.with {
            let relation = self.run(&cte.query, Some(&env), outer)?;
            debug!(cte = %cte.name, rows = relation.len(), "bound common table expression");
            env.bindings
                .push((cte.name.clone(), relation.aliased(&cte.name)));
        }

        let frame = Frame {
            evaluator: self,
            env: &env,
        };
        let mut pipeline = Pipeline {
            evaluator: self,
            plan,
            env: &env,
            eval: Eval::new(&frame),
            outer,
            aliases: plan.aliases(),
            input: dual(),
            base_width: 0,
            grouped: false,
            windowed: false,
            columns: Vec::new(),
            rows: Vec::new(),
        };
        for clause in Clause::ORDER {
            pipeline.step(clause)?;
            trace!(
                clause = clause.as_str(),
                rows = pipeline.rows_so_far(clause),
                "clause evaluated"
            );
        }
        pipeline.finish()
    }
}

/// Evaluates `plan` against an empty catalog.
///
/// # Errors
///
/// See [`Evaluator::evaluate`].
pub fn evaluate(plan: &QueryPlan) -> Result<Relation> {
    Evaluator::new(&Catalog::new()).evaluate(plan)
}

/// CTE bindings visible to a query level and the levels nested in it.
struct Env<'p> {
    bindings: Vec<(String, Relation)>,
    parent: Option<&'p Env<'p>>,
}

impl Env<'_> {
    fn get(&self, name: &str) -> Option<&Relation> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, relation)| relation)
            .or_else(|| self.parent.and_then(|p| p.get(name)))
    }
}

/// Runs expression sub-selects with the CTEs of the current level in scope.
struct Frame<'a> {
    evaluator: &'a Evaluator<'a>,
    env: &'a Env<'a>,
}

impl QueryRunner for Frame<'_> {
    fn run(&self, plan: &QueryPlan, outer: Option<&Scope<'_>>) -> Result<Relation> {
        self.evaluator.run(plan, Some(self.env), outer)
    }
}

/// The single-row, zero-column relation a FROM-less query selects from.
fn dual() -> Relation {
    Relation::from_trusted("dual", Schema::default(), vec![Row::default()])
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

enum Item<'p> {
    Column(usize),
    Expr(&'p Expr),
}

/// Working state of one query level.
struct Pipeline<'a> {
    evaluator: &'a Evaluator<'a>,
    plan: &'a QueryPlan,
    env: &'a Env<'a>,
    eval: Eval<'a>,
    outer: Option<&'a Scope<'a>>,
    aliases: Vec<&'a str>,
    /// Source rows: joined, then grouped, then extended with window columns.
    input: Relation,
    /// Number of source columns `*` expands to.
    base_width: usize,
    grouped: bool,
    windowed: bool,
    /// Output columns and rows, each row tagged with its source row until
    /// DISTINCT merges them.
    columns: Vec<ComputedColumn>,
    rows: Vec<(Option<usize>, Row)>,
}

impl Pipeline<'_> {
    fn step(&mut self, clause: Clause) -> Result<()> {
        let plan = self.plan;
        match clause {
            Clause::From => {
                self.input = self.from()?;
                self.base_width = self.input.schema().len();
            }
            Clause::Where => {
                if let Some(filter) = &plan.filter {
                    self.refs(Stage::Where, &[self.input.schema()], NO_SUCH_COLUMN, false)
                        .check(filter)?;
                    self.input = self.filter(filter, Stage::Where)?;
                }
            }
            Clause::GroupBy => {
                if plan.is_aggregate() {
                    let schemas = [self.input.schema()];
                    let refs = self.refs(Stage::GroupBy, &schemas, NO_SUCH_COLUMN, false);
                    for key in &plan.group_by {
                        refs.check(key)?;
                    }
                    let calls = plan.aggregate_calls();
                    self.input =
                        aggregate::group(&self.input, &plan.group_by, &calls, &self.eval, self.outer)?;
                    self.grouped = true;
                    self.base_width = plan.group_by.len();
                }
            }
            Clause::Having => {
                if let Some(having) = &plan.having {
                    self.refs(Stage::Having, &[self.input.schema()], NOT_GROUPED, true)
                        .check(having)?;
                    self.input = self.filter(having, Stage::Having)?;
                }
            }
            Clause::Window => self.window()?,
            Clause::Select => self.select()?,
            Clause::Distinct => {
                if plan.distinct {
                    let rows = std::mem::take(&mut self.rows)
                        .into_iter()
                        .map(|(_, row)| row)
                        .collect();
                    self.rows = set_ops::dedup_sorted(rows)
                        .into_iter()
                        .map(|row| (None, row))
                        .collect();
                }
            }
            Clause::OrderBy => self.order_by()?,
            Clause::Limit => {
                if plan.limit.is_some() || plan.offset.is_some() {
                    let offset = to_usize(plan.offset.unwrap_or(0));
                    let limit = plan.limit.map_or(usize::MAX, to_usize);
                    self.rows = std::mem::take(&mut self.rows)
                        .into_iter()
                        .skip(offset)
                        .take(limit)
                        .collect();
                }
            }
        }
        Ok(())
    }

    fn rows_so_far(&self, clause: Clause) -> usize {
        match clause {
            Clause::From | Clause::Where | Clause::GroupBy | Clause::Having | Clause::Window => {
                self.input.len()
            }
            _ => self.rows.len(),
        }
    }

    fn finish(self) -> Result<Relation> {
        let rows = self.rows.into_iter().map(|(_, row)| row).collect();
        Relation::computed(self.input.name(), self.columns, rows)
    }

    fn refs<'r>(
        &'r self,
        stage: Stage,
        schemas: &'r [&'r Schema],
        reason: &'static str,
        computed: bool,
    ) -> Refs<'r> {
        Refs {
            schemas,
            outer: self.outer,
            stage,
            aliases: &self.aliases,
            reason,
            computed,
        }
    }

    /// A scope over one working row.
    fn scope<'s>(&'s self, row: &'s Row, stage: Stage) -> Scope<'s> {
        let scope = Scope::new(self.input.schema(), row, stage)
            .with_outer(self.outer)
            .grouped(self.grouped);
        if self.windowed {
            scope.with_computed()
        } else {
            scope
        }
    }

    fn filter(&self, predicate: &Expr, stage: Stage) -> Result<Relation> {
        let mut kept = Vec::new();
        for row in &self.input {
            if self.eval.predicate(predicate, &self.scope(row, stage))?.is_true() {
                kept.push(row.clone());
            }
        }
        trace!(
            stage = stage.as_str(),
            before = self.input.len(),
            after = kept.len(),
            "filtered rows"
        );
        Ok(Relation::from_trusted(
            self.input.name(),
            self.input.schema().clone(),
            kept,
        ))
    }

    fn from(&self) -> Result<Relation> {
        let Some(from) = &self.plan.from else {
            return Ok(dual());
        };
        let mut left = self.source(&from.source)?;
        for clause in &from.joins {
            let right = self.source(&clause.source)?;
            left = self.join(&left, &right, clause)?;
        }
        Ok(left)
    }

    fn source(&self, source: &Source) -> Result<Relation> {
        match source {
            Source::Table { name, alias } => {
                let qualifier = alias.as_deref().unwrap_or(name);
                if let Some(relation) = self.env.get(name) {
                    return Ok(relation.aliased(qualifier));
                }
                if let Some(relation) = self.evaluator.catalog.relation(name) {
                    return Ok(relation.aliased(qualifier));
                }
                if let Some(view) = self.evaluator.catalog.view(name) {
                    debug!(view = %name, "expanding view");
                    return Ok(self.evaluator.run(view, None, None)?.aliased(qualifier));
                }
                Err(EvalError::UnknownRelation(name.clone()))
            }
            Source::Values { relation, alias } => Ok(match alias {
                Some(alias) => relation.aliased(alias),
                None => relation.clone(),
            }),
            Source::Subquery { query, alias } => Ok(self
                .evaluator
                .run(query, Some(self.env), self.outer)?
                .aliased(alias)),
            Source::SetOperation {
                op,
                left,
                right,
                alias,
            } => {
                let left = self.evaluator.run(left, Some(self.env), self.outer)?;
                let right = self.evaluator.run(right, Some(self.env), self.outer)?;
                Ok(set_ops::apply(*op, &left, &right)?.aliased(alias))
            }
        }
    }

    fn join(&self, left: &Relation, right: &Relation, clause: &JoinClause) -> Result<Relation> {
        let Some(on) = &clause.on else {
            return Ok(join::cross_join(left, right));
        };
        let schema = left.schema().concat(right.schema());
        Refs {
            schemas: &[&schema],
            outer: self.outer,
            stage: Stage::JoinOn,
            aliases: &[],
            reason: NO_SUCH_COLUMN,
            computed: false,
        }
        .check(on)?;

        let predicate = |l: &Row, r: &Row| -> Result<TriBool> {
            let row = l.concat(r);
            let scope = Scope::new(&schema, &row, Stage::JoinOn).with_outer(self.outer);
            self.eval.predicate(on, &scope)
        };

        if let Some(expected) = clause.cardinality {
            let observed = Cardinality::observe(left, right, &predicate)?;
            if !expected.admits(&observed) {
                warn!(
                    join = %clause,
                    expected = expected.as_str(),
                    observed = observed.class().as_str(),
                    "join cardinality differs from its declaration"
                );
            }
        }

        let keys = match self.evaluator.options.join_strategy {
            JoinStrategy::NestedLoop => None,
            JoinStrategy::Auto | JoinStrategy::Hash => {
                equi_join_keys(on, left.schema(), right.schema())
            }
        };
        if let Some((left_key, right_key)) = keys {
            debug!(kind = clause.kind.as_str(), "using hash join");
            join::hash_join(left, right, clause.kind, left_key, right_key)
        } else {
            join::join(left, right, clause.kind, predicate)
        }
    }

    fn window(&mut self) -> Result<()> {
        let calls = self.plan.window_calls();
        if calls.is_empty() {
            return Ok(());
        }
        let schema = self.input.schema();
        let mut columns: Vec<ComputedColumn> = schema
            .columns()
            .iter()
            .map(|c| ComputedColumn {
                qualifier: c.qualifier.clone(),
                name: c.name.clone(),
                hint: Some(c.data_type),
            })
            .collect();
        let mut results: Vec<Vec<Value>> = Vec::with_capacity(calls.len());
        for call in &calls {
            columns.push(ComputedColumn::new(call.to_string(), call.type_hint(schema)));
            results.push(window::compute(
                call,
                &self.input,
                &self.eval,
                self.grouped,
                self.outer,
            )?);
        }
        let rows = self
            .input
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.values()
                    .iter()
                    .cloned()
                    .chain(results.iter().map(|values| values[i].clone()))
                    .collect()
            })
            .collect();
        self.input = Relation::computed(self.input.name(), columns, rows)?;
        self.windowed = true;
        debug!(calls = calls.len(), rows = self.input.len(), "computed window functions");
        Ok(())
    }

    fn select(&mut self) -> Result<()> {
        let plan = self.plan;
        let wildcard = [Projection::Wildcard];
        let projection = if plan.projection.is_empty() {
            &wildcard[..]
        } else {
            &plan.projection[..]
        };
        let schema = self.input.schema();
        let reason = if self.grouped { NOT_GROUPED } else { NO_SUCH_COLUMN };
        let schemas = [schema];
        let refs = self.refs(Stage::Select, &schemas, reason, self.grouped);

        let mut items = Vec::new();
        let mut columns = Vec::new();
        for item in projection {
            match item {
                Projection::Wildcard | Projection::QualifiedWildcard(_) => {
                    let qualifier = match item {
                        Projection::QualifiedWildcard(q) => Some(q.as_str()),
                        _ => None,
                    };
                    if self.grouped {
                        return Err(EvalError::invalid_reference(
                            item.to_string(),
                            Stage::Select,
                            NOT_GROUPED,
                        ));
                    }
                    let before = items.len();
                    for (i, column) in schema.columns().iter().enumerate().take(self.base_width) {
                        if qualifier.is_none() || column.qualifier.as_deref() == qualifier {
                            items.push(Item::Column(i));
                            columns.push(ComputedColumn {
                                qualifier: column.qualifier.clone(),
                                name: column.name.clone(),
                                hint: Some(column.data_type),
                            });
                        }
                    }
                    if qualifier.is_some() && items.len() == before {
                        return Err(EvalError::invalid_reference(
                            item.to_string(),
                            Stage::Select,
                            "no such relation in FROM",
                        ));
                    }
                }
                Projection::Expr { expr, alias } => {
                    refs.check(expr)?;
                    let hint = expr.type_hint(schema);
                    let column = match (alias, expr) {
                        (Some(alias), _) => ComputedColumn::new(alias.clone(), hint),
                        (None, Expr::Column { table, name }) => {
                            match schema.find(table.as_deref(), name)?.and_then(|i| schema.column(i)) {
                                Some(c) => ComputedColumn {
                                    qualifier: c.qualifier.clone(),
                                    name: c.name.clone(),
                                    hint: Some(c.data_type),
                                },
                                None => ComputedColumn::new(expr.to_string(), hint),
                            }
                        }
                        (None, other) => ComputedColumn::new(other.to_string(), hint),
                    };
                    items.push(Item::Expr(expr));
                    columns.push(column);
                }
            }
        }

        let mut rows = Vec::with_capacity(self.input.len());
        for (i, row) in self.input.iter().enumerate() {
            let scope = self.scope(row, Stage::Select);
            let values = items
                .iter()
                .map(|item| match item {
                    Item::Column(c) => Ok(row[*c].clone()),
                    Item::Expr(expr) => self.eval.value(expr, &scope),
                })
                .collect::<Result<Row>>()?;
            rows.push((Some(i), values));
        }
        self.columns = columns;
        self.rows = rows;
        Ok(())
    }

    fn output_schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Column {
                    qualifier: c.qualifier.clone(),
                    name: c.name.clone(),
                    data_type: c.hint.unwrap_or(DataType::Text),
                })
                .collect(),
        )
    }

    fn order_by(&mut self) -> Result<()> {
        let plan = self.plan;
        if plan.order_by.is_empty() {
            return Ok(());
        }
        let output = self.output_schema();
        let (schemas, reason): (Vec<&Schema>, _) = if plan.distinct {
            (vec![&output], NOT_PROJECTED)
        } else if self.grouped {
            (vec![&output, self.input.schema()], NOT_GROUPED)
        } else {
            (vec![&output, self.input.schema()], NO_SUCH_COLUMN)
        };
        let refs = self.refs(Stage::OrderBy, &schemas, reason, true);
        for key in &plan.order_by {
            refs.check(&key.expr)?;
        }

        let rows = std::mem::take(&mut self.rows);
        let mut keyed = Vec::with_capacity(rows.len());
        for (source, row) in rows {
            let source_scope = source
                .and_then(|i| self.input.rows().get(i))
                .map(|r| self.scope(r, Stage::OrderBy));
            let fallback = match &source_scope {
                Some(scope) => Some(scope),
                None => self.outer,
            };
            let scope = Scope::new(&output, &row, Stage::OrderBy)
                .with_outer(fallback)
                .with_computed();
            let key = plan
                .order_by
                .iter()
                .map(|o| self.eval.value(&o.expr, &scope))
                .collect::<Result<Vec<_>>>()?;
            keyed.push((key, source, row));
        }
        keyed.sort_by(|a, b| compare_sort_keys(&a.0, &b.0, &plan.order_by));
        self.rows = keyed.into_iter().map(|(_, source, row)| (source, row)).collect();
        Ok(())
    }
}

/// Static reference check for one clause.
///
/// Runs before the clause so that bad references fail even over empty
/// input, and with a reason specific to the clause.
struct Refs<'r> {
    schemas: &'r [&'r Schema],
    outer: Option<&'r Scope<'r>>,
    stage: Stage,
    aliases: &'r [&'r str],
    reason: &'static str,
    /// Whether composite expressions may name computed columns.
    computed: bool,
}

impl Refs<'_> {
    fn check(&self, expr: &Expr) -> Result<()> {
        let mut failure = None;
        expr.walk(&mut |e| {
            if failure.is_some() {
                return false;
            }
            match e {
                Expr::Literal(_) | Expr::Aggregate(_) | Expr::Window(_) => false,
                Expr::Column { table, name } => {
                    if let Err(err) = self.resolve(table.as_deref(), name) {
                        failure = Some(err);
                    }
                    false
                }
                other => !(self.computed && self.is_computed(other)),
            }
        });
        failure.map_or(Ok(()), Err)
    }

    fn resolve(&self, table: Option<&str>, name: &str) -> Result<()> {
        for schema in self.schemas {
            if schema.find(table, name)?.is_some() {
                return Ok(());
            }
        }
        if let Some(outer) = self.outer {
            if outer.resolves(table, name)? {
                return Ok(());
            }
        }
        let (display, reason) = match table {
            Some(t) => (format!("{t}.{name}"), self.reason),
            None if self.aliases.contains(&name) => (String::from(name), ALIAS_NOT_VISIBLE),
            None => (String::from(name), self.reason),
        };
        Err(EvalError::invalid_reference(display, self.stage, reason))
    }

    fn is_computed(&self, expr: &Expr) -> bool {
        let key = expr.to_string();
        self.schemas
            .iter()
            .any(|schema| matches!(schema.find(None, &key), Ok(Some(_))))
    }
}

/// Key columns of `left.a = right.b`, when the predicate is exactly that.
fn equi_join_keys(on: &Expr, left: &Schema, right: &Schema) -> Option<(usize, usize)> {
    let Expr::Binary {
        left: a,
        op: BinaryOp::Eq,
        right: b,
    } = on
    else {
        return None;
    };
    let (
        Expr::Column {
            table: a_table,
            name: a_name,
        },
        Expr::Column {
            table: b_table,
            name: b_name,
        },
    ) = (a.as_ref(), b.as_ref())
    else {
        return None;
    };
    let find = |schema: &Schema, table: &Option<String>, name: &str| {
        schema.find(table.as_deref(), name).ok().flatten()
    };
    match (
        find(left, a_table, a_name),
        find(right, b_table, b_name),
        find(right, a_table, a_name),
        find(left, b_table, b_name),
    ) {
        (Some(l), Some(r), None, None) => Some((l, r)),
        (None, None, Some(r), Some(l)) => Some((l, r)),
        _ => None,
    }
}

/// Checks the parts of a plan that do not depend on data.
///
/// # Errors
///
/// Returns [`EvalError::InvalidReference`] for aggregates or window calls in
/// clauses that cannot see them, and [`EvalError::InvalidPlan`] for nested
/// aggregate or window calls and malformed joins.
pub fn validate(plan: &QueryPlan) -> Result<()> {
    let reject = |expr: &Expr, stage: Stage, aggregates: bool| -> Result<()> {
        if aggregates {
            if let Some(call) = expr.first_aggregate() {
                return Err(EvalError::invalid_reference(
                    call.to_string(),
                    stage,
                    "aggregate functions are not allowed in this clause",
                ));
            }
        }
        if let Some(call) = expr.first_window() {
            return Err(EvalError::invalid_reference(
                call.to_string(),
                stage,
                "window functions are not allowed in this clause",
            ));
        }
        Ok(())
    };

    if let Some(from) = &plan.from {
        for clause in &from.joins {
            match (clause.kind, &clause.on) {
                (JoinKind::Cross, Some(_)) => {
                    return Err(EvalError::InvalidPlan(String::from(
                        "CROSS JOIN takes no ON predicate",
                    )))
                }
                (JoinKind::Cross, None) => {}
                (kind, None) => {
                    return Err(EvalError::InvalidPlan(format!(
                        "{} requires an ON predicate",
                        kind.as_str()
                    )))
                }
                (_, Some(on)) => reject(on, Stage::JoinOn, true)?,
            }
        }
    }
    if let Some(filter) = &plan.filter {
        reject(filter, Stage::Where, true)?;
    }
    for key in &plan.group_by {
        reject(key, Stage::GroupBy, true)?;
    }
    if let Some(having) = &plan.having {
        reject(having, Stage::Having, false)?;
    }
    for call in plan.aggregate_calls() {
        if call
            .arg
            .as_ref()
            .is_some_and(|arg| arg.contains_aggregate() || arg.contains_window())
        {
            return Err(EvalError::InvalidPlan(format!(
                "{call}: aggregate arguments cannot contain aggregate or window calls"
            )));
        }
    }
    for call in plan.window_calls() {
        let nested = call
            .func
            .args()
            .into_iter()
            .chain(&call.partition_by)
            .chain(call.order_by.iter().map(|o| &o.expr))
            .any(Expr::contains_window);
        if nested {
            return Err(EvalError::InvalidPlan(format!(
                "{call}: window calls cannot be nested"
            )));
        }
    }
    Ok(())
}
