//! # oxide-rel
//!
//! Command-line evaluator for oxide-rel query plans.
//!
//! A workspace file holds relations, views and named queries (see
//! [`workspace`]); the `oxide-rel` binary loads it, evaluates queries or
//! profiles relations, and prints the results as a table or as JSON.

pub mod error;
pub mod output;
pub mod workspace;

use clap::ValueEnum;
use tracing::{debug, info};

use oxide_rel_core::{profile, EvalOptions, Evaluator, JoinStrategy, Relation};

pub use error::{CliError, Result};
pub use output::Format;
pub use workspace::Workspace;

/// Join strategy as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StrategyArg {
    /// Hash join for single-column equi-joins, nested loop otherwise.
    #[default]
    Auto,
    /// Always nested loop.
    NestedLoop,
    /// Hash join whenever the predicate allows it.
    Hash,
}

impl From<StrategyArg> for JoinStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => Self::Auto,
            StrategyArg::NestedLoop => Self::NestedLoop,
            StrategyArg::Hash => Self::Hash,
        }
    }
}

/// Evaluates one named query, or every query in file order.
///
/// # Errors
///
/// Returns [`CliError::UnknownQuery`] for a missing name, or the first
/// evaluation error.
pub fn run_queries(
    workspace: &Workspace,
    name: Option<&str>,
    options: EvalOptions,
) -> Result<Vec<(String, Relation)>> {
    let selected = match name {
        Some(name) => vec![workspace.query(name)?],
        None => workspace.queries().iter().collect(),
    };
    let evaluator = Evaluator::new(workspace.catalog()).with_options(options);
    selected
        .into_iter()
        .map(|query| {
            info!(query = %query.name, "running query");
            let result = evaluator.evaluate(&query.plan)?;
            debug!(query = %query.name, rows = result.len(), "query finished");
            Ok((query.name.clone(), result))
        })
        .collect()
}

/// Profiles a base relation.
///
/// # Errors
///
/// Returns [`CliError::UnknownRelation`] for a missing name.
pub fn profile_relation(workspace: &Workspace, name: &str) -> Result<Relation> {
    let relation = workspace.relation(name)?;
    info!(relation = name, columns = relation.schema().len(), "profiling relation");
    Ok(profile(relation)?)
}

/// Lists relations, views and queries, one per line.
#[must_use]
pub fn listing(workspace: &Workspace) -> String {
    let catalog = workspace.catalog();
    let mut lines = Vec::new();
    for name in catalog.relation_names() {
        let rows = catalog.relation(name).map_or(0, Relation::len);
        lines.push(format!("relation  {name} ({rows} rows)"));
    }
    for name in catalog.view_names() {
        lines.push(format!("view      {name}"));
    }
    for query in workspace.queries() {
        lines.push(format!("query     {}", query.name));
    }
    lines.join("\n")
}
