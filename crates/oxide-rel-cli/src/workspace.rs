//! Workspace files: relations, views and named queries in one JSON document.
//!
//! ```json
//! {
//!   "relations": [
//!     { "name": "users",
//!       "columns": [{ "name": "id", "type": "integer" }],
//!       "rows": [[1], [2]] }
//!   ],
//!   "views": [{ "name": "...", "plan": { ... } }],
//!   "queries": [{ "name": "...", "plan": { ... } }]
//! }
//! ```
//!
//! Plans use the serde form of [`QueryPlan`]. Row values are plain JSON and
//! are coerced to the declared column type on load.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use oxide_rel_core::eval::parse_datetime;
use oxide_rel_core::relation::{Column, Relation, Row, Schema};
use oxide_rel_core::{Catalog, DataType, QueryPlan, Value};

use crate::error::{CliError, Result};

/// A column declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub data_type: DataType,
}

/// A relation as written in the workspace file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationSpec {
    /// Relation name.
    pub name: String,
    /// Columns, in order.
    pub columns: Vec<ColumnSpec>,
    /// Rows as JSON arrays.
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// A named plan: a view or a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedPlan {
    /// Name.
    pub name: String,
    /// The plan.
    pub plan: QueryPlan,
}

/// The on-disk layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceFile {
    /// Base relations.
    pub relations: Vec<RelationSpec>,
    /// Views, registered in the catalog.
    pub views: Vec<NamedPlan>,
    /// Queries, in file order.
    pub queries: Vec<NamedPlan>,
}

/// A loaded workspace: a catalog plus the queries to run against it.
#[derive(Debug, Clone)]
pub struct Workspace {
    catalog: Catalog,
    queries: Vec<NamedPlan>,
}

impl Workspace {
    /// Reads and loads a workspace file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// workspace.
    pub fn load(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "loading workspace");
        let text = fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Loads a workspace from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse, a value does not fit its
    /// column, or two relations or views share a name.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: WorkspaceFile = serde_json::from_str(text)?;
        Self::from_file(file)
    }

    /// Builds the catalog from a parsed workspace file.
    ///
    /// # Errors
    ///
    /// See [`Workspace::from_json`].
    pub fn from_file(file: WorkspaceFile) -> Result<Self> {
        let mut catalog = Catalog::new();
        for spec in &file.relations {
            catalog.register(build_relation(spec)?)?;
        }
        for view in file.views {
            catalog.create_view(view.name, view.plan)?;
        }
        debug!(
            relations = file.relations.len(),
            queries = file.queries.len(),
            "workspace loaded"
        );
        Ok(Self {
            catalog,
            queries: file.queries,
        })
    }

    /// The catalog of relations and views.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// All queries, in file order.
    #[must_use]
    pub fn queries(&self) -> &[NamedPlan] {
        &self.queries
    }

    /// Looks up a query by name.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::UnknownQuery`] if there is none.
    pub fn query(&self, name: &str) -> Result<&NamedPlan> {
        self.queries
            .iter()
            .find(|q| q.name == name)
            .ok_or_else(|| CliError::UnknownQuery(name.to_string()))
    }

    /// Looks up a base relation by name.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::UnknownRelation`] if there is none.
    pub fn relation(&self, name: &str) -> Result<&Relation> {
        self.catalog
            .relation(name)
            .ok_or_else(|| CliError::UnknownRelation(name.to_string()))
    }
}

fn build_relation(spec: &RelationSpec) -> Result<Relation> {
    let schema = Schema::new(
        spec.columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.data_type))
            .collect(),
    );
    let mut rows = Vec::with_capacity(spec.rows.len());
    for (index, raw) in spec.rows.iter().enumerate() {
        if raw.len() != spec.columns.len() {
            return Err(CliError::RowArity {
                relation: spec.name.clone(),
                row: index,
                expected: spec.columns.len(),
                found: raw.len(),
            });
        }
        let values = raw
            .iter()
            .zip(&spec.columns)
            .map(|(value, column)| {
                coerce(value, column.data_type).ok_or_else(|| CliError::InvalidValue {
                    relation: spec.name.clone(),
                    column: column.name.clone(),
                    value: value.clone(),
                    expected: column.data_type,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(Row::new(values));
    }
    Ok(Relation::new(spec.name.clone(), schema, rows)?)
}

/// Converts a JSON value to a value of `data_type`.
///
/// JSON `null` is NULL for every type. Integers are accepted for REAL
/// columns; DATETIME columns take `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`
/// strings. Returns `None` when the value does not fit.
#[must_use]
pub fn coerce(value: &serde_json::Value, data_type: DataType) -> Option<Value> {
    use serde_json::Value as Json;

    match (value, data_type) {
        (Json::Null, _) => Some(Value::Null),
        (Json::Number(n), DataType::Integer) => n.as_i64().map(Value::Integer),
        (Json::Number(n), DataType::Real) => n.as_f64().map(Value::Real),
        (Json::String(s), DataType::Text) => Some(Value::Text(s.clone())),
        (Json::Bool(b), DataType::Boolean) => Some(Value::Boolean(*b)),
        (Json::String(s), DataType::DateTime) => parse_datetime(s).map(Value::DateTime),
        _ => None,
    }
}
