//! Rendering relations for the terminal.

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde_json::{Map, Number};

use oxide_rel_core::{Relation, Value};

use crate::error::Result;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Boxed text table.
    #[default]
    Table,
    /// JSON array of objects, one per row.
    Json,
}

/// Renders `relation` in `format`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(relation: &Relation, format: Format) -> Result<String> {
    match format {
        Format::Table => Ok(relation.to_string()),
        Format::Json => Ok(serde_json::to_string_pretty(&to_json(relation))?),
    }
}

/// Converts `relation` to a JSON array of objects keyed by column name.
///
/// A name that repeats (after a join, say) is keyed by its qualified form;
/// keys that still collide get a positional suffix (`x`, `x_2`, ...).
#[must_use]
pub fn to_json(relation: &Relation) -> serde_json::Value {
    let columns = relation.schema().columns();
    let mut keys: Vec<String> = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        let repeated = columns
            .iter()
            .enumerate()
            .any(|(j, other)| j != i && other.name == column.name);
        let base = if repeated {
            column.display_name()
        } else {
            column.name.clone()
        };
        let mut key = base.clone();
        let mut n = 2;
        while keys.contains(&key) {
            key = format!("{base}_{n}");
            n += 1;
        }
        keys.push(key);
    }
    let rows = relation
        .iter()
        .map(|row| {
            let object: Map<String, serde_json::Value> = keys
                .iter()
                .cloned()
                .zip(row.values().iter().map(value_to_json))
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::Value::Array(rows)
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(n) => serde_json::Value::from(*n),
        Value::Real(r) => Number::from_f64(*r).map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::DateTime(dt) => datetime_to_json(dt),
    }
}

fn datetime_to_json(dt: &NaiveDateTime) -> serde_json::Value {
    serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}
