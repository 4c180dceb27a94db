//! Error types for the command-line tool.

use std::path::PathBuf;

use oxide_rel_core::{DataType, EvalError};

/// Errors that can occur while loading a workspace or running its queries.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The workspace file could not be read.
    #[error("IO error reading '{path}': {source}")]
    Io {
        /// Path of the workspace file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The workspace file is not valid JSON or does not match the layout.
    #[error("Invalid workspace file: {0}")]
    Json(#[from] serde_json::Error),

    /// Building a relation or evaluating a plan failed.
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// No query with this name exists in the workspace.
    #[error("Query not found: {0}")]
    UnknownQuery(String),

    /// No relation with this name exists in the workspace.
    #[error("Relation not found: {0}")]
    UnknownRelation(String),

    /// A row value does not fit its column's declared type.
    #[error("Invalid value {value} for column '{relation}.{column}' of type {expected}")]
    InvalidValue {
        /// Relation name.
        relation: String,
        /// Column name.
        column: String,
        /// The offending JSON value.
        value: serde_json::Value,
        /// Declared column type.
        expected: DataType,
    },

    /// A row has a different number of values than the relation has columns.
    #[error("Row {row} of '{relation}' has {found} values, expected {expected}")]
    RowArity {
        /// Relation name.
        relation: String,
        /// Zero-based row index.
        row: usize,
        /// Number of columns.
        expected: usize,
        /// Number of values in the row.
        found: usize,
    },
}

/// Result type for command-line operations.
pub type Result<T> = std::result::Result<T, CliError>;
