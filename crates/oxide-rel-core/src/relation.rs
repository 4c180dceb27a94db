//! Relations: named multisets of rows sharing one schema.
//!
//! # Example
//!
//! ```rust
//! use oxide_rel_core::relation::Relation;
//! use oxide_rel_core::value::DataType;
//! use oxide_rel_core::{row, NULL};
//!
//! let users = Relation::builder("users")
//!     .column("id", DataType::Integer)
//!     .column("name", DataType::Text)
//!     .row(row![1, "ann"])
//!     .row(row![2, NULL])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(users.len(), 2);
//! ```

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::value::{DataType, Value};

/// A column of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Relation name or alias the column belongs to.
    pub qualifier: Option<String>,
    /// Column name.
    pub name: String,
    /// Declared type.
    pub data_type: DataType,
}

impl Column {
    /// Creates an unqualified column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
            data_type,
        }
    }

    /// Creates a qualified column.
    pub fn qualified(
        qualifier: impl Into<String>,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
            data_type,
        }
    }

    /// Whether the column answers to `qualifier.name` (or just `name`).
    #[must_use]
    pub fn matches(&self, qualifier: Option<&str>, name: &str) -> bool {
        self.name == name
            && qualifier.is_none_or(|q| self.qualifier.as_deref() == Some(q))
    }

    /// Returns `qualifier.name` or `name`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{q}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// An ordered list of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Creates a schema from columns.
    #[must_use]
    pub const fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// The columns, in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The column at `index`.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Finds a column by optional qualifier and name.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::AmbiguousColumn`] when several columns match.
    pub fn find(&self, qualifier: Option<&str>, name: &str) -> Result<Option<usize>> {
        let mut found = None;
        for (i, column) in self.columns.iter().enumerate() {
            if column.matches(qualifier, name) {
                if found.is_some() {
                    return Err(EvalError::AmbiguousColumn(match qualifier {
                        Some(q) => format!("{q}.{name}"),
                        None => String::from(name),
                    }));
                }
                found = Some(i);
            }
        }
        Ok(found)
    }

    /// Concatenates two schemas (left columns first).
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Self { columns }
    }

    /// Re-qualifies every column with `qualifier`.
    #[must_use]
    pub fn requalify(&self, qualifier: &str) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::qualified(qualifier, c.name.clone(), c.data_type))
                .collect(),
        }
    }

    /// Column types, in order.
    pub fn types(&self) -> impl Iterator<Item = DataType> + '_ {
        self.columns.iter().map(|c| c.data_type)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", column.display_name(), column.data_type)?;
        }
        f.write_str(")")
    }
}

/// A row: values positionally matched to a schema.
///
/// Rows order lexicographically by value (NULL first), which is the order
/// used to de-duplicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Row(Vec<Value>);

impl Row {
    /// Creates a row from values.
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// A row of `n` NULLs, used to pad outer joins.
    #[must_use]
    pub fn nulls(n: usize) -> Self {
        Self(vec![Value::Null; n])
    }

    /// The values, in order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Consumes the row, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    /// The value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A new row holding this row's values followed by `other`'s.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut values = Vec::with_capacity(self.len() + other.len());
        values.extend_from_slice(&self.0);
        values.extend_from_slice(&other.0);
        Self(values)
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.0[index]
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Builds a [`Row`] from anything implementing [`ToValue`](crate::value::ToValue).
///
/// Use [`NULL`](crate::NULL) for NULL entries.
#[macro_export]
macro_rules! row {
    () => {
        $crate::relation::Row::new(::std::vec::Vec::new())
    };
    ($($value:expr),+ $(,)?) => {
        $crate::relation::Row::new(vec![$($crate::value::ToValue::to_value($value)),+])
    };
}

/// A named, ordered multiset of rows sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    name: String,
    schema: Schema,
    rows: Vec<Row>,
}

impl Relation {
    /// Starts building a relation.
    pub fn builder(name: impl Into<String>) -> RelationBuilder {
        RelationBuilder {
            name: name.into(),
            columns: vec![],
            rows: vec![],
        }
    }

    /// Creates a relation, checking every row against the schema.
    ///
    /// # Errors
    ///
    /// Returns a schema mismatch for rows of the wrong arity and a type
    /// mismatch for values that do not fit their column.
    pub fn new(name: impl Into<String>, schema: Schema, rows: Vec<Row>) -> Result<Self> {
        for row in &rows {
            check_row(&schema, row)?;
        }
        Ok(Self {
            name: name.into(),
            schema,
            rows,
        })
    }

    /// Creates a relation from rows an operator has already shaped.
    pub(crate) fn from_trusted(name: impl Into<String>, schema: Schema, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == schema.len()));
        Self {
            name: name.into(),
            schema,
            rows,
        }
    }

    /// Creates a relation from computed rows, deriving each column's type.
    ///
    /// A column's type is the unification of its non-null value types
    /// (Integer and Real unify to Real, widening the integers). An all-NULL
    /// column takes its hint, or Text without one.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch when a column mixes incompatible types.
    pub fn computed(
        name: impl Into<String>,
        columns: Vec<ComputedColumn>,
        rows: Vec<Row>,
    ) -> Result<Self> {
        let mut types: Vec<Option<DataType>> = vec![None; columns.len()];
        for row in &rows {
            for (slot, value) in types.iter_mut().zip(row.values()) {
                let Some(found) = value.data_type() else {
                    continue;
                };
                *slot = match *slot {
                    None => Some(found),
                    Some(current) => Some(current.unify(found).ok_or_else(|| {
                        EvalError::type_mismatch("column", current, found)
                    })?),
                };
            }
        }
        let schema_columns: Vec<Column> = columns
            .into_iter()
            .zip(&types)
            .map(|(c, t)| Column {
                qualifier: c.qualifier,
                name: c.name,
                data_type: t.or(c.hint).unwrap_or(DataType::Text),
            })
            .collect();
        let widen: Vec<bool> = schema_columns
            .iter()
            .map(|c| c.data_type == DataType::Real)
            .collect();
        let rows = if widen.iter().any(|w| *w) {
            rows.into_iter()
                .map(|row| {
                    row.into_values()
                        .into_iter()
                        .zip(&widen)
                        .map(|(v, w)| if *w { v.widen_to(DataType::Real) } else { v })
                        .collect()
                })
                .collect()
        } else {
            rows
        };
        Ok(Self::from_trusted(name, Schema::new(schema_columns), rows))
    }

    /// The relation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The rows, in order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consumes the relation, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the relation has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates over the rows.
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Resolves a possibly qualified column name (`t.c` or `c`).
    ///
    /// # Errors
    ///
    /// Returns an invalid reference for unknown columns and an ambiguity
    /// error for names matching several columns.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        let (qualifier, name) = match column.split_once('.') {
            Some((q, n)) => (Some(q), n),
            None => (None, column),
        };
        self.schema.find(qualifier, name)?.ok_or_else(|| {
            EvalError::invalid_reference(
                column,
                crate::error::Stage::Expression,
                format!("no such column in {}", self.name),
            )
        })
    }

    /// The value of `column` in row `row`.
    ///
    /// # Errors
    ///
    /// See [`Relation::column_index`].
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub fn value(&self, row: usize, column: &str) -> Result<&Value> {
        let index = self.column_index(column)?;
        Ok(&self.rows[row][index])
    }

    /// All values of one column, in row order.
    ///
    /// # Errors
    ///
    /// See [`Relation::column_index`].
    pub fn column_values(&self, column: &str) -> Result<Vec<Value>> {
        let index = self.column_index(column)?;
        Ok(self.rows.iter().map(|r| r[index].clone()).collect())
    }

    /// Returns a copy renamed to `alias` with every column re-qualified.
    #[must_use]
    pub fn aliased(&self, alias: &str) -> Self {
        Self {
            name: String::from(alias),
            schema: self.schema.requalify(alias),
            rows: self.rows.clone(),
        }
    }

    /// Returns a copy with a different name (columns untouched).
    #[must_use]
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<'a> IntoIterator for &'a Relation {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn check_row(schema: &Schema, row: &Row) -> Result<()> {
    if row.len() != schema.len() {
        return Err(EvalError::SchemaMismatch {
            left: schema.to_string(),
            right: format!("row of {} values", row.len()),
        });
    }
    for (column, value) in schema.columns().iter().zip(row.values()) {
        if let Some(found) = value.data_type() {
            if found != column.data_type {
                return Err(EvalError::type_mismatch(
                    format!("column {}", column.display_name()),
                    found,
                    column.data_type,
                ));
            }
        }
    }
    Ok(())
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<String> = self.schema.columns().iter().map(|c| c.name.clone()).collect();
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.values().iter().map(ToString::to_string).collect())
            .collect();
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let rule: String = widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+");
        let line = |f: &mut fmt::Formatter<'_>, items: &[String]| -> fmt::Result {
            f.write_str("|")?;
            for (item, &w) in items.iter().zip(&widths) {
                write!(f, " {item:<w$} |")?;
            }
            writeln!(f)
        };

        writeln!(f, "+{rule}+")?;
        line(f, &headers)?;
        writeln!(f, "+{rule}+")?;
        for row in &cells {
            line(f, row)?;
        }
        writeln!(f, "+{rule}+")?;
        let n = self.rows.len();
        write!(f, "({n} {})", if n == 1 { "row" } else { "rows" })
    }
}

/// Builder for [`Relation`].
#[derive(Debug, Clone)]
pub struct RelationBuilder {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl RelationBuilder {
    /// Adds a column, qualified with the relation name.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns
            .push(Column::qualified(self.name.clone(), name, data_type));
        self
    }

    /// Adds a row.
    #[must_use]
    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    /// Adds several rows.
    #[must_use]
    pub fn rows(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Builds and validates the relation.
    ///
    /// # Errors
    ///
    /// See [`Relation::new`].
    pub fn build(self) -> Result<Relation> {
        Relation::new(self.name, Schema::new(self.columns), self.rows)
    }
}

/// Column description for [`Relation::computed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedColumn {
    /// Qualifier.
    pub qualifier: Option<String>,
    /// Name.
    pub name: String,
    /// Type to use when no value determines one.
    pub hint: Option<DataType>,
}

impl ComputedColumn {
    /// Creates an unqualified computed column.
    pub fn new(name: impl Into<String>, hint: Option<DataType>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
            hint,
        }
    }
}
