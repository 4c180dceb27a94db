//! Three-valued logic.
//!
//! Every comparison involving NULL is [`TriBool::Unknown`]. Filters keep a
//! row only when the predicate is definitely [`TriBool::True`]; `False` and
//! `Unknown` both reject it, which is why `WHERE a = b` silently drops rows
//! where either side is NULL.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::value::{DataType, Value};

/// A three-valued truth value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriBool {
    /// Definitely true.
    True,
    /// Definitely false.
    False,
    /// Unknown (NULL).
    Unknown,
}

impl TriBool {
    /// Whether the value is definitely true. This is the row-filter test.
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// Three-valued AND: `False` dominates, then `Unknown`.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Unknown,
        }
    }

    /// Three-valued OR: `True` dominates, then `Unknown`.
    #[must_use]
    pub const fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Unknown,
        }
    }

    /// Converts to a value; `Unknown` becomes NULL.
    #[must_use]
    pub const fn to_value(self) -> Value {
        match self {
            Self::True => Value::Boolean(true),
            Self::False => Value::Boolean(false),
            Self::Unknown => Value::Null,
        }
    }

    /// Interprets a value as a truth value; NULL is `Unknown`.
    ///
    /// # Errors
    ///
    /// Returns a type mismatch for non-boolean values.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(Self::from(*b)),
            Value::Null => Ok(Self::Unknown),
            other => Err(EvalError::type_mismatch(
                "predicate",
                other.data_type().unwrap_or(DataType::Boolean),
                DataType::Boolean,
            )),
        }
    }
}

impl From<bool> for TriBool {
    fn from(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }
}

impl std::ops::Not for TriBool {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }
}

impl fmt::Display for TriBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `IS NOT DISTINCT FROM` (NULL-safe equality, never unknown).
    IsNotDistinctFrom,
    /// `IS DISTINCT FROM`.
    IsDistinctFrom,
}

impl CompareOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::IsNotDistinctFrom => "IS NOT DISTINCT FROM",
            Self::IsDistinctFrom => "IS DISTINCT FROM",
        }
    }
}

/// Orders two non-null values under SQL rules.
///
/// Returns `None` when either side is NULL.
///
/// # Errors
///
/// Returns a type mismatch when the values are not comparable.
pub fn sql_cmp(a: &Value, b: &Value, op: &str) -> Result<Option<Ordering>> {
    let ordering = match (a, b) {
        (Value::Null, _) | (_, Value::Null) => return Ok(None),
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (x, y) => match (x.as_f64(), y.as_f64()) {
            // NaN sorts above every number and equals itself.
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y)),
            _ => {
                return Err(EvalError::type_mismatch(
                    op,
                    x.data_type().unwrap_or(DataType::Text),
                    y.data_type().unwrap_or(DataType::Text),
                ))
            }
        },
    };
    Ok(Some(ordering))
}

/// Compares two values under three-valued logic.
///
/// # Errors
///
/// Returns a type mismatch when both values are non-null and incomparable.
pub fn compare(a: &Value, b: &Value, op: CompareOp) -> Result<TriBool> {
    let test: fn(Ordering) -> bool = match op {
        CompareOp::IsNotDistinctFrom => return is_not_distinct_from(a, b).map(TriBool::from),
        CompareOp::IsDistinctFrom => return is_not_distinct_from(a, b).map(|eq| TriBool::from(!eq)),
        CompareOp::Eq => Ordering::is_eq,
        CompareOp::NotEq => Ordering::is_ne,
        CompareOp::Lt => Ordering::is_lt,
        CompareOp::LtEq => Ordering::is_le,
        CompareOp::Gt => Ordering::is_gt,
        CompareOp::GtEq => Ordering::is_ge,
    };
    let Some(ordering) = sql_cmp(a, b, op.as_str())? else {
        return Ok(TriBool::Unknown);
    };
    Ok(TriBool::from(test(ordering)))
}

/// `IS NULL`. Never unknown.
#[must_use]
pub const fn is_null(value: &Value) -> bool {
    value.is_null()
}

/// `IS NOT NULL`. Never unknown.
#[must_use]
pub const fn is_not_null(value: &Value) -> bool {
    !value.is_null()
}

/// NULL-safe equality: two NULLs are not distinct; NULL and a value are.
///
/// # Errors
///
/// Returns a type mismatch when both values are non-null and incomparable.
pub fn is_not_distinct_from(a: &Value, b: &Value) -> Result<bool> {
    match (a, b) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        _ => Ok(sql_cmp(a, b, CompareOp::IsNotDistinctFrom.as_str())? == Some(Ordering::Equal)),
    }
}

/// Returns the first non-null value, or NULL.
#[must_use]
pub fn coalesce<'a, I>(values: I) -> Value
where
    I: IntoIterator<Item = &'a Value>,
{
    values
        .into_iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null)
}

/// `value BETWEEN low AND high`, i.e. `value >= low AND value <= high`.
///
/// Both bounds are inclusive and order-sensitive: with `low > high` nothing
/// matches.
///
/// # Errors
///
/// Returns a type mismatch for incomparable operands.
pub fn between(value: &Value, low: &Value, high: &Value) -> Result<TriBool> {
    Ok(compare(value, low, CompareOp::GtEq)?.and(compare(value, high, CompareOp::LtEq)?))
}

/// `value IN (items)`.
///
/// True on a definite match. Otherwise unknown when the probe or any item is
/// NULL, and false only when every comparison was definitely false. Negating
/// the result gives `NOT IN`, which is therefore never true once the list
/// contains a NULL.
///
/// # Errors
///
/// Returns a type mismatch for incomparable operands.
pub fn in_list<'a, I>(value: &Value, items: I) -> Result<TriBool>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut result = TriBool::False;
    for item in items {
        result = result.or(compare(value, item, CompareOp::Eq)?);
        if result.is_true() {
            break;
        }
    }
    Ok(result)
}

/// `text LIKE pattern` with `%` (any run) and `_` (any one character).
///
/// # Errors
///
/// Returns a type mismatch for non-text operands.
pub fn like(text: &Value, pattern: &Value) -> Result<TriBool> {
    match (text, pattern) {
        (Value::Null, _) | (_, Value::Null) => Ok(TriBool::Unknown),
        (Value::Text(text), Value::Text(pattern)) => {
            Ok(TriBool::from(like_regex(pattern)?.is_match(text)))
        }
        (a, b) => Err(EvalError::type_mismatch(
            "LIKE",
            a.data_type().unwrap_or(DataType::Text),
            b.data_type().unwrap_or(DataType::Text),
        )),
    }
}

fn like_regex(pattern: &str) -> Result<regex::Regex> {
    let mut source = String::from("(?s)^");
    let mut buf = [0_u8; 4];
    for c in pattern.chars() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }
    source.push('$');
    regex::Regex::new(&source).map_err(|e| EvalError::InvalidPattern {
        pattern: String::from(pattern),
        message: e.to_string(),
    })
}
