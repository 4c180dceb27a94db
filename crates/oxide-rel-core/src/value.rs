//! Values and data types.
//!
//! [`Value`] carries two notions of equality. Rust's `==`, `Ord` and `Hash`
//! implement a *total* structural order used for sorting, grouping and
//! de-duplication, in which `Null` equals `Null` and sorts first. SQL
//! equality, where `Null` is unknown, lives in [`crate::logic`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Column data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Real,
    /// UTF-8 text.
    Text,
    /// Boolean.
    Boolean,
    /// Date and time without zone.
    DateTime,
}

impl DataType {
    /// Returns the SQL name of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::DateTime => "DATETIME",
        }
    }

    /// Whether the type is Integer or Real.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }

    /// Returns the common type two column types unify to, if any.
    ///
    /// Integer and Real unify to Real; otherwise only identical types unify.
    #[must_use]
    pub fn unify(self, other: Self) -> Option<Self> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (Self::Integer, Self::Real) | (Self::Real, Self::Integer) => Some(Self::Real),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single value in a row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// NULL.
    Null,
    /// Integer value.
    Integer(i64),
    /// Real value.
    Real(f64),
    /// Text value.
    Text(String),
    /// Boolean value.
    Boolean(bool),
    /// Date-time value.
    DateTime(NaiveDateTime),
}

impl Value {
    /// Returns the type of the value, or `None` for NULL.
    #[must_use]
    pub const fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Integer(_) => Some(DataType::Integer),
            Self::Real(_) => Some(DataType::Real),
            Self::Text(_) => Some(DataType::Text),
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::DateTime(_) => Some(DataType::DateTime),
        }
    }

    /// Whether the value is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value may be stored in a column of type `data_type`.
    #[must_use]
    pub fn conforms_to(&self, data_type: DataType) -> bool {
        self.data_type().is_none_or(|t| t == data_type)
    }

    /// Numeric view of Integer and Real values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Converts the value to `target` where that is a widening conversion.
    ///
    /// Only Integer to Real is performed; everything else is returned as is.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn widen_to(self, target: DataType) -> Self {
        match (self, target) {
            (Self::Integer(i), DataType::Real) => Self::Real(i as f64),
            (v, _) => v,
        }
    }

    /// Returns the SQL literal representation (quoted and escaped).
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Boolean(true) => String::from("TRUE"),
            Self::Boolean(false) => String::from("FALSE"),
            Self::Integer(n) => format!("{n}"),
            Self::Real(r) => format_real(*r),
            Self::Text(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::DateTime(dt) => format!("TIMESTAMP '{}'", dt.format(DATETIME_FORMAT)),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Integer(_) | Self::Real(_) => 2,
            Self::Text(_) => 3,
            Self::DateTime(_) => 4,
        }
    }
}

/// Display format for date-time values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_real(r: f64) -> String {
    if r.is_finite() && r.fract() == 0.0 {
        format!("{r:.1}")
    } else {
        format!("{r}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(r) => f.write_str(&format_real(*r)),
            Self::Text(s) => f.write_str(s),
            Self::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl Ord for Value {
    #[allow(clippy::cast_precision_loss)]
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Real(a), Self::Real(b)) => a.total_cmp(b),
            // Numerically equal mixed pairs fall back to Integer < Real so that
            // the order stays consistent with structural equality.
            (Self::Integer(a), Self::Real(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Self::Real(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Integer(i) => i.hash(state),
            Self::Real(r) => r.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Boolean(b) => b.hash(state),
            Self::DateTime(dt) => dt.hash(state),
        }
    }
}

/// Trait for types that can be converted to values.
pub trait ToValue {
    /// Converts into a [`Value`].
    fn to_value(self) -> Value;
}

impl ToValue for Value {
    fn to_value(self) -> Value {
        self
    }
}

impl ToValue for bool {
    fn to_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl ToValue for i64 {
    fn to_value(self) -> Value {
        Value::Integer(self)
    }
}

macro_rules! impl_to_value_int {
    ($($ty:ty),+) => {
        $(
            impl ToValue for $ty {
                fn to_value(self) -> Value {
                    Value::Integer(i64::from(self))
                }
            }
        )+
    };
}

impl_to_value_int!(i32, i16, i8, u32, u16, u8);

impl ToValue for f64 {
    fn to_value(self) -> Value {
        Value::Real(self)
    }
}

impl ToValue for f32 {
    fn to_value(self) -> Value {
        Value::Real(f64::from(self))
    }
}

impl ToValue for String {
    fn to_value(self) -> Value {
        Value::Text(self)
    }
}

impl ToValue for &str {
    fn to_value(self) -> Value {
        Value::Text(String::from(self))
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl ToValue for NaiveDate {
    fn to_value(self) -> Value {
        Value::DateTime(self.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}
