//! Error types for relation evaluation.

use thiserror::Error;

use crate::value::DataType;

/// The evaluation stage an error was raised in.
///
/// Mirrors [`crate::pipeline::Clause`] but also covers places outside the
/// clause pipeline (join predicates, relation construction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// FROM / JOIN.
    From,
    /// JOIN ... ON predicate.
    JoinOn,
    /// WHERE.
    Where,
    /// GROUP BY.
    GroupBy,
    /// HAVING.
    Having,
    /// Window computation.
    Window,
    /// SELECT list.
    Select,
    /// ORDER BY.
    OrderBy,
    /// Anything not tied to a clause.
    Expression,
}

impl Stage {
    /// Returns the SQL keyword for the stage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::From => "FROM",
            Self::JoinOn => "JOIN ON",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::Window => "WINDOW",
            Self::Select => "SELECT",
            Self::OrderBy => "ORDER BY",
            Self::Expression => "expression",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while building or evaluating relations and plans.
///
/// Every evaluation either returns a complete relation or exactly one of
/// these; there are no partial results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A scalar sub-select produced more than one row.
    #[error("scalar sub-select returned {rows} rows, expected at most one")]
    Cardinality {
        /// Number of rows the sub-select produced.
        rows: usize,
    },

    /// Set operation operands do not share a schema.
    #[error("schema mismatch: {left} vs {right}")]
    SchemaMismatch {
        /// Rendering of the left schema.
        left: String,
        /// Rendering of the right schema.
        right: String,
    },

    /// A clause references something not visible at that stage.
    #[error("invalid reference to {name} in {stage}: {reason}")]
    InvalidReference {
        /// The referenced name or expression.
        name: String,
        /// The clause that made the reference.
        stage: Stage,
        /// Why the reference is not visible.
        reason: String,
    },

    /// An operator was applied to incompatible, non-null types.
    #[error("type mismatch: cannot apply {op} to {left} and {right}")]
    TypeMismatch {
        /// The operator or context.
        op: String,
        /// Left operand type.
        left: DataType,
        /// Right operand type (or expected type).
        right: DataType,
    },

    /// An unqualified column name matches more than one column.
    #[error("column reference {0} is ambiguous")]
    AmbiguousColumn(String),

    /// A FROM source names a relation that is not in scope.
    #[error("relation not found: {0}")]
    UnknownRelation(String),

    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// The plan or one of its expressions is malformed.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// A LIKE pattern could not be compiled.
    #[error("invalid LIKE pattern {pattern}: {message}")]
    InvalidPattern {
        /// The LIKE pattern.
        pattern: String,
        /// Compiler message.
        message: String,
    },
}

impl EvalError {
    /// Creates an [`EvalError::InvalidReference`].
    pub fn invalid_reference(
        name: impl Into<String>,
        stage: Stage,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidReference {
            name: name.into(),
            stage,
            reason: reason.into(),
        }
    }

    /// Creates an [`EvalError::TypeMismatch`].
    pub fn type_mismatch(op: impl Into<String>, left: DataType, right: DataType) -> Self {
        Self::TypeMismatch {
            op: op.into(),
            left,
            right,
        }
    }
}

/// Result type alias for evaluation.
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            EvalError::Cardinality { rows: 2 }.to_string(),
            "scalar sub-select returned 2 rows, expected at most one"
        );
        assert_eq!(
            EvalError::invalid_reference("total", Stage::Where, "select alias").to_string(),
            "invalid reference to total in WHERE: select alias"
        );
        assert_eq!(
            EvalError::type_mismatch("=", DataType::Text, DataType::Integer).to_string(),
            "type mismatch: cannot apply = to TEXT and INTEGER"
        );
    }
}
