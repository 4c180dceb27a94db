//! Relationship cardinality between two relations under a join predicate.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;
use crate::logic::TriBool;
use crate::relation::{Relation, Row};

/// How many right rows each left row relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// N:1, every left row has exactly one match.
    #[serde(rename = "N:1")]
    ManyToOne,
    /// N:0..1, every left row has at most one match.
    #[serde(rename = "N:0..1")]
    ManyToZeroOrOne,
    /// N:M, some left row may have several matches.
    #[serde(rename = "N:M")]
    ManyToMany,
}

impl Cardinality {
    /// Returns the conventional notation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ManyToOne => "N:1",
            Self::ManyToZeroOrOne => "N:0..1",
            Self::ManyToMany => "N:M",
        }
    }

    /// Counts the matches of every left row.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `predicate`.
    pub fn observe<P>(left: &Relation, right: &Relation, predicate: P) -> Result<Observed>
    where
        P: Fn(&Row, &Row) -> Result<TriBool>,
    {
        let mut match_counts = Vec::with_capacity(left.len());
        for l in left {
            let mut n = 0;
            for r in right {
                if predicate(l, r)?.is_true() {
                    n += 1;
                }
            }
            match_counts.push(n);
        }
        let observed = Observed { match_counts };
        trace!(
            left = left.name(),
            right = right.name(),
            class = observed.class().as_str(),
            "observed cardinality"
        );
        Ok(observed)
    }

    /// Whether the observation is consistent with this declared class.
    #[must_use]
    pub fn admits(&self, observed: &Observed) -> bool {
        match self {
            Self::ManyToOne => observed.class() == Self::ManyToOne,
            Self::ManyToZeroOrOne => observed.max_matches() <= 1,
            Self::ManyToMany => true,
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-left-row match counts of a join predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed {
    match_counts: Vec<usize>,
}

impl Observed {
    /// Matches of each left row, in left-input order.
    #[must_use]
    pub fn match_counts(&self) -> &[usize] {
        &self.match_counts
    }

    /// Left rows without any match.
    #[must_use]
    pub fn unmatched(&self) -> usize {
        self.match_counts.iter().filter(|&&n| n == 0).count()
    }

    /// The largest match count (0 for an empty left side).
    #[must_use]
    pub fn max_matches(&self) -> usize {
        self.match_counts.iter().copied().max().unwrap_or(0)
    }

    /// The tightest class the observation satisfies.
    #[must_use]
    pub fn class(&self) -> Cardinality {
        match (self.max_matches(), self.unmatched()) {
            (0 | 1, 0) => Cardinality::ManyToOne,
            (0 | 1, _) => Cardinality::ManyToZeroOrOne,
            _ => Cardinality::ManyToMany,
        }
    }

    /// Rows an INNER JOIN produces.
    #[must_use]
    pub fn inner_rows(&self) -> usize {
        self.match_counts.iter().sum()
    }

    /// Rows a LEFT JOIN produces: the matches plus one per unmatched row.
    #[must_use]
    pub fn left_rows(&self) -> usize {
        self.inner_rows() + self.unmatched()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{compare, CompareOp};
    use crate::row;
    use crate::value::DataType;

    fn ids(name: &str, values: &[i64]) -> Relation {
        Relation::builder(name)
            .column("id", DataType::Integer)
            .rows(values.iter().map(|v| row![*v]))
            .build()
            .unwrap()
    }

    fn eq(l: &Row, r: &Row) -> Result<TriBool> {
        compare(&l[0], &r[0], CompareOp::Eq)
    }

    #[test]
    fn test_classes() {
        let left = ids("l", &[1, 2]);
        let one = Cardinality::observe(&left, &ids("r", &[1, 2]), eq).unwrap();
        assert_eq!(one.class(), Cardinality::ManyToOne);
        let optional = Cardinality::observe(&left, &ids("r", &[2]), eq).unwrap();
        assert_eq!(optional.class(), Cardinality::ManyToZeroOrOne);
        let many = Cardinality::observe(&left, &ids("r", &[1, 1, 2]), eq).unwrap();
        assert_eq!(many.class(), Cardinality::ManyToMany);
        assert_eq!(many.match_counts(), &[2, 1]);
        assert_eq!(many.left_rows(), 3);
        assert_eq!(optional.left_rows(), 2);
    }

    #[test]
    fn test_admits() {
        let left = ids("l", &[1, 2]);
        let optional = Cardinality::observe(&left, &ids("r", &[2]), eq).unwrap();
        assert!(!Cardinality::ManyToOne.admits(&optional));
        assert!(Cardinality::ManyToZeroOrOne.admits(&optional));
        assert!(Cardinality::ManyToMany.admits(&optional));
    }

    #[test]
    fn test_serde_notation() {
        let json = serde_json::to_string(&Cardinality::ManyToZeroOrOne).unwrap();
        assert_eq!(json, "\"N:0..1\"");
    }
}
