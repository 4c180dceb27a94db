//! # oxide-rel-core
//!
//! An interpreter for relational query semantics: given relations (named
//! multisets of rows) and a query plan, it computes the result a SQL engine
//! must produce.
//!
//! This crate provides:
//! - Three-valued NULL logic ([`logic`])
//! - INNER, LEFT, RIGHT, FULL and CROSS joins with nested-loop and hash
//!   strategies ([`join`])
//! - Scalar, EXISTS and IN sub-selects with correlation ([`subquery`])
//! - UNION and UNION ALL ([`set_ops`])
//! - A clause pipeline evaluating FROM, WHERE, GROUP BY, HAVING, window
//!   functions, SELECT, DISTINCT, ORDER BY and LIMIT in that order
//!   ([`pipeline`])
//! - Join cardinality checks ([`cardinality`]) and column profiling
//!   ([`profile`])
//!
//! ## Example
//!
//! ```rust
//! use oxide_rel_core::expr::{col, count_star, lit};
//! use oxide_rel_core::plan::Select;
//! use oxide_rel_core::relation::Relation;
//! use oxide_rel_core::value::DataType;
//! use oxide_rel_core::{row, Catalog, Evaluator};
//!
//! let mut catalog = Catalog::new();
//! catalog
//!     .register(
//!         Relation::builder("users")
//!             .column("name", DataType::Text)
//!             .column("dob", DataType::Integer)
//!             .rows([row!["ann", 2005], row!["bob", 2007], row!["cy", 2005]])
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let plan = Select::new()
//!     .columns([col("dob").into(), count_star().alias("n")])
//!     .from("users")
//!     .group_by([col("dob")])
//!     .having(count_star().gt(lit(1)))
//!     .build();
//!
//! let result = Evaluator::new(&catalog).evaluate(&plan).unwrap();
//! assert_eq!(result.rows(), &[row![2005, 2]]);
//! ```

pub mod aggregate;
pub mod cardinality;
pub mod catalog;
pub mod error;
pub mod eval;
pub mod expr;
pub mod join;
pub mod logic;
pub mod pipeline;
pub mod plan;
pub mod profile;
pub mod relation;
pub mod set_ops;
pub mod subquery;
pub mod value;
pub mod window;

pub use cardinality::Cardinality;
pub use catalog::Catalog;
pub use error::{EvalError, Result, Stage};
pub use expr::{col, lit, Expr};
pub use join::{cross_join, hash_join, join, JoinKind, JoinStrategy};
pub use logic::TriBool;
pub use pipeline::{evaluate, EvalOptions, Evaluator};
pub use plan::{QueryPlan, Select, Source};
pub use profile::profile;
pub use relation::{Relation, Row, Schema};
pub use set_ops::{union, union_all};
pub use value::{DataType, Value};

/// The NULL value, for use in [`row!`].
pub const NULL: Value = Value::Null;
