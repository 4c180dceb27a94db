//! Named base relations and views.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{EvalError, Result};
use crate::plan::QueryPlan;
use crate::relation::Relation;

/// Relations and views that plans can name in FROM.
///
/// Relations and views share one namespace.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    relations: BTreeMap<String, Relation>,
    views: BTreeMap<String, QueryPlan>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a base relation under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidPlan`] when the name is already taken.
    pub fn register(&mut self, relation: Relation) -> Result<()> {
        let name = relation.name().to_string();
        self.check_free(&name)?;
        debug!(relation = %name, rows = relation.len(), "registered relation");
        self.relations.insert(name, relation);
        Ok(())
    }

    /// Stores `plan` as a view, evaluated afresh wherever it is referenced.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidPlan`] when the name is already taken.
    pub fn create_view(&mut self, name: impl Into<String>, plan: QueryPlan) -> Result<()> {
        let name = name.into();
        self.check_free(&name)?;
        debug!(view = %name, "created view");
        self.views.insert(name, plan);
        Ok(())
    }

    fn check_free(&self, name: &str) -> Result<()> {
        if self.relations.contains_key(name) || self.views.contains_key(name) {
            return Err(EvalError::InvalidPlan(format!(
                "a relation or view named {name} already exists"
            )));
        }
        Ok(())
    }

    /// A base relation by name.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// A view by name.
    #[must_use]
    pub fn view(&self, name: &str) -> Option<&QueryPlan> {
        self.views.get(name)
    }

    /// Base relation names, sorted.
    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// View names, sorted.
    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Select;
    use crate::value::DataType;

    fn relation(name: &str) -> Relation {
        Relation::builder(name)
            .column("id", DataType::Integer)
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut catalog = Catalog::new();
        catalog.register(relation("b")).unwrap();
        catalog.register(relation("a")).unwrap();
        catalog
            .create_view("v", Select::new().all().from("a").build())
            .unwrap();
        assert!(catalog.relation("a").is_some());
        assert!(catalog.view("v").is_some());
        assert!(catalog.relation("v").is_none());
        assert_eq!(catalog.relation_names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(catalog.view_names().collect::<Vec<_>>(), vec!["v"]);
    }

    #[test]
    fn test_names_are_shared() {
        let mut catalog = Catalog::new();
        catalog.register(relation("a")).unwrap();
        assert!(catalog.register(relation("a")).is_err());
        assert!(catalog
            .create_view("a", Select::new().all().build())
            .is_err());
    }
}
