//! Static entity metamodel: persistent classes, their mapped tables,
//! properties and inheritance declarations.

use crate::core::{PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InheritanceType {
    SingleTable,
    Joined,
    TablePerClass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaProperty {
    pub name: String,
    /// Join table mapping this property, if it has one
    #[serde(default)]
    pub join_table: Option<String>,
}

impl MetaProperty {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            join_table: None,
        }
    }

    pub fn with_join_table(mut self, table: &str) -> Self {
        self.join_table = Some(table.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaClass {
    pub name: String,
    /// Declared table name
    #[serde(default)]
    pub table: Option<String>,
    /// Inheritance strategy declared on this class
    #[serde(default)]
    pub inheritance: Option<InheritanceType>,
    /// Direct superclass name
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub properties: Vec<MetaProperty>,
    #[serde(default = "default_persistent")]
    pub persistent: bool,
}

fn default_persistent() -> bool {
    true
}

impl MetaClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            inheritance: None,
            parent: None,
            properties: Vec::new(),
            persistent: true,
        }
    }

    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn inheritance(mut self, strategy: InheritanceType) -> Self {
        self.inheritance = Some(strategy);
        self
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn property(mut self, property: MetaProperty) -> Self {
        self.properties.push(property);
        self
    }

    /// Marks a type the persistence layer does not map (embeddable, DTO).
    pub fn transient(mut self) -> Self {
        self.persistent = false;
        self
    }
}

/// Read access to the metamodel.
pub trait MetaModelProvider: Send + Sync {
    /// Every persistent entity type
    fn persistent_classes(&self) -> Vec<&MetaClass>;

    /// Superclasses of `class`, nearest first
    fn ancestors(&self, class: &MetaClass) -> Vec<&MetaClass>;
}

/// Registry of meta classes keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaModel {
    classes: BTreeMap<String, MetaClass>,
}

impl MetaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: MetaClass) -> Result<()> {
        if self.classes.contains_key(&class.name) {
            return Err(PersistenceError::Metadata(format!(
                "Meta class '{}' already registered",
                class.name
            )));
        }
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    pub fn with_class(mut self, class: MetaClass) -> Result<Self> {
        self.register(class)?;
        Ok(self)
    }

    /// Builds a model from a list of classes, rejecting duplicates.
    pub fn from_classes(classes: Vec<MetaClass>) -> Result<Self> {
        let mut model = Self::new();
        for class in classes {
            model.register(class)?;
        }
        Ok(model)
    }

    pub fn get(&self, name: &str) -> Option<&MetaClass> {
        self.classes.get(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl MetaModelProvider for MetaModel {
    fn persistent_classes(&self) -> Vec<&MetaClass> {
        self.classes.values().filter(|c| c.persistent).collect()
    }

    fn ancestors(&self, class: &MetaClass) -> Vec<&MetaClass> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([class.name.as_str()]);
        let mut next = class.parent.as_deref();

        while let Some(name) = next {
            // Unknown parents end the chain, so do cycles
            let Some(parent) = self.classes.get(name) else { break };
            if !seen.insert(parent.name.as_str()) {
                break;
            }
            result.push(parent);
            next = parent.parent.as_deref();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> MetaModel {
        MetaModel::from_classes(vec![
            MetaClass::new("Base").inheritance(InheritanceType::Joined).table("BASE"),
            MetaClass::new("Middle").extends("Base").table("MIDDLE"),
            MetaClass::new("Leaf").extends("Middle").table("LEAF"),
            MetaClass::new("Address").transient(),
        ])
        .unwrap()
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let model = model();
        let leaf = model.get("Leaf").unwrap();
        let names: Vec<&str> = model.ancestors(leaf).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Middle", "Base"]);
    }

    #[test]
    fn test_ancestor_cycle_terminates() {
        let model = MetaModel::from_classes(vec![
            MetaClass::new("A").extends("B"),
            MetaClass::new("B").extends("A"),
        ])
        .unwrap();
        let a = model.get("A").unwrap();
        assert_eq!(model.ancestors(a).len(), 1);
    }

    #[test]
    fn test_transient_classes_are_skipped() {
        let model = model();
        assert_eq!(model.len(), 4);
        assert_eq!(model.persistent_classes().len(), 3);
    }

    #[test]
    fn test_duplicate_registration() {
        assert!(model().with_class(MetaClass::new("Leaf")).is_err());
    }
}
