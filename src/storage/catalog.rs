use super::{TableKind, TableSchema};
use crate::core::{PersistenceError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Relation metadata, copy-on-write so readers can clone it without locking.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Arc<HashMap<(Option<String>, String), TableSchema>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new catalog containing `schema`; `self` is left untouched.
    pub fn with_table(self, schema: TableSchema) -> Result<Self> {
        let key = (schema.schema().map(str::to_string), schema.name().to_string());

        if self.tables.contains_key(&key) {
            return Err(PersistenceError::Metadata(format!(
                "Relation '{}' already exists",
                schema.name()
            )));
        }

        let mut new_tables = (*self.tables).clone();
        new_tables.insert(key, schema);

        Ok(Self {
            tables: Arc::new(new_tables),
        })
    }

    /// Base tables visible under `schema`, sorted by name.
    pub fn list_tables(&self, schema: Option<&str>) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tables
            .values()
            .filter(|t| t.kind() == TableKind::Table && t.matches_schema(schema))
            .map(|t| t.name())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn find_table(&self, schema: Option<&str>, name: &str) -> Option<&TableSchema> {
        self.tables
            .values()
            .find(|t| t.name() == name && t.matches_schema(schema))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
