use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Table,
    View,
}

/// Catalog entry for one relation: its schema, kind and column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default = "default_kind")]
    kind: TableKind,
    columns: Vec<String>,
}

fn default_kind() -> TableKind {
    TableKind::Table
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            schema: None,
            kind: TableKind::Table,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn in_schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.to_string());
        self
    }

    pub fn view(mut self) -> Self {
        self.kind = TableKind::View;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// A `None` filter matches every schema.
    pub fn matches_schema(&self, schema: Option<&str>) -> bool {
        match schema {
            None => true,
            Some(wanted) => self.schema.as_deref() == Some(wanted),
        }
    }
}
