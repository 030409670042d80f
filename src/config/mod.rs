pub mod dialect;

pub use dialect::DbmsType;

use crate::core::{PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Defaults applied when an entity has no statistics row, or a row with the
/// relevant field unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Rows fetched into UI lists by default
    pub default_fetch_ui: i32,

    /// Upper bound on rows fetched into UI lists
    pub default_max_fetch_ui: i32,

    /// Instance count above which collections are loaded lazily
    pub default_lazy_collection_threshold: i32,

    /// Instance count above which a lookup screen replaces a drop-down
    pub default_lookup_screen_threshold: i32,

    /// Database vendor, drives dialect-specific metadata lookups
    pub dbms_type: DbmsType,

    /// Overrides the vendor's delete timestamp column name
    pub delete_ts_column: Option<String>,
}

impl PersistenceConfig {
    pub fn new() -> Self {
        Self {
            default_fetch_ui: 50,
            default_max_fetch_ui: 10000,
            default_lazy_collection_threshold: 50,
            default_lookup_screen_threshold: 100,
            dbms_type: DbmsType::default(),
            delete_ts_column: None,
        }
    }

    /// Set the default fetch size
    pub fn default_fetch_ui(mut self, value: i32) -> Self {
        self.default_fetch_ui = value;
        self
    }

    /// Set the default maximum fetch size
    pub fn default_max_fetch_ui(mut self, value: i32) -> Self {
        self.default_max_fetch_ui = value;
        self
    }

    /// Set the default lazy collection threshold
    pub fn default_lazy_collection_threshold(mut self, value: i32) -> Self {
        self.default_lazy_collection_threshold = value;
        self
    }

    /// Set the default lookup screen threshold
    pub fn default_lookup_screen_threshold(mut self, value: i32) -> Self {
        self.default_lookup_screen_threshold = value;
        self
    }

    /// Set the database vendor
    pub fn dbms_type(mut self, dbms_type: DbmsType) -> Self {
        self.dbms_type = dbms_type;
        self
    }

    /// Override the delete timestamp column name
    pub fn delete_ts_column(mut self, column: &str) -> Self {
        self.delete_ts_column = Some(column.to_string());
        self
    }

    /// Column used to detect soft-delete tables
    pub fn effective_delete_ts_column(&self) -> &str {
        self.delete_ts_column
            .as_deref()
            .unwrap_or_else(|| self.dbms_type.delete_ts_column())
    }

    /// Load from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_fetch_ui <= 0 {
            return Err(PersistenceError::Config("default_fetch_ui must be > 0".into()));
        }

        if self.default_max_fetch_ui < self.default_fetch_ui {
            return Err(PersistenceError::Config(
                "default_max_fetch_ui cannot be less than default_fetch_ui".into(),
            ));
        }

        if self.default_lazy_collection_threshold < 0 || self.default_lookup_screen_threshold < 0 {
            return Err(PersistenceError::Config("thresholds cannot be negative".into()));
        }

        if matches!(self.delete_ts_column.as_deref(), Some("")) {
            return Err(PersistenceError::Config("delete_ts_column cannot be empty".into()));
        }

        Ok(())
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PersistenceConfig::default();
        assert_eq!(config.default_fetch_ui, 50);
        assert_eq!(config.default_max_fetch_ui, 10000);
        assert_eq!(config.default_lazy_collection_threshold, 50);
        assert_eq!(config.default_lookup_screen_threshold, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PersistenceConfig::new()
            .default_fetch_ui(20)
            .default_lazy_collection_threshold(200)
            .dbms_type(DbmsType::Oracle);

        assert_eq!(config.default_fetch_ui, 20);
        assert_eq!(config.default_lazy_collection_threshold, 200);
        assert_eq!(config.effective_delete_ts_column(), "DELETE_TS");
    }

    #[test]
    fn test_delete_ts_override() {
        let config = PersistenceConfig::new().delete_ts_column("removed_at");
        assert_eq!(config.effective_delete_ts_column(), "removed_at");
    }

    #[test]
    fn test_from_json_partial() {
        let config = PersistenceConfig::from_json(
            r#"{ "default_fetch_ui": 25, "dbms_type": "mssql" }"#,
        )
        .unwrap();

        assert_eq!(config.default_fetch_ui, 25);
        assert_eq!(config.default_max_fetch_ui, 10000);
        assert_eq!(config.dbms_type, DbmsType::Mssql);
    }

    #[test]
    fn test_validation() {
        assert!(PersistenceConfig::new().default_fetch_ui(0).validate().is_err());
        assert!(
            PersistenceConfig::new()
                .default_fetch_ui(100)
                .default_max_fetch_ui(10)
                .validate()
                .is_err()
        );
        assert!(PersistenceConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{ "default_lookup_screen_threshold": 7, "dbms_type": "oracle" }"#,
        )
        .unwrap();

        let config = PersistenceConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.default_lookup_screen_threshold, 7);
        assert_eq!(config.default_fetch_ui, 50);
        assert_eq!(config.dbms_type, DbmsType::Oracle);

        assert!(PersistenceConfig::from_json_file(&file.path().with_extension("missing")).is_err());
    }
}
