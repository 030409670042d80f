use crate::core::{PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Database vendor the data source talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbmsType {
    #[default]
    Postgres,
    Oracle,
    Mssql,
    Mysql,
    Hsql,
}

impl DbmsType {
    /// Name of the column that marks a row as soft-deleted.
    pub fn delete_ts_column(&self) -> &'static str {
        match self {
            DbmsType::Postgres | DbmsType::Mysql => "delete_ts",
            DbmsType::Oracle | DbmsType::Mssql | DbmsType::Hsql => "DELETE_TS",
        }
    }

    /// Schema to scope metadata lookups to.
    ///
    /// Oracle reports every schema the user can see, so lookups are limited to
    /// the connected user's own schema. Other vendors take no schema filter.
    pub fn metadata_schema(&self, user_name: &str) -> Option<String> {
        match self {
            DbmsType::Oracle => Some(user_name.to_string()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DbmsType::Postgres => "postgres",
            DbmsType::Oracle => "oracle",
            DbmsType::Mssql => "mssql",
            DbmsType::Mysql => "mysql",
            DbmsType::Hsql => "hsql",
        }
    }
}

impl FromStr for DbmsType {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DbmsType::Postgres),
            "oracle" => Ok(DbmsType::Oracle),
            "mssql" | "sqlserver" => Ok(DbmsType::Mssql),
            "mysql" => Ok(DbmsType::Mysql),
            "hsql" | "hsqldb" => Ok(DbmsType::Hsql),
            other => Err(PersistenceError::Config(format!("Unknown DBMS type '{}'", other))),
        }
    }
}

impl fmt::Display for DbmsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
