use crate::core::{Result, StatisticsEntry};
use async_trait::async_trait;

/// Source of physical connections used for schema introspection.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Open one connection. The caller must `close` it on every exit path.
    async fn connection(&self) -> Result<Box<dyn MetadataConnection>>;
}

/// Metadata view of a single physical connection.
#[async_trait]
pub trait MetadataConnection: Send {
    /// User the connection is authenticated as
    fn user_name(&self) -> Result<String>;

    /// Names of all base tables (views excluded), optionally scoped to a schema
    async fn list_tables(&mut self, schema: Option<&str>) -> Result<Vec<String>>;

    /// Whether `table` declares a column called `column`
    async fn has_column(&mut self, schema: Option<&str>, table: &str, column: &str) -> Result<bool>;

    /// Release the connection
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Transactional unit-of-work provider over the persistent object model.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}

/// An open unit of work. Dropping it without `commit` discards its changes.
#[async_trait]
pub trait Transaction: Send {
    /// Statistics rows, all of them or only the one named
    async fn find_statistics(&mut self, name: Option<&str>) -> Result<Vec<StatisticsEntry>>;

    /// Insert or replace the row keyed by `entry.name`
    async fn save_statistics(&mut self, entry: &StatisticsEntry) -> Result<()>;

    /// Delete the row keyed by `name`, returning the number of rows removed
    async fn delete_statistics(&mut self, name: &str) -> Result<u64>;

    /// `select count(e) from <entity> e`
    async fn count_instances(&mut self, entity: &str) -> Result<i64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
