#![allow(dead_code)]

use async_trait::async_trait;
use entity_stats::{
    DataSource, InMemoryDatabase, InheritanceType, MetaClass, MetaModel, MetaProperty,
    MetadataConnection, Persistence, PersistenceConfig, PersistenceError, PersistenceManager,
    Result, StatisticsEntry, TableSchema, Transaction,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Tables: two soft-delete tables (mixed case), one plain table, one view.
pub fn seeded_database() -> InMemoryDatabase {
    let db = InMemoryDatabase::new();
    db.create_table(TableSchema::new("sec_user", &["id", "login", "delete_ts"]))
        .unwrap();
    db.create_table(TableSchema::new("Doc_Document", &["id", "delete_ts"]))
        .unwrap();
    db.create_table(TableSchema::new("sys_config", &["id", "value"]))
        .unwrap();
    db.create_table(TableSchema::new("sec_user_v", &["id", "delete_ts"]).view())
        .unwrap();
    db
}

pub fn metamodel() -> MetaModel {
    MetaModel::from_classes(vec![
        MetaClass::new("sec$User")
            .table("SEC_USER")
            .property(MetaProperty::new("roles").with_join_table("SEC_USER_ROLE_LINK")),
        MetaClass::new("doc$Document")
            .table("DOC_DOCUMENT")
            .inheritance(InheritanceType::Joined),
        MetaClass::new("doc$Contract")
            .table("DOC_CONTRACT")
            .extends("doc$Document"),
    ])
    .unwrap()
}

pub fn manager(db: &InMemoryDatabase, config: PersistenceConfig) -> PersistenceManager {
    PersistenceManager::in_memory(db.clone(), Arc::new(metamodel()), config).unwrap()
}

/// Data source that counts connections and holds each one open for a while,
/// widening the window in which concurrent first callers can race.
pub struct SlowDataSource {
    pub inner: InMemoryDatabase,
    pub connections: AtomicUsize,
    pub delay: Duration,
}

impl SlowDataSource {
    pub fn new(inner: InMemoryDatabase, delay: Duration) -> Self {
        Self {
            inner,
            connections: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl DataSource for SlowDataSource {
    async fn connection(&self) -> Result<Box<dyn MetadataConnection>> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.connection().await
    }
}

/// Data source whose connections fail column lookups while `failing` is set.
pub struct FlakyDataSource {
    pub inner: InMemoryDatabase,
    pub failing: Arc<AtomicBool>,
}

struct FlakyConnection {
    inner: Box<dyn MetadataConnection>,
    failing: Arc<AtomicBool>,
}

#[async_trait]
impl DataSource for FlakyDataSource {
    async fn connection(&self) -> Result<Box<dyn MetadataConnection>> {
        Ok(Box::new(FlakyConnection {
            inner: self.inner.connection().await?,
            failing: Arc::clone(&self.failing),
        }))
    }
}

#[async_trait]
impl MetadataConnection for FlakyConnection {
    fn user_name(&self) -> Result<String> {
        self.inner.user_name()
    }

    async fn list_tables(&mut self, schema: Option<&str>) -> Result<Vec<String>> {
        self.inner.list_tables(schema).await
    }

    async fn has_column(&mut self, schema: Option<&str>, table: &str, column: &str) -> Result<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Metadata("permission denied".into()));
        }
        self.inner.has_column(schema, table, column).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.inner.close().await
    }
}

/// Data source whose connections stall on every column lookup.
pub struct StallingDataSource {
    pub inner: InMemoryDatabase,
    pub stall: Duration,
}

struct StallingConnection {
    inner: Box<dyn MetadataConnection>,
    stall: Duration,
}

#[async_trait]
impl DataSource for StallingDataSource {
    async fn connection(&self) -> Result<Box<dyn MetadataConnection>> {
        Ok(Box::new(StallingConnection {
            inner: self.inner.connection().await?,
            stall: self.stall,
        }))
    }
}

#[async_trait]
impl MetadataConnection for StallingConnection {
    fn user_name(&self) -> Result<String> {
        self.inner.user_name()
    }

    async fn list_tables(&mut self, schema: Option<&str>) -> Result<Vec<String>> {
        self.inner.list_tables(schema).await
    }

    async fn has_column(&mut self, schema: Option<&str>, table: &str, column: &str) -> Result<bool> {
        tokio::time::sleep(self.stall).await;
        self.inner.has_column(schema, table, column).await
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.inner.close().await
    }
}

/// Persistence whose transactions refuse to commit while `failing` is set.
pub struct FailingCommitPersistence {
    pub inner: InMemoryDatabase,
    pub failing: Arc<AtomicBool>,
}

struct FailingCommitTransaction {
    inner: Box<dyn Transaction>,
    failing: Arc<AtomicBool>,
}

#[async_trait]
impl Persistence for FailingCommitPersistence {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(FailingCommitTransaction {
            inner: self.inner.begin().await?,
            failing: Arc::clone(&self.failing),
        }))
    }
}

#[async_trait]
impl Transaction for FailingCommitTransaction {
    async fn find_statistics(&mut self, name: Option<&str>) -> Result<Vec<StatisticsEntry>> {
        self.inner.find_statistics(name).await
    }

    async fn save_statistics(&mut self, entry: &StatisticsEntry) -> Result<()> {
        self.inner.save_statistics(entry).await
    }

    async fn delete_statistics(&mut self, name: &str) -> Result<u64> {
        self.inner.delete_statistics(name).await
    }

    async fn count_instances(&mut self, entity: &str) -> Result<i64> {
        self.inner.count_instances(entity).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            // Dropping the inner transaction uncommitted rolls it back
            return Err(PersistenceError::Query("deadlock detected".into()));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}
