use super::engine::{DataSource, MetadataConnection, Persistence, Transaction};
use super::{Catalog, TableSchema};
use crate::core::{PersistenceError, Result, StatisticsEntry};
use crate::transaction::{Change, TransactionId, TransactionState};
use async_trait::async_trait;
use log::trace;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// In-process database implementing every collaborator contract.
///
/// Holds a relation catalog for metadata introspection, the committed
/// statistics table, and per-entity instance counts standing in for the
/// object model's `count(e)` queries. Cloning shares the same state.
#[derive(Clone)]
pub struct InMemoryDatabase {
    shared: Arc<Shared>,
}

struct Shared {
    user_name: String,
    catalog: RwLock<Catalog>,
    statistics: RwLock<HashMap<String, StatisticsEntry>>,
    instance_counts: RwLock<HashMap<String, i64>>,
    next_transaction_id: AtomicU64,
    counters: Counters,
}

#[derive(Default)]
struct Counters {
    connections_opened: AtomicUsize,
    connections_closed: AtomicUsize,
    connections_dropped: AtomicUsize,
    table_listings: AtomicUsize,
    transactions_begun: AtomicUsize,
    transactions_committed: AtomicUsize,
    transactions_rolled_back: AtomicUsize,
}

/// Usage counters, mainly for asserting resource hygiene in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub connections_opened: usize,
    pub connections_closed: usize,
    /// Connections dropped without an explicit `close`
    pub connections_dropped: usize,
    pub table_listings: usize,
    pub transactions_begun: usize,
    pub transactions_committed: usize,
    pub transactions_rolled_back: usize,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::with_user("sa")
    }

    /// Database whose connections authenticate as `user_name`.
    pub fn with_user(user_name: &str) -> Self {
        Self {
            shared: Arc::new(Shared {
                user_name: user_name.to_string(),
                catalog: RwLock::new(Catalog::new()),
                statistics: RwLock::new(HashMap::new()),
                instance_counts: RwLock::new(HashMap::new()),
                next_transaction_id: AtomicU64::new(1),
                counters: Counters::default(),
            }),
        }
    }

    pub fn create_table(&self, schema: TableSchema) -> Result<()> {
        let mut catalog = self.shared.catalog.write()?;
        let next = catalog.clone().with_table(schema)?;
        *catalog = next;
        Ok(())
    }

    /// Number of persisted instances `count(e)` reports for `entity`.
    pub fn set_instance_count(&self, entity: &str, count: i64) -> Result<()> {
        self.shared
            .instance_counts
            .write()?
            .insert(entity.to_string(), count);
        Ok(())
    }

    /// Writes a committed statistics row directly, bypassing transactions.
    pub fn insert_statistics(&self, entry: StatisticsEntry) -> Result<()> {
        self.shared
            .statistics
            .write()?
            .insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Committed statistics rows sorted by entity name.
    pub fn statistics_rows(&self) -> Result<Vec<StatisticsEntry>> {
        let mut rows: Vec<StatisticsEntry> =
            self.shared.statistics.read()?.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    pub fn stats(&self) -> DatabaseStats {
        let c = &self.shared.counters;
        DatabaseStats {
            connections_opened: c.connections_opened.load(Ordering::SeqCst),
            connections_closed: c.connections_closed.load(Ordering::SeqCst),
            connections_dropped: c.connections_dropped.load(Ordering::SeqCst),
            table_listings: c.table_listings.load(Ordering::SeqCst),
            transactions_begun: c.transactions_begun.load(Ordering::SeqCst),
            transactions_committed: c.transactions_committed.load(Ordering::SeqCst),
            transactions_rolled_back: c.transactions_rolled_back.load(Ordering::SeqCst),
        }
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for InMemoryDatabase {
    async fn connection(&self) -> Result<Box<dyn MetadataConnection>> {
        let catalog = self.shared.catalog.read()?.clone();
        self.shared
            .counters
            .connections_opened
            .fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemoryConnection {
            shared: Arc::clone(&self.shared),
            catalog,
            closed: false,
        }))
    }
}

#[async_trait]
impl Persistence for InMemoryDatabase {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let id = self
            .shared
            .next_transaction_id
            .fetch_add(1, Ordering::SeqCst);
        self.shared
            .counters
            .transactions_begun
            .fetch_add(1, Ordering::SeqCst);
        trace!("begin transaction {}", id);

        Ok(Box::new(MemoryTransaction {
            id,
            shared: Arc::clone(&self.shared),
            changes: Vec::new(),
            state: TransactionState::Active,
        }))
    }
}

/// Connection over a catalog snapshot taken when it was opened.
struct MemoryConnection {
    shared: Arc<Shared>,
    catalog: Catalog,
    closed: bool,
}

#[async_trait]
impl MetadataConnection for MemoryConnection {
    fn user_name(&self) -> Result<String> {
        Ok(self.shared.user_name.clone())
    }

    async fn list_tables(&mut self, schema: Option<&str>) -> Result<Vec<String>> {
        self.shared
            .counters
            .table_listings
            .fetch_add(1, Ordering::SeqCst);
        Ok(self
            .catalog
            .list_tables(schema)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    async fn has_column(&mut self, schema: Option<&str>, table: &str, column: &str) -> Result<bool> {
        Ok(self
            .catalog
            .find_table(schema, table)
            .is_some_and(|t| t.has_column(column)))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.closed = true;
        this.shared
            .counters
            .connections_closed
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if !self.closed {
            self.shared
                .counters
                .connections_dropped
                .fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Buffers changes and applies them to the committed table on commit.
struct MemoryTransaction {
    id: TransactionId,
    shared: Arc<Shared>,
    changes: Vec<Change>,
    state: TransactionState,
}

impl MemoryTransaction {
    fn ensure_active(&self) -> Result<()> {
        if !self.state.is_active() {
            return Err(PersistenceError::Query(format!(
                "Transaction {} is not active",
                self.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn find_statistics(&mut self, name: Option<&str>) -> Result<Vec<StatisticsEntry>> {
        self.ensure_active()?;

        // Committed rows overlaid with this transaction's own pending changes
        let mut rows = self.shared.statistics.read()?.clone();
        for change in &self.changes {
            change.apply_to(&mut rows);
        }

        Ok(match name {
            Some(name) => rows.remove(name).into_iter().collect(),
            None => rows.into_values().collect(),
        })
    }

    async fn save_statistics(&mut self, entry: &StatisticsEntry) -> Result<()> {
        self.ensure_active()?;
        self.changes.push(Change::SaveStatistics {
            entry: entry.clone(),
        });
        Ok(())
    }

    async fn delete_statistics(&mut self, name: &str) -> Result<u64> {
        let existing = self.find_statistics(Some(name)).await?;
        self.changes.push(Change::DeleteStatistics {
            name: name.to_string(),
        });
        Ok(existing.len() as u64)
    }

    async fn count_instances(&mut self, entity: &str) -> Result<i64> {
        self.ensure_active()?;
        self.shared
            .instance_counts
            .read()?
            .get(entity)
            .copied()
            .ok_or_else(|| PersistenceError::Query(format!("Unknown entity '{}'", entity)))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.ensure_active()?;
        {
            let mut rows = this.shared.statistics.write()?;
            for change in &this.changes {
                change.apply_to(&mut rows);
            }
        }
        this.state = TransactionState::Committed;
        this.shared
            .counters
            .transactions_committed
            .fetch_add(1, Ordering::SeqCst);
        trace!("commit transaction {} ({} changes)", this.id, this.changes.len());
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.ensure_active()?;
        this.abort();
        Ok(())
    }
}

impl MemoryTransaction {
    fn abort(&mut self) {
        self.changes.clear();
        self.state = TransactionState::Aborted;
        self.shared
            .counters
            .transactions_rolled_back
            .fetch_add(1, Ordering::SeqCst);
        trace!("rollback transaction {}", self.id);
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.state.is_active() {
            self.abort();
        }
    }
}
