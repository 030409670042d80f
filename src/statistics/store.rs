use crate::core::{PersistenceError, Result, StatisticsEntry, StatisticsUpdate};
use crate::storage::{Persistence, Transaction};
use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;

/// Transactional access to the entity statistics table.
///
/// Every operation is its own unit of work: begin, act, commit. A failure
/// rolls the transaction back and surfaces as [`PersistenceError::Store`].
pub struct StatisticsStore {
    persistence: Arc<dyn Persistence>,
}

impl StatisticsStore {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }

    /// All rows, in storage order.
    pub async fn find_all(&self) -> Result<Vec<StatisticsEntry>> {
        let mut tx = self.begin().await?;
        let result = tx.find_statistics(None).await;
        finish(tx, result).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<StatisticsEntry>> {
        let mut tx = self.begin().await?;
        let result = tx
            .find_statistics(Some(name))
            .await
            .map(|rows| rows.into_iter().next());
        finish(tx, result).await
    }

    /// Loads the row for `name`, creating it if absent, and overwrites only the
    /// fields set in `update`.
    pub async fn upsert(&self, name: &str, update: &StatisticsUpdate) -> Result<StatisticsEntry> {
        let mut tx = self.begin().await?;
        let result = upsert_in(tx.as_mut(), name, update).await;
        finish(tx, result).await
    }

    /// Deletes the row for `name`; returns the number of rows removed.
    pub async fn delete(&self, name: &str) -> Result<u64> {
        let mut tx = self.begin().await?;
        let result = tx.delete_statistics(name).await;
        finish(tx, result).await
    }

    /// Runs `count(e)` over the entity's mapped table(s).
    pub async fn count_instances(&self, entity: &str) -> Result<i64> {
        let mut tx = self.begin().await?;
        let result = tx.count_instances(entity).await;
        finish(tx, result).await
    }

    /// Counts the entity's instances and stores the count, in one unit of work.
    pub async fn refresh_instance_count(&self, entity: &str) -> Result<StatisticsEntry> {
        let mut tx = self.begin().await?;
        let result = refresh_in(tx.as_mut(), entity).await;
        finish(tx, result).await
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        self.persistence
            .begin()
            .await
            .map_err(PersistenceError::store)
    }
}

async fn upsert_in(
    tx: &mut dyn Transaction,
    name: &str,
    update: &StatisticsUpdate,
) -> Result<StatisticsEntry> {
    let existing = tx.find_statistics(Some(name)).await?.into_iter().next();
    let mut entry = match existing {
        Some(mut entry) => {
            entry.updated_at = Some(Utc::now());
            entry
        }
        None => StatisticsEntry::new(name),
    };

    entry.apply(update);
    tx.save_statistics(&entry).await?;
    Ok(entry)
}

async fn refresh_in(tx: &mut dyn Transaction, entity: &str) -> Result<StatisticsEntry> {
    let count = tx.count_instances(entity).await?;
    debug!("Entity {} has {} instances", entity, count);
    upsert_in(tx, entity, &StatisticsUpdate::new().instance_count(count)).await
}

async fn finish<T>(tx: Box<dyn Transaction>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(PersistenceError::store)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!("Rollback failed: {}", rollback);
            }
            Err(PersistenceError::store(e))
        }
    }
}
