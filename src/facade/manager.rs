use crate::config::PersistenceConfig;
use crate::core::{Result, StatisticsEntry, StatisticsUpdate};
use crate::introspect::{MetaModelScanner, SchemaIntrospector};
use crate::metamodel::MetaModelProvider;
use crate::statistics::{StatisticsCache, StatisticsStore};
use crate::storage::{DataSource, InMemoryDatabase, Persistence};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Answers "what does the schema and usage look like" for the rest of the
/// application.
///
/// Three independently guarded caches sit behind it: the soft-delete table
/// set, the secondary table set and the statistics map. The table sets are
/// computed once and never invalidated; the statistics map is reloaded after
/// any administrative change.
pub struct PersistenceManager {
    config: PersistenceConfig,
    schema: SchemaIntrospector,
    secondary: MetaModelScanner,
    store: Arc<StatisticsStore>,
    cache: StatisticsCache,
}

impl PersistenceManager {
    pub fn new(
        data_source: Arc<dyn DataSource>,
        persistence: Arc<dyn Persistence>,
        metamodel: Arc<dyn MetaModelProvider>,
        config: PersistenceConfig,
    ) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(StatisticsStore::new(persistence));
        Ok(Self {
            schema: SchemaIntrospector::new(data_source, &config),
            secondary: MetaModelScanner::new(metamodel),
            cache: StatisticsCache::new(Arc::clone(&store)),
            store,
            config,
        })
    }

    /// Manager backed entirely by an in-process database.
    pub fn in_memory(
        db: InMemoryDatabase,
        metamodel: Arc<dyn MetaModelProvider>,
        config: PersistenceConfig,
    ) -> Result<Self> {
        let data_source: Arc<dyn DataSource> = Arc::new(db.clone());
        let persistence: Arc<dyn Persistence> = Arc::new(db);
        Self::new(data_source, persistence, metamodel, config)
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn schema_introspector(&self) -> &SchemaIntrospector {
        &self.schema
    }

    pub fn metamodel_scanner(&self) -> &MetaModelScanner {
        &self.secondary
    }

    pub fn statistics_cache(&self) -> &StatisticsCache {
        &self.cache
    }

    // ------------------------------------------------------------------
    // Schema decisions
    // ------------------------------------------------------------------

    /// Whether `table` has the delete timestamp column. Case-insensitive.
    pub async fn is_soft_delete_for(&self, table: &str) -> Result<bool> {
        let tables = self.schema.soft_delete_tables().await?;
        Ok(tables.contains(&table.to_lowercase()))
    }

    /// Soft-delete tables, lower-cased and sorted.
    pub async fn get_soft_delete_tables(&self) -> Result<Vec<String>> {
        let tables = self.schema.soft_delete_tables().await?;
        let mut list: Vec<String> = tables.iter().cloned().collect();
        list.sort();
        Ok(list)
    }

    /// Whether `table` is a join table or a joined-inheritance child table.
    /// Case-sensitive: names are compared as declared in the mappings.
    pub async fn is_secondary_table(&self, table: &str) -> Result<bool> {
        let tables = self.secondary.secondary_tables().await?;
        Ok(tables.contains(table))
    }

    // ------------------------------------------------------------------
    // Statistics decisions
    // ------------------------------------------------------------------

    pub async fn use_lazy_collection(&self, entity_name: &str) -> Result<bool> {
        let entry = self.cache.entry(entity_name).await?;
        Ok(exceeds_threshold(
            entry.as_deref(),
            |es| es.lazy_collection_threshold,
            self.config.default_lazy_collection_threshold,
        ))
    }

    pub async fn use_lookup_screen(&self, entity_name: &str) -> Result<bool> {
        let entry = self.cache.entry(entity_name).await?;
        Ok(exceeds_threshold(
            entry.as_deref(),
            |es| es.lookup_screen_threshold,
            self.config.default_lookup_screen_threshold,
        ))
    }

    pub async fn get_fetch_ui(&self, entity_name: &str) -> Result<i32> {
        let entry = self.cache.entry(entity_name).await?;
        Ok(entry
            .and_then(|es| es.fetch_ui)
            .unwrap_or(self.config.default_fetch_ui))
    }

    pub async fn get_max_fetch_ui(&self, entity_name: &str) -> Result<i32> {
        let entry = self.cache.entry(entity_name).await?;
        Ok(entry
            .and_then(|es| es.max_fetch_ui)
            .unwrap_or(self.config.default_max_fetch_ui))
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Creates or partially updates the statistics row for `name`.
    pub async fn enter_statistics(
        &self,
        name: &str,
        update: StatisticsUpdate,
    ) -> Result<StatisticsEntry> {
        let entry = self.store.upsert(name, &update).await?;
        self.cache.invalidate().await?;
        Ok(entry)
    }

    pub async fn delete_statistics(&self, name: &str) -> Result<()> {
        self.store.delete(name).await?;
        self.cache.invalidate().await
    }

    /// Recounts `name`'s instances and patches the live cache with the new
    /// row. Other cached rows are left as they are. If the cache was flushed
    /// while the count ran, it is flushed again rather than patched.
    pub async fn refresh_statistics_for_entity(&self, name: &str) -> Result<Arc<StatisticsEntry>> {
        debug!("Refreshing statistics for entity {}", name);
        let live = self.cache.live_map().await?;
        let entry = self.store.refresh_instance_count(name).await?;
        self.cache.put_if_live(&live, entry).await
    }

    pub async fn flush_statistics_cache(&self) -> Result<()> {
        self.cache.invalidate().await
    }

    pub async fn get_entity_statistics(&self) -> Result<BTreeMap<String, Arc<StatisticsEntry>>> {
        self.cache.get_sorted().await
    }
}

/// An entity qualifies once its known instance count is strictly above its
/// threshold. No row, or no count, never qualifies.
fn exceeds_threshold(
    entry: Option<&StatisticsEntry>,
    threshold: impl Fn(&StatisticsEntry) -> Option<i32>,
    default: i32,
) -> bool {
    match entry {
        Some(es) => match es.instance_count {
            Some(count) => count > i64::from(threshold(es).unwrap_or(default)),
            None => false,
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(count: Option<i64>, threshold: Option<i32>) -> StatisticsEntry {
        let mut es = StatisticsEntry::new("x");
        es.instance_count = count;
        es.lazy_collection_threshold = threshold;
        es
    }

    #[test]
    fn test_threshold_policy() {
        let pick = |es: &StatisticsEntry| es.lazy_collection_threshold;

        assert!(!exceeds_threshold(None, pick, 0));
        assert!(!exceeds_threshold(Some(&entry(None, Some(0))), pick, 0));
        assert!(exceeds_threshold(Some(&entry(Some(150), None)), pick, 100));
        assert!(!exceeds_threshold(Some(&entry(Some(150), None)), pick, 200));
        assert!(!exceeds_threshold(Some(&entry(Some(100), None)), pick, 100));
        assert!(exceeds_threshold(Some(&entry(Some(150), Some(10))), pick, 1000));
    }
}
