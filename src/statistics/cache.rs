use super::StatisticsStore;
use crate::core::{LazyInit, Result, StatisticsEntry};
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Entity name to statistics row. Cloning is O(1) thanks to structural
/// sharing, so readers take cheap snapshots.
pub type StatisticsMap = im::HashMap<String, Arc<StatisticsEntry>>;

/// Lazily loaded, explicitly invalidated view of the statistics table.
///
/// Invalidation swaps the published map out; it never clears a map readers may
/// still hold.
pub struct StatisticsCache {
    store: Arc<StatisticsStore>,
    map: LazyInit<RwLock<StatisticsMap>>,
}

impl StatisticsCache {
    pub fn new(store: Arc<StatisticsStore>) -> Self {
        Self {
            store,
            map: LazyInit::new(),
        }
    }

    /// Snapshot of the cached map, loading it from the store if needed.
    pub async fn get(&self) -> Result<StatisticsMap> {
        let map = self.loaded().await?;
        let snapshot = map.read()?.clone();
        Ok(snapshot)
    }

    /// Cached row for one entity.
    pub async fn entry(&self, name: &str) -> Result<Option<Arc<StatisticsEntry>>> {
        let map = self.loaded().await?;
        let entry = map.read()?.get(name).cloned();
        Ok(entry)
    }

    /// Snapshot ordered by entity name.
    pub async fn get_sorted(&self) -> Result<BTreeMap<String, Arc<StatisticsEntry>>> {
        Ok(self.get().await?.into_iter().collect())
    }

    /// Replaces one entity's row in the live map, loading the map first if
    /// the cache is cold.
    pub async fn put(&self, entry: StatisticsEntry) -> Result<Arc<StatisticsEntry>> {
        let live = self.live_map().await?;
        self.put_if_live(&live, entry).await
    }

    /// The currently published map, loading it if the cache is cold. Pair
    /// with [`put_if_live`](Self::put_if_live) to patch it after a store write.
    pub async fn live_map(&self) -> Result<Arc<RwLock<StatisticsMap>>> {
        self.loaded().await
    }

    /// Patches `live` with `entry` if it is still the published map. If the
    /// map was invalidated in the meantime, `entry` may predate the rows a
    /// reload picked up, so the cache is invalidated again and the next read
    /// goes back to the store.
    pub async fn put_if_live(
        &self,
        live: &Arc<RwLock<StatisticsMap>>,
        entry: StatisticsEntry,
    ) -> Result<Arc<StatisticsEntry>> {
        let entry = Arc::new(entry);
        match self.map.get()? {
            Some(current) if Arc::ptr_eq(&current, live) => {
                live.write()?.insert(entry.name.clone(), Arc::clone(&entry));
            }
            _ => {
                debug!("Statistics map replaced before patching {}, invalidating", entry.name);
                self.invalidate().await?;
            }
        }
        Ok(entry)
    }

    /// Drops the cached map; the next read reloads it.
    pub async fn invalidate(&self) -> Result<()> {
        self.map.reset().await
    }

    pub fn is_loaded(&self) -> bool {
        self.map.is_initialized()
    }

    /// Number of full loads from the store so far.
    pub fn load_count(&self) -> u64 {
        self.map.init_count()
    }

    async fn loaded(&self) -> Result<Arc<RwLock<StatisticsMap>>> {
        self.map.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<RwLock<StatisticsMap>> {
        info!("Loading statistics cache");
        let map: StatisticsMap = self
            .store
            .find_all()
            .await?
            .into_iter()
            .map(|entry| (entry.name.clone(), Arc::new(entry)))
            .collect();
        Ok(RwLock::new(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDatabase;

    fn cache_with(names: &[&str]) -> (InMemoryDatabase, StatisticsCache) {
        let db = InMemoryDatabase::new();
        for name in names {
            db.insert_statistics(StatisticsEntry::new(*name)).unwrap();
        }
        let store = Arc::new(StatisticsStore::new(Arc::new(db.clone())));
        (db, StatisticsCache::new(store))
    }

    #[tokio::test]
    async fn test_lazy_load_once() {
        let (_db, cache) = cache_with(&["b", "a"]);
        assert!(!cache.is_loaded());

        assert_eq!(cache.get().await.unwrap().len(), 2);
        assert!(cache.entry("a").await.unwrap().is_some());
        assert_eq!(cache.load_count(), 1);
    }

    #[tokio::test]
    async fn test_sorted_view() {
        let (_db, cache) = cache_with(&["c", "a", "b"]);
        let keys: Vec<String> = cache.get_sorted().await.unwrap().into_keys().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_invalidate_reloads() {
        let (db, cache) = cache_with(&["a"]);
        cache.get().await.unwrap();

        db.insert_statistics(StatisticsEntry::new("b")).unwrap();
        assert_eq!(cache.get().await.unwrap().len(), 1);

        cache.invalidate().await.unwrap();
        assert!(!cache.is_loaded());
        assert_eq!(cache.get().await.unwrap().len(), 2);
        assert_eq!(cache.load_count(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_survives_invalidation() {
        let (_db, cache) = cache_with(&["a"]);
        let snapshot = cache.get().await.unwrap();

        cache.invalidate().await.unwrap();
        assert!(snapshot.contains_key("a"));
    }

    #[tokio::test]
    async fn test_put_after_reload_invalidates_instead_of_patching() {
        let (db, cache) = cache_with(&["a"]);
        let live = cache.live_map().await.unwrap();

        // Another writer lands a newer row and a reader reloads
        let mut newer = StatisticsEntry::new("a");
        newer.fetch_ui = Some(2);
        db.insert_statistics(newer).unwrap();
        cache.invalidate().await.unwrap();
        assert_eq!(cache.entry("a").await.unwrap().unwrap().fetch_ui, Some(2));

        let mut older = StatisticsEntry::new("a");
        older.fetch_ui = Some(1);
        cache.put_if_live(&live, older).await.unwrap();

        assert!(!cache.is_loaded());
        assert_eq!(cache.entry("a").await.unwrap().unwrap().fetch_ui, Some(2));
        assert_eq!(cache.load_count(), 3);
    }

    #[tokio::test]
    async fn test_put_on_cold_cache_loads_first() {
        let (_db, cache) = cache_with(&["a", "b"]);

        cache.put(StatisticsEntry::new("c")).await.unwrap();

        assert_eq!(cache.load_count(), 1);
        assert_eq!(cache.get().await.unwrap().len(), 3);
    }
}
