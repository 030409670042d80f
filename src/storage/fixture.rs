use super::{InMemoryDatabase, TableSchema};
use crate::config::PersistenceConfig;
use crate::core::{Result, StatisticsEntry, StatisticsUpdate};
use crate::metamodel::{MetaClass, MetaModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// JSON description of a database, its metamodel and its statistics, used to
/// seed an [`InMemoryDatabase`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseFixture {
    pub config: PersistenceConfig,
    pub user: Option<String>,
    pub tables: Vec<TableSchema>,
    pub classes: Vec<MetaClass>,
    pub instance_counts: BTreeMap<String, i64>,
    pub statistics: Vec<FixtureStatistics>,
}

/// A statistics row without bookkeeping columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureStatistics {
    pub name: String,
    #[serde(flatten)]
    pub values: StatisticsUpdate,
}

impl From<&StatisticsEntry> for FixtureStatistics {
    fn from(entry: &StatisticsEntry) -> Self {
        Self {
            name: entry.name.clone(),
            values: StatisticsUpdate {
                instance_count: entry.instance_count,
                fetch_ui: entry.fetch_ui,
                max_fetch_ui: entry.max_fetch_ui,
                lazy_collection_threshold: entry.lazy_collection_threshold,
                lookup_screen_threshold: entry.lookup_screen_threshold,
            },
        }
    }
}

impl DatabaseFixture {
    pub fn from_json(content: &str) -> Result<Self> {
        let fixture: Self = serde_json::from_str(content)?;
        fixture.config.validate()?;
        Ok(fixture)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Builds the seeded database and the metamodel.
    pub fn build(&self) -> Result<(InMemoryDatabase, MetaModel)> {
        let db = match &self.user {
            Some(user) => InMemoryDatabase::with_user(user),
            None => InMemoryDatabase::new(),
        };

        for table in &self.tables {
            db.create_table(table.clone())?;
        }
        for (entity, count) in &self.instance_counts {
            db.set_instance_count(entity, *count)?;
        }
        for row in &self.statistics {
            let mut entry = StatisticsEntry::new(row.name.clone());
            entry.apply(&row.values);
            db.insert_statistics(entry)?;
        }

        let metamodel = MetaModel::from_classes(self.classes.clone())?;
        Ok((db, metamodel))
    }

    /// Replaces the fixture's statistics with the database's committed rows.
    pub fn capture_statistics(&mut self, db: &InMemoryDatabase) -> Result<()> {
        self.statistics = db
            .statistics_rows()?
            .iter()
            .map(FixtureStatistics::from)
            .collect();
        Ok(())
    }
}
