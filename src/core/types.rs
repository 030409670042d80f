use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the entity statistics table.
///
/// Every numeric field is optional: `None` means "use the configured default",
/// it never means zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsEntry {
    pub id: Uuid,
    pub name: String,
    pub instance_count: Option<i64>,
    pub fetch_ui: Option<i32>,
    pub max_fetch_ui: Option<i32>,
    pub lazy_collection_threshold: Option<i32>,
    pub lookup_screen_threshold: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StatisticsEntry {
    /// Fresh row with no metrics set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            instance_count: None,
            fetch_ui: None,
            max_fetch_ui: None,
            lazy_collection_threshold: None,
            lookup_screen_threshold: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Overwrites only the fields present in `update`.
    pub fn apply(&mut self, update: &StatisticsUpdate) {
        if let Some(count) = update.instance_count {
            self.instance_count = Some(count);
        }
        if let Some(fetch_ui) = update.fetch_ui {
            self.fetch_ui = Some(fetch_ui);
        }
        if let Some(max_fetch_ui) = update.max_fetch_ui {
            self.max_fetch_ui = Some(max_fetch_ui);
        }
        if let Some(threshold) = update.lazy_collection_threshold {
            self.lazy_collection_threshold = Some(threshold);
        }
        if let Some(threshold) = update.lookup_screen_threshold {
            self.lookup_screen_threshold = Some(threshold);
        }
    }
}

/// Partial update of a statistics row. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsUpdate {
    pub instance_count: Option<i64>,
    pub fetch_ui: Option<i32>,
    pub max_fetch_ui: Option<i32>,
    pub lazy_collection_threshold: Option<i32>,
    pub lookup_screen_threshold: Option<i32>,
}

impl StatisticsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_count(mut self, count: i64) -> Self {
        self.instance_count = Some(count);
        self
    }

    pub fn fetch_ui(mut self, fetch_ui: i32) -> Self {
        self.fetch_ui = Some(fetch_ui);
        self
    }

    pub fn max_fetch_ui(mut self, max_fetch_ui: i32) -> Self {
        self.max_fetch_ui = Some(max_fetch_ui);
        self
    }

    pub fn lazy_collection_threshold(mut self, threshold: i32) -> Self {
        self.lazy_collection_threshold = Some(threshold);
        self
    }

    pub fn lookup_screen_threshold(mut self, threshold: i32) -> Self {
        self.lookup_screen_threshold = Some(threshold);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
