// ============================================================================
// Transaction Change Tracking
// ============================================================================
//
// Changes are buffered inside a unit of work and applied to the committed
// statistics table only on COMMIT. ROLLBACK (or dropping the transaction)
// simply discards the buffer.
//
// ============================================================================

use crate::core::StatisticsEntry;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub enum Change {
    /// Insert or replace a statistics row
    SaveStatistics { entry: StatisticsEntry },

    /// Delete a statistics row by entity name
    DeleteStatistics { name: String },
}

impl Change {
    /// Entity name of the row affected by this change
    pub fn entity_name(&self) -> &str {
        match self {
            Change::SaveStatistics { entry } => &entry.name,
            Change::DeleteStatistics { name } => name,
        }
    }

    /// Apply the change to a table keyed by entity name
    pub fn apply_to(&self, rows: &mut HashMap<String, StatisticsEntry>) {
        match self {
            Change::SaveStatistics { entry } => {
                rows.insert(entry.name.clone(), entry.clone());
            }
            Change::DeleteStatistics { name } => {
                rows.remove(name);
            }
        }
    }
}
