use crate::core::{LazyInit, Result};
use crate::metamodel::{InheritanceType, MetaClass, MetaModelProvider};
use log::{debug, trace};
use std::collections::HashSet;
use std::sync::Arc;

/// Finds join tables and joined-inheritance child tables from static mapping
/// metadata. Names keep the casing they were declared with.
pub struct MetaModelScanner {
    metamodel: Arc<dyn MetaModelProvider>,
    tables: LazyInit<HashSet<String>>,
}

impl MetaModelScanner {
    pub fn new(metamodel: Arc<dyn MetaModelProvider>) -> Self {
        Self {
            metamodel,
            tables: LazyInit::new(),
        }
    }

    /// Secondary table names, computed on first call.
    pub async fn secondary_tables(&self) -> Result<Arc<HashSet<String>>> {
        self.tables
            .get_or_try_init(|| async { Ok(self.compute_secondary_tables()) })
            .await
    }

    pub fn compute_secondary_tables(&self) -> HashSet<String> {
        debug!("Searching for secondary tables");
        let mut set = HashSet::new();

        for class in self.metamodel.persistent_classes() {
            for property in &class.properties {
                if let Some(join_table) = &property.join_table {
                    trace!("[secondary tables] {}.{} joins via {}", class.name, property.name, join_table);
                    set.insert(join_table.clone());
                }
            }

            if self.is_joined_inheritance(class)
                && let Some(table) = &class.table
            {
                trace!("[secondary tables] {} is a joined subclass table", table);
                set.insert(table.clone());
            }
        }
        set
    }

    pub fn compute_count(&self) -> u64 {
        self.tables.init_count()
    }

    fn is_joined_inheritance(&self, class: &MetaClass) -> bool {
        self.metamodel
            .ancestors(class)
            .iter()
            .any(|ancestor| ancestor.inheritance == Some(InheritanceType::Joined))
    }
}
