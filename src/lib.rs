// ============================================================================
// entity-stats Library
// ============================================================================
//
// Runtime metadata and statistics cache in front of a relational schema and
// its persistent object model:
//
// - soft-delete tables, discovered once from live database metadata
// - secondary (join / joined-inheritance) tables, discovered once from the
//   entity metamodel
// - per-entity usage statistics, lazily cached and invalidated on change
//
// ============================================================================

pub mod config;
pub mod core;
pub mod facade;
pub mod introspect;
pub mod metamodel;
pub mod prelude;
pub mod statistics;
pub mod storage;
pub mod transaction;

pub use config::{DbmsType, PersistenceConfig};
pub use crate::core::{LazyInit, PersistenceError, Result, StatisticsEntry, StatisticsUpdate};
pub use facade::PersistenceManager;
pub use introspect::{MetaModelScanner, SchemaIntrospector};
pub use metamodel::{InheritanceType, MetaClass, MetaModel, MetaModelProvider, MetaProperty};
pub use statistics::{StatisticsCache, StatisticsMap, StatisticsStore};
pub use storage::{
    DataSource, DatabaseFixture, DatabaseStats, InMemoryDatabase, MetadataConnection, Persistence,
    TableSchema, Transaction,
};
