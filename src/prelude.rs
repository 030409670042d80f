//! Everything an application needs to wire up and query a
//! [`PersistenceManager`](crate::PersistenceManager).

pub use crate::{
    DbmsType, InMemoryDatabase, MetaClass, MetaModel, MetaProperty, InheritanceType,
    PersistenceConfig, PersistenceError, PersistenceManager, Result, StatisticsEntry,
    StatisticsUpdate, TableSchema,
};
