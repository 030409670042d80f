pub mod catalog;
pub mod engine;
pub mod fixture;
pub mod memory;
pub mod table;

pub use catalog::Catalog;
pub use engine::{DataSource, MetadataConnection, Persistence, Transaction};
pub use fixture::{DatabaseFixture, FixtureStatistics};
pub use memory::{DatabaseStats, InMemoryDatabase};
pub use table::{TableKind, TableSchema};
