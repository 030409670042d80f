pub mod cache;
pub mod store;

pub use cache::{StatisticsCache, StatisticsMap};
pub use store::StatisticsStore;
