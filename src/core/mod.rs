pub mod error;
pub mod lazy;
pub mod types;

pub use error::{PersistenceError, Result};
pub use lazy::LazyInit;
pub use types::{StatisticsEntry, StatisticsUpdate};
