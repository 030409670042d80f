pub mod manager;

pub use manager::PersistenceManager;
