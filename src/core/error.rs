use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Statistics store error: {0}")]
    Store(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

impl PersistenceError {
    /// Wraps a collaborator failure raised while computing a table set.
    pub fn initialization(err: PersistenceError) -> Self {
        match err {
            Self::Initialization(msg) => Self::Initialization(msg),
            other => Self::Initialization(other.to_string()),
        }
    }

    /// Wraps a collaborator failure raised inside a statistics unit of work.
    pub fn store(err: PersistenceError) -> Self {
        match err {
            Self::Store(msg) => Self::Store(msg),
            other => Self::Store(other.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for PersistenceError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Config(err.to_string())
    }
}
