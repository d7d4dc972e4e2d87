use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error while preparing the database directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A thread panicked while holding the connection pool lock.
    #[error("connection pool lock poisoned")]
    PoolPoisoned,
}
