//! Error types for asrs-store.

use thiserror::Error;

use asrs_core::ErrorKind;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A write refused by [`MemoryGateway::fail_next`][crate::MemoryGateway::fail_next].
    #[error("injected write failure")]
    Injected,

    #[error("journal already holds a different event with seq {0}")]
    SeqConflict(u64),

    #[error("corrupt store: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::PersistenceFailure
    }
}

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;
