//! Error types for the gamification core.

use thiserror::Error;

/// Failures surfaced by a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Blocking storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum GamificationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl GamificationError {
    /// Stable short code, used by the CLI's JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            GamificationError::InvalidArgument(_) => "invalid_argument",
            GamificationError::NotFound(_) => "not_found",
            GamificationError::Storage(_) => "storage_failure",
        }
    }
}

impl From<rusqlite::Error> for GamificationError {
    fn from(err: rusqlite::Error) -> Self {
        GamificationError::Storage(StorageError::Sqlite(err))
    }
}

pub type Result<T> = std::result::Result<T, GamificationError>;
