use crate::storage::StorageState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotekeepError {
    #[error("Storage is not ready (state: {0})")]
    NotReady(StorageState),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("Duplicate note id: {0}")]
    DuplicateKey(String),

    #[error("Invalid import format: {0}")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store error: {0}")]
    Store(String),
}

/// Coarse classification of [`NotekeepError`], for callers that need to
/// pick a message or a recovery path without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotReady,
    BackendUnavailable,
    StorageUnavailable,
    NotFound,
    DuplicateKey,
    InvalidFormat,
    Config,
    /// Any failure reported by the underlying engine itself.
    Engine,
}

impl NotekeepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotekeepError::NotReady(_) => ErrorKind::NotReady,
            NotekeepError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            NotekeepError::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            NotekeepError::NotFound(_) => ErrorKind::NotFound,
            NotekeepError::DuplicateKey(_) => ErrorKind::DuplicateKey,
            NotekeepError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            NotekeepError::Config(_) => ErrorKind::Config,
            NotekeepError::Io(_)
            | NotekeepError::Serialization(_)
            | NotekeepError::Sqlite(_)
            | NotekeepError::Store(_) => ErrorKind::Engine,
        }
    }
}

pub type Result<T> = std::result::Result<T, NotekeepError>;
