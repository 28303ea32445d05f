//! Error types for the KV tree client.

use thiserror::Error;

/// Result type alias for KV tree operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur during KV tree operations.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("key already exists: {0}")]
    KeyExists(String),

    #[error("key does not exist: {0}")]
    KeyDoesNotExist(String),

    #[error("node has children: {0}")]
    NotEmpty(String),

    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error("ephemeral nodes cannot have children: {0}")]
    EphemeralParent(String),

    #[error("failed to open store: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}

impl KvError {
    /// True for "the node is not there", which callers often treat as absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyDoesNotExist(_))
    }
}
