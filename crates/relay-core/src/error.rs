//! Error types for the relay core.

use relay_protocol::ProtocolError;
use thiserror::Error;

/// Storage backend failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The sled database reported an error.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// A stored row could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A stored key or value had an unexpected shape.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// A lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Errors surfaced by relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A direct publish named a client that does not exist.
    #[error("recipient not found")]
    NotFound,

    /// The shared secret did not match the client.
    #[error("invalid secret")]
    Forbidden,

    /// The request was missing or carried an unusable field.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl From<ProtocolError> for RelayError {
    fn from(err: ProtocolError) -> Self {
        RelayError::Malformed(err.to_string())
    }
}
