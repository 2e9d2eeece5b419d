//! Error types for the store crate.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No object with the given name.
    #[error("object not found: {0}")]
    NotFound(String),

    /// An object with the given name already exists.
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// The object is referenced elsewhere and cannot be removed.
    #[error("object in use: {0}")]
    InUse(String),

    /// Lock poisoned by a panicking writer.
    #[error("lock error")]
    LockError,

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
