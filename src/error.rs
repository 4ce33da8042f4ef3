//! Error types for dagstore

use thiserror::Error;

/// Result type alias for dagstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dagstore operations
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced object does not resolve in the backend
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The writer identity was rejected by the backend
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend could not be reached or answered with a protocol error
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Empty or malformed link label, rejected before touching the backend
    #[error("Invalid link label: {0:?}")]
    InvalidLabel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    /// A stored object would not fit the store file's index
    #[error("Object too large: {0} bytes")]
    ObjectTooLarge(usize),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Invalid store file: {0}")]
    InvalidFile(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether a caller may reasonably retry the operation later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::BackendUnavailable(_))
    }

    /// Whether this error means the object is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
