//! Error types for the data-persistence layer

use thiserror::Error;

/// Result type alias using the porter Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the data-persistence layer
#[derive(Error, Debug)]
pub enum Error {
    // Backend capability errors
    #[error("Operation '{operation}' is not supported by storage backend '{backend}'")]
    UnsupportedOperation { backend: String, operation: String },

    // Registry errors
    #[error(
        "Cannot register backend '{requested}' for protocol '{protocol}': backend '{existing}' \
         is already registered for the same protocol (pass force=true to replace it)"
    )]
    ProtocolConflict {
        protocol: String,
        existing: String,
        requested: String,
    },

    #[error("No storage backend registered for a matching protocol of path '{path}'")]
    NoBackendForPath { path: String },

    // Transfer errors (raised only by the timed get/put wrappers)
    #[error(
        "Failed to transfer data between {remote_path} and {local_path} \
         (recursive={recursive}): {message}"
    )]
    TransferFailed {
        remote_path: String,
        local_path: String,
        recursive: bool,
        message: String,
    },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Backend I/O errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if this error indicates a programmer or configuration
    /// mistake (a capability gap, registration collision, or unresolvable
    /// path) rather than an I/O failure. These are never worth retrying.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedOperation { .. }
                | Error::ProtocolConflict { .. }
                | Error::NoBackendForPath { .. }
                | Error::InvalidConfig { .. }
        )
    }

    /// Returns true if this error may be transient. Retry policy belongs to
    /// the caller; this layer never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Storage { .. } | Error::Io(_) | Error::TransferFailed { .. }
        )
    }
}
