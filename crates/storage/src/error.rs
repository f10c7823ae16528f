//! Error types for object access.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Key or prefix does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The backend refused the call (unsupported operation, bad path, bad configuration key)
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Network, DNS, TLS or server failure
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// Client could not be built
    #[error("Storage configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Classify an `object_store` error raised while working on `context`.
    pub fn from_object_store(err: object_store::Error, context: &str) -> Self {
        use object_store::Error as OsError;

        match err {
            OsError::NotFound { .. } => StorageError::NotFound(context.to_string()),
            OsError::InvalidPath { .. }
            | OsError::NotSupported { .. }
            | OsError::NotImplemented
            | OsError::UnknownConfigurationKey { .. } => {
                StorageError::Rejected(format!("{}: {}", context, err))
            }
            other => StorageError::Unreachable(format!("{}: {}", context, other)),
        }
    }
}
