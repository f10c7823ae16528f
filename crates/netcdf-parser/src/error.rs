//! Error types for NetCDF decoding.

use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF decoding.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// Temp file I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Payload is not a readable NetCDF-4 container, or the field is malformed
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}
