//! Object index strategies.
//!
//! Each strategy answers one question, "which keys exist under this
//! prefix?", against a different face of the same backend. They are
//! interchangeable and tried in a fixed order by the orchestrator.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod document;
pub mod listing;
pub mod sdk;

pub type IndexResult<T> = Result<T, IndexError>;

/// Why one strategy attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Network, DNS, TLS or 5xx
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Auth, region or request misconfiguration
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Bucket or prefix does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Response could not be understood
    #[error("malformed listing: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl IndexError {
    /// The backend answered and reported nothing under the prefix.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound(_))
    }
}

impl From<storage::StorageError> for IndexError {
    fn from(err: storage::StorageError) -> Self {
        use storage::StorageError;

        match err {
            StorageError::NotFound(msg) => IndexError::NotFound(msg),
            StorageError::Rejected(msg) | StorageError::Config(msg) => IndexError::Rejected(msg),
            StorageError::Unreachable(msg) => IndexError::Unreachable(msg),
        }
    }
}

/// Which backend face a strategy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Native directory listing through `object_store`
    Listing,
    /// Public paginated REST listing document
    IndexDocument,
    /// AWS SDK client with unsigned requests
    Sdk,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Listing => "listing",
            StrategyKind::IndexDocument => "index_document",
            StrategyKind::Sdk => "sdk",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lists object keys under a prefix.
///
/// Implementations return bucket-relative keys and never panic on backend
/// failures; every failure is mapped to an [`IndexError`].
#[async_trait]
pub trait ObjectIndexStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn list(&self, prefix: &str) -> IndexResult<Vec<String>>;
}
