//! Native directory listing through `object_store`.

use async_trait::async_trait;
use storage::ObjectStorage;
use tracing::instrument;

use super::{IndexResult, ObjectIndexStrategy, StrategyKind};

/// Lists a prefix with the store's own listing call.
#[derive(Clone)]
pub struct ListingStrategy {
    storage: ObjectStorage,
}

impl ListingStrategy {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ObjectIndexStrategy for ListingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Listing
    }

    #[instrument(skip(self), fields(strategy = "listing"))]
    async fn list(&self, prefix: &str) -> IndexResult<Vec<String>> {
        Ok(self.storage.list(prefix).await?)
    }
}
