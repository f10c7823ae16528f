//! Anonymous object access to public archive buckets (S3 compatible).

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::{path::Path, ClientOptions, ObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{StorageError, StorageResult};

/// Configuration for the archive bucket connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// Bucket name
    pub bucket: String,
    /// AWS region the bucket lives in
    pub region: String,
    /// Custom endpoint (S3-compatible mirrors); `None` for AWS
    pub endpoint: Option<String>,
    /// HTTP timeout for listing requests, in seconds
    pub request_timeout_secs: u64,
    /// HTTP timeout for whole-object downloads, in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            bucket: "noaa-goes16".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            request_timeout_secs: 20,
            fetch_timeout_secs: 300,
        }
    }
}

/// Read-only object storage client.
///
/// Requests are sent unsigned, which is what public archive buckets expect.
/// Listings and downloads go through separate clients so a full granule
/// download is not held to the listing timeout.
#[derive(Clone)]
pub struct ObjectStorage {
    list_store: Arc<dyn ObjectStore>,
    fetch_store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorage {
    /// Create an anonymous client from config.
    pub fn new(config: &ObjectStorageConfig) -> StorageResult<Self> {
        Ok(Self {
            list_store: Arc::new(build_s3(config, config.request_timeout_secs)?),
            fetch_store: Arc::new(build_s3(config, config.fetch_timeout_secs)?),
            bucket: config.bucket.clone(),
        })
    }

    /// Wrap an existing store (e.g. `object_store::memory::InMemory` in tests).
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self::with_stores(store.clone(), store, bucket)
    }

    /// Wrap separate stores for listings and downloads.
    pub fn with_stores(
        list_store: Arc<dyn ObjectStore>,
        fetch_store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            list_store,
            fetch_store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Read bytes from a bucket-relative key.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn get(&self, path: &str) -> StorageResult<Bytes> {
        let location = Path::from(path);

        let result = self
            .fetch_store
            .get(&location)
            .await
            .map_err(|e| StorageError::from_object_store(e, path))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::from_object_store(e, path))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// List keys under a prefix.
    #[instrument(skip(self), fields(bucket = %self.bucket, prefix = %prefix))]
    pub async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix_path = Path::from(prefix);
        let mut paths = Vec::new();

        let mut stream = self.list_store.list(Some(&prefix_path));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| StorageError::from_object_store(e, prefix))?
        {
            paths.push(meta.location.to_string());
        }

        debug!(count = paths.len(), "Listed prefix");
        Ok(paths)
    }
}

fn build_s3(config: &ObjectStorageConfig, timeout_secs: u64) -> StorageResult<AmazonS3> {
    let client_options =
        ClientOptions::new().with_timeout(Duration::from_secs(timeout_secs.max(1)));

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(&config.bucket)
        .with_region(&config.region)
        .with_skip_signature(true)
        .with_client_options(client_options);

    if let Some(endpoint) = &config.endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(endpoint.starts_with("http://"));
    }

    builder
        .build()
        .map_err(|e| StorageError::Config(format!("Failed to create S3 client: {}", e)))
}
