//! Archive path scheme.

use scene_common::TimeKey;
use serde::{Deserialize, Serialize};
use storage::{normalize_identifier, AddressingForm};

/// Where a product lives: `<product>/<year>/<doy:03>/<hour:02>/` in `bucket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveLayout {
    pub bucket: String,
    pub product: String,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self::new("noaa-goes16", "ABI-L2-CMIPF")
    }
}

impl ArchiveLayout {
    pub fn new(bucket: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            product: product.into(),
        }
    }

    /// Listing prefix for one hourly bucket, with trailing slash.
    pub fn prefix(&self, key: &TimeKey) -> String {
        format!("{}/{}/", self.product, key.path_component())
    }

    /// Public REST endpoint of the bucket.
    pub fn endpoint(&self) -> String {
        format!("https://{}.s3.amazonaws.com", self.bucket)
    }

    pub fn s3_uri(&self, key: &str) -> String {
        normalize_identifier(key, &self.bucket, AddressingForm::S3Uri)
    }
}
