//! Storage abstractions for the scene engine.
//!
//! Provides:
//! - Anonymous object access to public archive buckets (S3 compatible)
//! - Identifier normalization between addressing forms
//! - A TTL result cache with per-key in-flight serialization

pub mod error;
pub mod identifier;
pub mod object_store;
pub mod result_cache;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig};
pub use error::{StorageError, StorageResult};
pub use identifier::{bucket_relative_key, normalize_identifier, AddressingForm};
pub use result_cache::{ResultCache, ResultCacheStats};
