//! The GOES scene pipeline.
//!
//! [`SceneEngine::fetch`] resolves a channel and time request to one archive
//! object, decodes its imagery field, crops it to the configured region and
//! caches the result for a short TTL.

pub mod config;
pub mod crop;
pub mod decoder;
pub mod engine;

pub use config::{
    BackendConfig, CacheConfig, ChannelConfig, CropConfig, DiscoveryConfig, EngineConfig,
    RegionConfig, CUSTOM_REGION,
};
pub use crop::{CropError, CropStrategy, Cropped, NamedRegion, RegionCropper, TierWindows};
pub use decoder::{DecodedScene, SceneDecoder};
pub use engine::{Scene, SceneEngine, SceneKey};
