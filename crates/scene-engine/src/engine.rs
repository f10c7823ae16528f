//! The scene pipeline: discover, decode, crop, cached per request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use discovery::{
    ArchiveLayout, DiscoveryOrchestrator, IndexDocumentStrategy, ListingStrategy,
    ObjectIndexStrategy, SdkStrategy, StrategyKind, TimeWindowResolver,
};
use scene_common::{
    ChannelSpec, DecodedArray, PixelWindow, ResolutionTier, ScanMode, SceneError, SceneResult,
    TimeKey, TimeRequest,
};
use serde::Serialize;
use storage::{ObjectStorage, ObjectStorageConfig, ResultCache, ResultCacheStats};
use tracing::{info, instrument, warn};

use crate::config::EngineConfig;
use crate::crop::RegionCropper;
use crate::decoder::SceneDecoder;

/// Cache key: one entry per channel, anchor hour and request mode.
///
/// "Most recent" anchors at the caller's hour, so it never shares an entry
/// with an explicit request for the bucket it happened to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneKey {
    pub channel: ChannelSpec,
    pub anchor: TimeKey,
    pub latest: bool,
}

impl SceneKey {
    pub fn for_request(channel: &ChannelSpec, request: &TimeRequest) -> Self {
        Self {
            channel: *channel,
            anchor: request.anchor(),
            latest: request.is_latest(),
        }
    }
}

/// What the presentation layer receives.
#[derive(Debug, Clone, Serialize)]
pub struct Scene {
    pub channel: ChannelSpec,
    /// `s3://` URI of the source object
    pub identifier: String,
    /// Hourly bucket the object was found in
    pub time_key: TimeKey,
    pub capture_start: Option<DateTime<Utc>>,
    /// Short capture stamp `YYYYJJJHHMM` for labels
    pub display_stamp: Option<String>,
    pub scan_mode: ScanMode,
    pub strategy: StrategyKind,
    /// (rows, cols) before cropping
    pub source_shape: (usize, usize),
    /// Window of the source that `array` covers
    pub window: PixelWindow,
    #[serde(skip_serializing)]
    pub array: DecodedArray,
}

/// Discovery, decoding and cropping behind a TTL cache.
pub struct SceneEngine {
    discovery: DiscoveryOrchestrator,
    decoder: SceneDecoder,
    cropper: RegionCropper,
    channels: HashMap<ChannelSpec, ResolutionTier>,
    cache: ResultCache<SceneKey, Arc<Scene>>,
}

impl SceneEngine {
    pub fn new(
        discovery: DiscoveryOrchestrator,
        decoder: SceneDecoder,
        cropper: RegionCropper,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            discovery,
            decoder,
            cropper,
            channels: HashMap::new(),
            cache: ResultCache::new(cache_ttl),
        }
    }

    /// Restrict requests to these channels, each cropped at the given tier.
    /// Without this, any channel is served at its native tier.
    pub fn with_channels<I>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = (ChannelSpec, ResolutionTier)>,
    {
        self.channels = channels.into_iter().collect();
        self
    }

    /// Build the full engine against the configured archive.
    pub async fn from_config(config: &EngineConfig) -> SceneResult<Self> {
        config.validate()?;

        let backend = &config.backend;
        let storage = ObjectStorage::new(&ObjectStorageConfig {
            bucket: backend.bucket.clone(),
            region: backend.region.clone(),
            endpoint: backend.endpoint.clone(),
            request_timeout_secs: backend.request_timeout_secs,
            fetch_timeout_secs: backend.fetch_timeout_secs,
        })
        .map_err(|e| SceneError::Config(e.to_string()))?;

        let layout = ArchiveLayout::new(&backend.bucket, &backend.product);
        let resolver = TimeWindowResolver::new(config.discovery.lookback_hours);
        let mut discovery = DiscoveryOrchestrator::new(layout, resolver)
            .with_call_timeout(backend.request_timeout());

        for kind in &backend.strategies {
            let strategy: Arc<dyn ObjectIndexStrategy> = match kind {
                StrategyKind::Listing => Arc::new(ListingStrategy::new(storage.clone())),
                StrategyKind::IndexDocument => Arc::new(
                    IndexDocumentStrategy::new(
                        backend.listing_endpoint(),
                        backend.request_timeout(),
                    )
                    .map_err(|e| SceneError::Config(e.to_string()))?,
                ),
                StrategyKind::Sdk => {
                    Arc::new(SdkStrategy::anonymous(&backend.bucket, &backend.region).await)
                }
            };
            discovery = discovery.with_strategy(strategy);
        }

        let cropper = RegionCropper::new(config.crop_strategy()?);
        let decoder = SceneDecoder::new(storage, &backend.field);

        info!(
            bucket = %backend.bucket,
            product = %backend.product,
            strategies = ?discovery.chain(),
            ttl_secs = config.cache.ttl_secs,
            fetch_timeout_secs = backend.fetch_timeout_secs,
            "Scene engine ready"
        );

        Ok(Self::new(discovery, decoder, cropper, config.cache.ttl())
            .with_channels(config.channels.iter().map(|c| (c.channel, c.tier()))))
    }

    pub fn discovery(&self) -> &DiscoveryOrchestrator {
        &self.discovery
    }

    pub fn cropper(&self) -> &RegionCropper {
        &self.cropper
    }

    pub fn cache_stats(&self) -> Arc<ResultCacheStats> {
        self.cache.stats()
    }

    /// Resolve, decode and crop one scene.
    ///
    /// Repeats within the cache TTL return the same `Arc` without touching
    /// the backend. Failures are never cached.
    #[instrument(skip(self, channel, request), fields(channel = %channel, latest = request.is_latest()))]
    pub async fn fetch(
        &self,
        channel: &ChannelSpec,
        request: &TimeRequest,
    ) -> SceneResult<Arc<Scene>> {
        metrics::counter!("scene_requests_total", "channel" => channel.code()).increment(1);

        let tier = self.tier_for(channel)?;
        let key = SceneKey::for_request(channel, request);

        let result = self
            .cache
            .get_or_compute(key, || self.run_pipeline(channel, tier, request))
            .await;

        if let Err(ref err) = result {
            let stage = if err.is_discovery_failure() {
                "discovery"
            } else {
                "retrieval"
            };
            metrics::counter!(
                "scene_request_failures_total",
                "kind" => err.kind(),
                "stage" => stage
            )
            .increment(1);
            warn!(kind = err.kind(), stage, error = %err, "Scene request failed");
        }
        result
    }

    fn tier_for(&self, channel: &ChannelSpec) -> SceneResult<ResolutionTier> {
        if self.channels.is_empty() {
            return Ok(channel.native_tier());
        }
        self.channels.get(channel).copied().ok_or_else(|| {
            SceneError::InvalidRequest(format!("channel {} is not configured", channel))
        })
    }

    async fn run_pipeline(
        &self,
        channel: &ChannelSpec,
        tier: ResolutionTier,
        request: &TimeRequest,
    ) -> SceneResult<Arc<Scene>> {
        let resolved = self.discovery.resolve(channel, request).await?;
        let decoded = self.decoder.decode(resolved.key()).await?;
        let cropped = self
            .cropper
            .crop(&decoded.array, tier, decoded.geometry.as_ref())?;

        let scene = Scene {
            channel: *channel,
            identifier: self.discovery.layout().s3_uri(&decoded.key),
            time_key: resolved.time_key,
            capture_start: resolved.candidate.capture_start(),
            display_stamp: resolved.candidate.display_stamp().map(str::to_string),
            scan_mode: resolved.scan_mode,
            strategy: resolved.strategy,
            source_shape: decoded.array.shape(),
            window: cropped.window,
            array: cropped.array,
        };

        info!(
            identifier = %scene.identifier,
            time_key = %scene.time_key,
            source_rows = scene.source_shape.0,
            source_cols = scene.source_shape.1,
            rows = scene.array.height(),
            cols = scene.array.width(),
            "Scene ready"
        );
        Ok(Arc::new(scene))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scene_key_separates_modes() {
        let c13 = ChannelSpec::parse("13").unwrap();
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 18, 42, 0).unwrap();
        let latest = SceneKey::for_request(&c13, &TimeRequest::latest(now));
        let exact = SceneKey::for_request(
            &c13,
            &TimeRequest::Exact {
                key: TimeKey::new(2025, 365, 18).unwrap(),
            },
        );
        assert_eq!(latest.anchor, exact.anchor);
        assert_ne!(latest, exact);

        let later = Utc.with_ymd_and_hms(2025, 12, 31, 18, 59, 59).unwrap();
        assert_eq!(latest, SceneKey::for_request(&c13, &TimeRequest::latest(later)));
    }
}
