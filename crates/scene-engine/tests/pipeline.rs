//! End-to-end pipeline tests against an in-memory archive.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use discovery::{ArchiveLayout, DiscoveryOrchestrator, ListingStrategy, TimeWindowResolver};
use object_store::{memory::InMemory, path::Path, ObjectStore};
use scene_common::{ChannelSpec, ResolutionTier, SceneError, TimeKey, TimeRequest};
use scene_engine::{CropStrategy, EngineConfig, RegionCropper, SceneDecoder, SceneEngine};
use storage::ObjectStorage;
use test_utils::{abi_object_key, scene_netcdf_bytes, FixtureScene, BUCKET, PRODUCT};

// ============================================================================
// Helpers
// ============================================================================

struct Archive {
    store: Arc<InMemory>,
}

impl Archive {
    fn new() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) {
        self.store
            .put(&Path::from(key), bytes::Bytes::from(bytes).into())
            .await
            .unwrap();
    }

    fn engine(&self) -> SceneEngine {
        let storage = ObjectStorage::with_store(self.store.clone(), BUCKET);
        let discovery = DiscoveryOrchestrator::new(
            ArchiveLayout::new(BUCKET, PRODUCT),
            TimeWindowResolver::new(3),
        )
        .with_strategy(Arc::new(ListingStrategy::new(storage.clone())));

        let cropper = RegionCropper::new(CropStrategy::Proportional {
            rows: [0.5, 1.0],
            cols: [0.25, 0.75],
        });

        SceneEngine::new(
            discovery,
            SceneDecoder::new(storage, "CMI"),
            cropper,
            Duration::from_secs(300),
        )
    }
}

fn c13() -> ChannelSpec {
    ChannelSpec::parse("13").unwrap()
}

fn exact(year: i32, doy: u32, hour: u32) -> TimeRequest {
    TimeRequest::Exact {
        key: TimeKey::new(year, doy, hour).unwrap(),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_exact_hour_decodes_and_crops() {
    let archive = Archive::new();
    let key = abi_object_key(2025, 365, 18, "M6", 13, "00205");
    let fixture = FixtureScene::ramp(6, 4);
    archive.put(&key, scene_netcdf_bytes(&fixture)).await;
    // Another channel in the same hour must not be picked
    archive
        .put(
            &abi_object_key(2025, 365, 18, "M6", 9, "00205"),
            scene_netcdf_bytes(&FixtureScene::ramp(2, 2)),
        )
        .await;

    let scene = archive.engine().fetch(&c13(), &exact(2025, 365, 18)).await.unwrap();

    assert_eq!(scene.identifier, format!("s3://{}/{}", BUCKET, key));
    assert_eq!(scene.time_key, TimeKey::new(2025, 365, 18).unwrap());
    assert_eq!(scene.source_shape, (4, 6));

    let (rows, cols) = scene.array.shape();
    assert!(rows <= 4 && cols <= 6);
    assert_eq!((rows, cols), (2, 4));

    let expected = fixture.expected(2, 1).unwrap();
    assert!((scene.array.get(0, 0).unwrap() - expected).abs() < 1e-3);

    // _s20253651800205 is 18:00:20.5
    let expected_start =
        Utc.with_ymd_and_hms(2025, 12, 31, 18, 0, 20).unwrap() + chrono::Duration::milliseconds(500);
    assert_eq!(scene.capture_start, Some(expected_start));
    assert_eq!(scene.display_stamp.as_deref(), Some("20253651800"));
}

#[tokio::test]
async fn test_latest_reports_fallback_hour() {
    let archive = Archive::new();
    let key = abi_object_key(2025, 365, 18, "M6", 13, "50205");
    archive.put(&key, scene_netcdf_bytes(&FixtureScene::ramp(4, 4))).await;

    let now = Utc.with_ymd_and_hms(2025, 12, 31, 19, 20, 0).unwrap();
    let scene = archive
        .engine()
        .fetch(&c13(), &TimeRequest::latest(now))
        .await
        .unwrap();

    assert_eq!(scene.time_key, TimeKey::new(2025, 365, 18).unwrap());
    assert!(scene.identifier.ends_with(&key));
}

#[tokio::test]
async fn test_repeat_within_ttl_is_cached() {
    let archive = Archive::new();
    let key = abi_object_key(2025, 365, 18, "M6", 13, "00205");
    archive.put(&key, scene_netcdf_bytes(&FixtureScene::ramp(6, 4))).await;
    let engine = archive.engine();

    let first = engine.fetch(&c13(), &exact(2025, 365, 18)).await.unwrap();

    // A newer object appearing does not change the cached answer
    archive
        .put(
            &abi_object_key(2025, 365, 18, "M6", 13, "10205"),
            scene_netcdf_bytes(&FixtureScene::ramp(6, 4)),
        )
        .await;
    let second = engine.fetch(&c13(), &exact(2025, 365, 18)).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    let stats = engine.cache_stats();
    assert_eq!(stats.misses(), 1);
    assert_eq!(stats.hits(), 1);
}

#[tokio::test]
async fn test_decode_failure_is_not_cached() {
    let archive = Archive::new();
    let key = abi_object_key(2025, 365, 18, "M6", 13, "00205");
    archive.put(&key, b"truncated download".to_vec()).await;
    let engine = archive.engine();

    let err = engine.fetch(&c13(), &exact(2025, 365, 18)).await.unwrap_err();
    assert!(matches!(err, SceneError::DecodeFailure { .. }), "{:?}", err);

    archive.put(&key, scene_netcdf_bytes(&FixtureScene::ramp(6, 4))).await;
    let scene = engine.fetch(&c13(), &exact(2025, 365, 18)).await.unwrap();
    assert_eq!(scene.source_shape, (4, 6));
    assert_eq!(engine.cache_stats().failures(), 1);
}

#[tokio::test]
async fn test_discovery_failures_keep_their_kind() {
    let archive = Archive::new();
    archive
        .put(
            &abi_object_key(2025, 365, 18, "M6", 2, "00205"),
            scene_netcdf_bytes(&FixtureScene::ramp(2, 2)),
        )
        .await;
    let engine = archive.engine();

    let err = engine.fetch(&c13(), &exact(2025, 365, 18)).await.unwrap_err();
    assert_eq!(err.kind(), "no_channel_match");

    let err = engine.fetch(&c13(), &exact(2025, 365, 17)).await.unwrap_err();
    assert_eq!(err.kind(), "empty_index");

    let now = Utc.with_ymd_and_hms(2025, 12, 31, 12, 0, 0).unwrap();
    let err = engine
        .fetch(&c13(), &TimeRequest::latest(now))
        .await
        .unwrap_err();
    assert!(matches!(err, SceneError::LookbackExhausted { hours: 3, .. }));
}

#[tokio::test]
async fn test_unconfigured_channel_is_rejected() {
    let archive = Archive::new();
    let engine = archive
        .engine()
        .with_channels([(c13(), ResolutionTier::TwoKm)]);

    let c05 = ChannelSpec::parse("C05").unwrap();
    let err = engine.fetch(&c05, &exact(2025, 365, 18)).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_request");
}

// ============================================================================
// Construction from configuration
// ============================================================================

#[tokio::test]
async fn test_from_config_builds_configured_chain() {
    let mut config = EngineConfig::default();
    config.backend.strategies = vec![
        discovery::StrategyKind::IndexDocument,
        discovery::StrategyKind::Listing,
    ];
    let engine = SceneEngine::from_config(&config).await.unwrap();
    assert_eq!(
        engine.discovery().chain(),
        vec![
            discovery::StrategyKind::IndexDocument,
            discovery::StrategyKind::Listing
        ]
    );
    assert_eq!(engine.discovery().resolver().lookback(), 12);
}

#[tokio::test]
async fn test_from_config_rejects_invalid() {
    let mut config = EngineConfig::default();
    config.cache.ttl_secs = 0;
    let err = SceneEngine::from_config(&config).await.err().unwrap();
    assert_eq!(err.kind(), "config");
}
