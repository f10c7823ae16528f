//! End-to-end discovery against fixture archives.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use discovery::{
    ArchiveLayout, DiscoveryOrchestrator, IndexDocumentStrategy, ListingStrategy,
    ObjectIndexStrategy, StrategyKind, TimeWindowResolver,
};
use scene_common::{ChannelSpec, ScanMode, SceneError, TimeKey, TimeRequest};
use test_utils::{abi_object_key, hour_listing, DocumentStyle};

async fn listing_orchestrator(keys: &[String], lookback: usize) -> DiscoveryOrchestrator {
    let listing: Arc<dyn ObjectIndexStrategy> =
        Arc::new(ListingStrategy::new(common::memory_storage(keys).await));
    DiscoveryOrchestrator::new(ArchiveLayout::default(), TimeWindowResolver::new(lookback))
        .with_strategy(listing)
}

fn c13() -> ChannelSpec {
    ChannelSpec::parse("13").unwrap()
}

#[tokio::test]
async fn test_exact_hour_single_candidate() {
    let target = abi_object_key(2025, 365, 18, "M6", 13, "00205");
    let mut keys = vec![target.clone()];
    keys.extend(hour_listing(2025, 365, 18, "M6", &[2, 9]));

    let orchestrator = listing_orchestrator(&keys, 12).await;
    let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
    let request = TimeRequest::exact(date, 18).unwrap();

    let resolved = orchestrator.resolve(&c13(), &request).await.unwrap();
    assert_eq!(resolved.key(), target);
    assert_eq!(resolved.time_key, TimeKey::new(2025, 365, 18).unwrap());
    assert_eq!(resolved.scan_mode, ScanMode::Mode6);
    assert_eq!(resolved.channel, c13());
}

#[tokio::test]
async fn test_latest_falls_back_one_hour() {
    let keys = hour_listing(2025, 365, 17, "M6", &[13]);
    let orchestrator = listing_orchestrator(&keys, 12).await;
    let now = Utc.with_ymd_and_hms(2025, 12, 31, 18, 4, 0).unwrap();

    let resolved = orchestrator
        .resolve(&c13(), &TimeRequest::latest(now))
        .await
        .unwrap();
    assert_eq!(resolved.time_key, TimeKey::new(2025, 365, 17).unwrap());
    assert_eq!(resolved.key(), abi_object_key(2025, 365, 17, "M6", 13, "50205"));
}

#[tokio::test]
async fn test_latest_crosses_year_boundary() {
    let keys = hour_listing(2024, 366, 23, "M6", &[13]);
    let orchestrator = listing_orchestrator(&keys, 3).await;
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 10, 0).unwrap();

    let resolved = orchestrator
        .resolve(&c13(), &TimeRequest::latest(now))
        .await
        .unwrap();
    assert_eq!(resolved.time_key, TimeKey::new(2024, 366, 23).unwrap());
}

#[tokio::test]
async fn test_exact_hour_failures_are_distinct() {
    let keys = hour_listing(2025, 365, 18, "M6", &[2]);
    let orchestrator = listing_orchestrator(&keys, 12).await;
    let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();

    let err = orchestrator
        .resolve(&c13(), &TimeRequest::exact(date, 18).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "no_channel_match");

    let err = orchestrator
        .resolve(&c13(), &TimeRequest::exact(date, 5).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "empty_index");
}

#[tokio::test]
async fn test_empty_listing_falls_back_to_document() {
    // The in-memory store knows nothing; the REST listing has the hour
    let listing: Arc<dyn ObjectIndexStrategy> =
        Arc::new(ListingStrategy::new(common::memory_storage(&[]).await));
    let endpoint = common::serve_listing(
        hour_listing(2025, 365, 18, "M3", &[13]),
        DocumentStyle::Prefixed,
    )
    .await;
    let document: Arc<dyn ObjectIndexStrategy> =
        Arc::new(IndexDocumentStrategy::new(endpoint, Duration::from_secs(5)).unwrap());

    let orchestrator =
        DiscoveryOrchestrator::new(ArchiveLayout::default(), TimeWindowResolver::new(1))
            .with_strategy(listing)
            .with_strategy(document);
    assert_eq!(
        orchestrator.chain(),
        vec![StrategyKind::Listing, StrategyKind::IndexDocument]
    );

    let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
    let resolved = orchestrator
        .resolve(&c13(), &TimeRequest::exact(date, 18).unwrap())
        .await
        .unwrap();
    assert_eq!(resolved.strategy, StrategyKind::IndexDocument);
    assert_eq!(resolved.scan_mode, ScanMode::Mode3);
}

#[tokio::test]
async fn test_latest_without_data_exhausts() {
    let orchestrator = listing_orchestrator(&[], 4).await;
    let now = Utc.with_ymd_and_hms(2025, 12, 31, 18, 4, 0).unwrap();

    let err = orchestrator
        .resolve(&c13(), &TimeRequest::latest(now))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SceneError::LookbackExhausted { hours: 4, ref channel } if channel == "C13"
    ));
}
