//! Scene discovery for the GOES-R ABI archive.
//!
//! Turns "channel C at time T" (or "the most recent channel C") into one
//! concrete object key:
//!
//! - [`TimeWindowResolver`] expands a request into hourly buckets to probe
//! - [`ArchiveLayout`] renders each bucket's prefix
//! - [`ObjectIndexStrategy`] implementations list a prefix, tried in a
//!   fixed fallback order
//! - [`DiscoveryOrchestrator`] filters, selects and reports typed failures

pub mod candidate;
pub mod index;
pub mod layout;
pub mod orchestrator;
pub mod time_window;

pub use candidate::{filter_eligible, select_latest, ObjectCandidate, ResolvedScene};
pub use index::{
    document::IndexDocumentStrategy, listing::ListingStrategy, sdk::SdkStrategy, IndexError,
    IndexResult, ObjectIndexStrategy, StrategyKind,
};
pub use layout::ArchiveLayout;
pub use orchestrator::DiscoveryOrchestrator;
pub use time_window::{TimeWindowResolver, DEFAULT_LOOKBACK_HOURS};
