//! Engine configuration.
//!
//! Loaded from YAML (see `config/scene.yaml`), then overridden from the
//! environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `SCENE_BUCKET` | `backend.bucket` |
//! | `SCENE_PRODUCT` | `backend.product` |
//! | `SCENE_REGION` | `backend.region` |
//! | `SCENE_CACHE_TTL_SECS` | `cache.ttl_secs` |
//! | `SCENE_LOOKBACK_HOURS` | `discovery.lookback_hours` |
//! | `SCENE_REQUEST_TIMEOUT_SECS` | `backend.request_timeout_secs` |
//! | `SCENE_FETCH_TIMEOUT_SECS` | `backend.fetch_timeout_secs` |

use std::path::Path;
use std::time::Duration;

use discovery::StrategyKind;
use scene_common::{BoundingBox, ChannelSpec, ResolutionTier, SceneError, SceneResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crop::{CropStrategy, NamedRegion, TierWindows};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
    #[serde(default = "default_regions")]
    pub regions: Vec<RegionConfig>,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub crop: CropConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            channels: default_channels(),
            regions: default_regions(),
            discovery: DiscoveryConfig::default(),
            cache: CacheConfig::default(),
            crop: CropConfig::default(),
        }
    }
}

/// Archive bucket and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_product")]
    pub product: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// S3-compatible mirror; `None` for AWS
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Index strategies in fallback order
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,
    /// Bound on each listing call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Bound on downloading one granule
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Field decoded from each granule
    #[serde(default = "default_field")]
    pub field: String,
}

fn default_bucket() -> String {
    "noaa-goes16".to_string()
}

fn default_product() -> String {
    "ABI-L2-CMIPF".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_strategies() -> Vec<StrategyKind> {
    vec![
        StrategyKind::Listing,
        StrategyKind::IndexDocument,
        StrategyKind::Sdk,
    ]
}

fn default_request_timeout() -> u64 {
    20
}

fn default_fetch_timeout() -> u64 {
    300
}

fn default_field() -> String {
    netcdf_parser::DEFAULT_FIELD.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            product: default_product(),
            region: default_region(),
            endpoint: None,
            strategies: default_strategies(),
            request_timeout_secs: default_request_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            field: default_field(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL for REST listings.
    pub fn listing_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
            None => format!("https://{}.s3.amazonaws.com", self.bucket),
        }
    }
}

/// A channel the engine serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel: ChannelSpec,
    #[serde(default)]
    pub label: String,
    /// Overrides the band's native tier
    #[serde(default)]
    pub tier: Option<ResolutionTier>,
    /// Suggested `[min, max]` for display, passed through untouched
    #[serde(default)]
    pub display_range: Option<[f32; 2]>,
}

impl ChannelConfig {
    pub fn tier(&self) -> ResolutionTier {
        self.tier.unwrap_or_else(|| self.channel.native_tier())
    }
}

fn default_channels() -> Vec<ChannelConfig> {
    [
        (13, "Clean longwave IR (clouds)", [180.0, 300.0]),
        (2, "Red visible (daytime)", [0.0, 1.0]),
        (9, "Mid-level water vapor", [195.0, 295.0]),
        (7, "Shortwave IR (fog)", [190.0, 310.0]),
    ]
    .into_iter()
    .filter_map(|(band, label, range)| {
        ChannelSpec::from_band(band).ok().map(|channel| ChannelConfig {
            channel,
            label: label.to_string(),
            tier: None,
            display_range: Some(range),
        })
    })
    .collect()
}

/// A named geographic area, `extent` ordered `[west, east, south, north]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub extent: [f64; 4],
}

impl RegionConfig {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_extent(self.extent)
    }
}

/// Name given to a region built from explicit bounds.
pub const CUSTOM_REGION: &str = "Custom";

fn region(name: &str, extent: [f64; 4]) -> RegionConfig {
    RegionConfig {
        name: name.to_string(),
        extent,
    }
}

fn default_regions() -> Vec<RegionConfig> {
    vec![
        region("Argentina Centro", [-66.0, -56.5, -36.0, -29.0]),
        region("Buenos Aires (PBA)", [-64.0, -56.0, -41.5, -33.0]),
        region("Cuyo", [-71.0, -66.0, -38.0, -31.0]),
        region("NOA", [-69.0, -63.0, -28.0, -21.0]),
        region("NEA", [-63.0, -53.0, -31.0, -22.0]),
        region("Patagonia N", [-72.0, -62.0, -46.0, -36.0]),
        region("Patagonia S", [-74.0, -65.0, -56.0, -45.0]),
        region("Cono Sur", [-85.0, -45.0, -60.0, -15.0]),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Hours searched backwards for "most recent"
    #[serde(default = "default_lookback")]
    pub lookback_hours: usize,
}

fn default_lookback() -> usize {
    discovery::DEFAULT_LOOKBACK_HOURS
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            lookback_hours: default_lookback(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

fn default_ttl() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// How scenes are reduced to the area of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CropConfig {
    /// Fixed pixel windows per resolution tier
    FixedOffset {
        #[serde(default)]
        windows: TierWindows,
    },
    /// Fractions of the scene's own height and width
    Proportional {
        rows: [f64; 2],
        cols: [f64; 2],
    },
    /// A configured region projected through the scene geometry
    Geographic {
        region: String,
        #[serde(default = "default_samples_per_edge")]
        samples_per_edge: usize,
    },
}

fn default_samples_per_edge() -> usize {
    32
}

impl Default for CropConfig {
    fn default() -> Self {
        CropConfig::Geographic {
            region: "Argentina Centro".to_string(),
            samples_per_edge: default_samples_per_edge(),
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(content: &str) -> SceneResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| SceneError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load a YAML file.
    pub fn load(path: &Path) -> SceneResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SceneError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&content)?;
        debug!(path = %path.display(), channels = config.channels.len(), "Loaded engine config");
        Ok(config)
    }

    /// Apply `SCENE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> SceneResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `SCENE_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> SceneResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SCENE_BUCKET") {
            self.backend.bucket = val;
        }
        if let Some(val) = lookup("SCENE_PRODUCT") {
            self.backend.product = val;
        }
        if let Some(val) = lookup("SCENE_REGION") {
            self.backend.region = val;
        }
        if let Some(val) = lookup("SCENE_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_number("SCENE_CACHE_TTL_SECS", &val)?;
        }
        if let Some(val) = lookup("SCENE_LOOKBACK_HOURS") {
            self.discovery.lookback_hours = parse_number("SCENE_LOOKBACK_HOURS", &val)?;
        }
        if let Some(val) = lookup("SCENE_REQUEST_TIMEOUT_SECS") {
            self.backend.request_timeout_secs = parse_number("SCENE_REQUEST_TIMEOUT_SECS", &val)?;
        }
        if let Some(val) = lookup("SCENE_FETCH_TIMEOUT_SECS") {
            self.backend.fetch_timeout_secs = parse_number("SCENE_FETCH_TIMEOUT_SECS", &val)?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> SceneResult<()> {
        let fail = |msg: String| Err(SceneError::Config(msg));

        if self.backend.bucket.is_empty() || self.backend.product.is_empty() {
            return fail("backend.bucket and backend.product must be set".to_string());
        }
        if self.backend.strategies.is_empty() {
            return fail("backend.strategies must list at least one strategy".to_string());
        }
        if self.backend.request_timeout_secs == 0 || self.backend.fetch_timeout_secs == 0 {
            return fail("backend timeouts must be > 0".to_string());
        }
        if self.cache.ttl_secs == 0 {
            return fail("cache.ttl_secs must be > 0".to_string());
        }
        if self.discovery.lookback_hours == 0 {
            return fail("discovery.lookback_hours must be > 0".to_string());
        }
        if self.channels.is_empty() {
            return fail("at least one channel must be configured".to_string());
        }
        for (i, channel) in self.channels.iter().enumerate() {
            if self.channels[..i].iter().any(|c| c.channel == channel.channel) {
                return fail(format!("channel {} is configured twice", channel.channel));
            }
            if let Some([min, max]) = channel.display_range {
                if min >= max {
                    return fail(format!("display_range of {} is inverted", channel.channel));
                }
            }
        }
        for region in &self.regions {
            if !region.bounds().is_valid() {
                return fail(format!("region '{}' has inverted or out-of-range bounds", region.name));
            }
        }

        match &self.crop {
            CropConfig::Proportional { rows, cols } => {
                for (axis, [start, end]) in [("rows", rows), ("cols", cols)] {
                    if !(0.0..=1.0).contains(start) || !(0.0..=1.0).contains(end) || start >= end {
                        return fail(format!(
                            "crop.{} must satisfy 0 <= start < end <= 1, got [{}, {}]",
                            axis, start, end
                        ));
                    }
                }
            }
            CropConfig::Geographic { region, .. } => {
                if self.region(region).is_none() {
                    return fail(format!("crop.region '{}' is not a configured region", region));
                }
            }
            CropConfig::FixedOffset { windows } => {
                for (tier, window) in windows.iter() {
                    if window.is_empty() {
                        return fail(format!("crop window for {:?} is empty", tier));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn channel(&self, channel: &ChannelSpec) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| &c.channel == channel)
    }

    /// Region by name, ignoring ASCII case.
    pub fn region(&self, name: &str) -> Option<&RegionConfig> {
        self.regions
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Point the geographic crop at another configured region.
    pub fn select_region(&mut self, name: &str) -> SceneResult<()> {
        let region = self
            .region(name)
            .map(|r| r.name.clone())
            .ok_or_else(|| SceneError::Config(format!("unknown region '{}'", name)))?;

        let samples_per_edge = match &self.crop {
            CropConfig::Geographic {
                samples_per_edge, ..
            } => *samples_per_edge,
            _ => default_samples_per_edge(),
        };
        self.crop = CropConfig::Geographic {
            region,
            samples_per_edge,
        };
        Ok(())
    }

    /// Crop to an ad-hoc box, registered as the `Custom` region.
    pub fn select_custom_region(&mut self, bounds: BoundingBox) -> SceneResult<()> {
        if !bounds.is_valid() {
            return Err(SceneError::Config(format!(
                "custom region has inverted or out-of-range bounds: {:?}",
                bounds
            )));
        }
        self.regions.retain(|r| !r.name.eq_ignore_ascii_case(CUSTOM_REGION));
        self.regions.push(region(CUSTOM_REGION, bounds.extent()));
        self.select_region(CUSTOM_REGION)
    }

    /// Resolve the crop section into a runtime strategy.
    pub fn crop_strategy(&self) -> SceneResult<CropStrategy> {
        Ok(match &self.crop {
            CropConfig::FixedOffset { windows } => CropStrategy::FixedOffset(windows.clone()),
            CropConfig::Proportional { rows, cols } => CropStrategy::Proportional {
                rows: *rows,
                cols: *cols,
            },
            CropConfig::Geographic {
                region,
                samples_per_edge,
            } => {
                let config = self
                    .region(region)
                    .ok_or_else(|| SceneError::Config(format!("unknown region '{}'", region)))?;
                CropStrategy::Geographic {
                    region: NamedRegion {
                        name: config.name.clone(),
                        bounds: config.bounds(),
                    },
                    samples_per_edge: *samples_per_edge,
                }
            }
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> SceneResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SceneError::Config(format!("{} must be a non-negative integer, got '{}'", name, value)))
}
