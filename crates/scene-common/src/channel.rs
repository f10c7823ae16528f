//! ABI channels, resolution tiers and scan-mode markers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{SceneError, SceneResult};

/// One ABI measurement band, identified by its number (1-16).
///
/// Accepts `"13"`, `"C13"`, `"c13"` when parsed; always renders as `C13`,
/// which is the form embedded in archive object names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelSpec {
    band: u8,
}

impl ChannelSpec {
    pub fn from_band(band: u8) -> SceneResult<Self> {
        if !(1..=16).contains(&band) {
            return Err(SceneError::InvalidRequest(format!(
                "channel {} out of range (1-16)",
                band
            )));
        }
        Ok(Self { band })
    }

    pub fn parse(s: &str) -> SceneResult<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('C')
            .or_else(|| trimmed.strip_prefix('c'))
            .unwrap_or(trimmed);
        let band: u8 = digits
            .parse()
            .map_err(|_| SceneError::InvalidRequest(format!("invalid channel '{}'", s)))?;
        Self::from_band(band)
    }

    pub fn band(&self) -> u8 {
        self.band
    }

    /// Code as it appears in object names, e.g. `C13`.
    pub fn code(&self) -> String {
        format!("C{:02}", self.band)
    }

    /// Native resolution of the band at the sub-satellite point.
    pub fn native_tier(&self) -> ResolutionTier {
        match self.band {
            2 => ResolutionTier::HalfKm,
            1 | 3 | 5 => ResolutionTier::OneKm,
            _ => ResolutionTier::TwoKm,
        }
    }
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{:02}", self.band)
    }
}

impl FromStr for ChannelSpec {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChannelSpec {
    type Error = SceneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChannelSpec> for String {
    fn from(channel: ChannelSpec) -> Self {
        channel.code()
    }
}

/// Pixel density class of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    /// 0.5 km (band 2)
    HalfKm,
    /// 1 km (bands 1, 3, 5)
    OneKm,
    /// 2 km (everything else)
    TwoKm,
}

impl ResolutionTier {
    /// Nominal full-disk side length in pixels.
    pub fn full_disk_size(&self) -> usize {
        match self {
            ResolutionTier::HalfKm => 21696,
            ResolutionTier::OneKm => 10848,
            ResolutionTier::TwoKm => 5424,
        }
    }
}

/// Acquisition-mode marker embedded in object names.
///
/// Both markers name the same physical product; neither is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanMode {
    /// 15-minute full disk
    Mode3,
    /// 10-minute full disk
    Mode6,
}

impl ScanMode {
    pub const ALL: [ScanMode; 2] = [ScanMode::Mode3, ScanMode::Mode6];

    pub fn marker(&self) -> &'static str {
        match self {
            ScanMode::Mode3 => "M3",
            ScanMode::Mode6 => "M6",
        }
    }

    /// Name fragment identifying `channel` in this mode, e.g. `M6C13`.
    pub fn channel_token(&self, channel: &ChannelSpec) -> String {
        format!("{}{}", self.marker(), channel.code())
    }

    /// Which mode a name was captured in for `channel`, if any.
    pub fn detect(name: &str, channel: &ChannelSpec) -> Option<ScanMode> {
        Self::ALL
            .into_iter()
            .find(|mode| name.contains(&mode.channel_token(channel)))
    }
}
