//! Candidate keys, eligibility and the selection policy.
//!
//! Object names embed the capture start as `_sYYYYJJJHHMMSSt`, so within one
//! hourly prefix the lexicographically greatest eligible key is the most
//! recent capture. Selection uses that convention over full keys and does
//! not prefer either scan-mode marker.

use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use scene_common::{ChannelSpec, ScanMode, TimeKey};

use crate::index::StrategyKind;

/// One key reported by an index backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectCandidate {
    key: String,
}

impl ObjectCandidate {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Bucket-relative key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// File name (last path segment).
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Scan mode the name was captured in for `channel`, if eligible.
    pub fn scan_mode(&self, channel: &ChannelSpec) -> Option<ScanMode> {
        ScanMode::detect(self.name(), channel)
    }

    pub fn is_eligible(&self, channel: &ChannelSpec) -> bool {
        self.scan_mode(channel).is_some()
    }

    /// Capture start parsed from the `_s` stamp, to tenths of a second.
    pub fn capture_start(&self) -> Option<DateTime<Utc>> {
        let (_, stamp) = self.name().rsplit_once("_s")?;
        let digits = stamp.get(..14)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year: i32 = digits[0..4].parse().ok()?;
        let ordinal: u32 = digits[4..7].parse().ok()?;
        let hour: u32 = digits[7..9].parse().ok()?;
        let minute: u32 = digits[9..11].parse().ok()?;
        let second: u32 = digits[11..13].parse().ok()?;
        let tenth: u32 = digits[13..14].parse().ok()?;

        let naive = NaiveDate::from_yo_opt(year, ordinal)?.and_hms_milli_opt(
            hour,
            minute,
            second,
            tenth * 100,
        )?;
        Some(Utc.from_utc_datetime(&naive))
    }

    /// Short stamp `YYYYJJJHHMM` shown next to a rendered scene.
    pub fn display_stamp(&self) -> Option<&str> {
        let (_, stamp) = self.name().rsplit_once("_s")?;
        stamp.get(..11)
    }
}

impl fmt::Display for ObjectCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl From<String> for ObjectCandidate {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Keys that name `channel` under either scan-mode marker.
pub fn filter_eligible<I>(keys: I, channel: &ChannelSpec) -> Vec<ObjectCandidate>
where
    I: IntoIterator<Item = String>,
{
    keys.into_iter()
        .map(ObjectCandidate::new)
        .filter(|c| c.is_eligible(channel))
        .collect()
}

/// Lexicographic maximum by key.
pub fn select_latest(candidates: &[ObjectCandidate]) -> Option<&ObjectCandidate> {
    candidates.iter().max()
}

/// The object chosen for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedScene {
    pub candidate: ObjectCandidate,
    pub channel: ChannelSpec,
    /// Bucket the object was found in, which for "most recent" may be older
    /// than the requested hour
    pub time_key: TimeKey,
    pub scan_mode: ScanMode,
    /// Strategy whose listing produced the candidate
    pub strategy: StrategyKind,
}

impl ResolvedScene {
    pub fn key(&self) -> &str {
        self.candidate.key()
    }
}
