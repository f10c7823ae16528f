//! Expansion of time requests into hourly probe keys.

use scene_common::{TimeKey, TimeRequest};

/// Hours searched backwards for "most recent".
pub const DEFAULT_LOOKBACK_HOURS: usize = 12;

/// Produces the ordered buckets a request should probe.
///
/// An exact request yields exactly its own bucket. A "most recent" request
/// yields the bucket containing `now` followed by progressively older
/// ones, newest first, `lookback` buckets in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindowResolver {
    lookback: usize,
}

impl Default for TimeWindowResolver {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK_HOURS)
    }
}

impl TimeWindowResolver {
    /// A zero lookback still probes the current hour.
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
        }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn probe_keys(&self, request: &TimeRequest) -> Vec<TimeKey> {
        match request {
            TimeRequest::Exact { key } => vec![*key],
            TimeRequest::Latest { .. } => {
                let mut keys = Vec::with_capacity(self.lookback);
                let mut key = request.anchor();
                for _ in 0..self.lookback {
                    keys.push(key);
                    key = key.previous();
                }
                keys
            }
        }
    }
}
