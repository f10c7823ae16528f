//! Discovery state machine.
//!
//! Per request: take the next probe key (Resolving), run the strategy
//! chain on its prefix (Probing), filter and pick a candidate (Selecting).
//! A miss in "most recent" mode moves to the next older key (Advancing);
//! running out of keys ends in a typed failure (Exhausted).
//!
//! Within one key the chain falls through to the next strategy when a
//! strategy fails or reports an empty prefix. A non-empty listing with no
//! match for the channel is a final answer for that key; other strategies
//! list the same prefix and would not find the channel either.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use scene_common::{ChannelSpec, SceneError, SceneResult, TimeKey, TimeRequest};

use crate::candidate::{filter_eligible, select_latest, ResolvedScene};
use crate::index::{IndexError, ObjectIndexStrategy, StrategyKind};
use crate::layout::ArchiveLayout;
use crate::time_window::TimeWindowResolver;

/// Default bound on each strategy call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Resolves requests to objects through an ordered strategy chain.
#[derive(Clone)]
pub struct DiscoveryOrchestrator {
    layout: ArchiveLayout,
    resolver: TimeWindowResolver,
    strategies: Vec<Arc<dyn ObjectIndexStrategy>>,
    call_timeout: Duration,
}

impl DiscoveryOrchestrator {
    pub fn new(layout: ArchiveLayout, resolver: TimeWindowResolver) -> Self {
        Self {
            layout,
            resolver,
            strategies: Vec::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Append a strategy to the end of the fallback chain.
    pub fn with_strategy(mut self, strategy: Arc<dyn ObjectIndexStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    pub fn resolver(&self) -> &TimeWindowResolver {
        &self.resolver
    }

    /// Strategy kinds in fallback order.
    pub fn chain(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Resolve `request` for `channel` to exactly one object.
    #[instrument(skip(self, request), fields(channel = %channel, latest = request.is_latest()))]
    pub async fn resolve(
        &self,
        channel: &ChannelSpec,
        request: &TimeRequest,
    ) -> SceneResult<ResolvedScene> {
        if self.strategies.is_empty() {
            return Err(SceneError::Config(
                "no index strategies configured".to_string(),
            ));
        }

        let keys = self.resolver.probe_keys(request);

        if let TimeRequest::Exact { key } = request {
            // Exactly one key; its failure is the answer
            return self.probe(channel, key).await;
        }

        let mut all_unreachable = true;
        let mut last_error = None;
        for key in &keys {
            match self.probe(channel, key).await {
                Ok(resolved) => return Ok(resolved),
                Err(err) => {
                    debug!(time_key = %key, kind = err.kind(), "Hour had no usable scene, advancing");
                    all_unreachable &= matches!(err, SceneError::BackendUnreachable { .. });
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if all_unreachable => Err(err),
            _ => {
                warn!(hours = keys.len(), "Lookback exhausted without a scene");
                Err(SceneError::LookbackExhausted {
                    channel: channel.code(),
                    hours: keys.len(),
                })
            }
        }
    }

    /// Probe and select within a single hourly bucket.
    pub async fn probe(&self, channel: &ChannelSpec, key: &TimeKey) -> SceneResult<ResolvedScene> {
        let prefix = self.layout.prefix(key);
        let (strategy, listed) = self.list_with_fallback(&prefix).await?;

        let listed_count = listed.len();
        let eligible = filter_eligible(listed, channel);
        let candidate = select_latest(&eligible)
            .cloned()
            .ok_or_else(|| SceneError::NoChannelMatch {
                channel: channel.code(),
                prefix: prefix.clone(),
                listed: listed_count,
            })?;

        let scan_mode = candidate
            .scan_mode(channel)
            .ok_or_else(|| SceneError::InvalidRequest(format!("{} lost its marker", candidate)))?;

        info!(
            time_key = %key,
            key = %candidate,
            strategy = %strategy,
            eligible = eligible.len(),
            "Resolved scene"
        );

        Ok(ResolvedScene {
            candidate,
            channel: *channel,
            time_key: *key,
            scan_mode,
            strategy,
        })
    }

    /// First non-empty listing along the chain.
    async fn list_with_fallback(&self, prefix: &str) -> SceneResult<(StrategyKind, Vec<String>)> {
        let mut saw_empty = false;
        let mut failures: Vec<(StrategyKind, IndexError)> = Vec::new();

        for (position, strategy) in self.strategies.iter().enumerate() {
            let kind = strategy.kind();
            if position > 0 {
                metrics::counter!("scene_index_fallbacks_total", "strategy" => kind.name())
                    .increment(1);
            }

            let outcome = match tokio::time::timeout(self.call_timeout, strategy.list(prefix)).await
            {
                Ok(result) => result,
                Err(_) => Err(IndexError::Timeout(self.call_timeout)),
            };

            match outcome {
                Ok(keys) if !keys.is_empty() => {
                    debug!(strategy = %kind, prefix = %prefix, count = keys.len(), "Listed prefix");
                    return Ok((kind, keys));
                }
                Ok(_) => {
                    debug!(strategy = %kind, prefix = %prefix, "Prefix empty, trying next strategy");
                    saw_empty = true;
                }
                Err(err) => {
                    warn!(strategy = %kind, prefix = %prefix, error = %err, "Index strategy failed");
                    failures.push((kind, err));
                }
            }
        }

        let answered_empty = saw_empty || failures.iter().any(|(_, e)| e.is_not_found());
        if answered_empty {
            return Err(SceneError::EmptyIndex {
                prefix: prefix.to_string(),
            });
        }

        let message = failures
            .iter()
            .map(|(kind, err)| format!("{}: {}", kind, err))
            .collect::<Vec<_>>()
            .join("; ");
        Err(SceneError::BackendUnreachable {
            prefix: prefix.to_string(),
            message,
        })
    }
}
