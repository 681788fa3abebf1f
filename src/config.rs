//! Gateway configuration.

use crate::cache::{ResultCacheConfig, TtlPolicy};
use crate::cost::{CostSchedule, RecorderConfig};
use std::time::Duration;

/// Parameters of the generative enrichment calls.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub narrative_max_tokens: u32,
    pub guide_max_tokens: u32,
    pub temperature: f64,
    /// How many related media items to attach.
    pub related_media_limit: u32,
    /// Bound on each generation sub-call.
    pub call_timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            narrative_max_tokens: 3000,
            guide_max_tokens: 2500,
            temperature: 0.7,
            related_media_limit: 5,
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Top-level configuration, builder-style.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Language substituted when a request omits one.
    pub default_language: String,
    pub ttl: TtlPolicy,
    /// Injected per-call cost estimates (provider prices change; they are
    /// configuration, not constants).
    pub costs: CostSchedule,
    pub cache: ResultCacheConfig,
    /// Bound on every provider call made from the request path.
    pub provider_timeout: Duration,
    pub recorder: RecorderConfig,
    /// Forward expiry applied to generated enrichment records.
    pub enrichment_ttl: Duration,
    /// Concurrency bound of the background generation pool.
    pub max_generation_tasks: usize,
    pub generation: GenerationConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_language: "th".into(),
            ttl: TtlPolicy::default(),
            costs: CostSchedule::default(),
            cache: ResultCacheConfig::default(),
            provider_timeout: Duration::from_secs(15),
            recorder: RecorderConfig::default(),
            enrichment_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            max_generation_tasks: 4,
            generation: GenerationConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_language(mut self, lang: impl Into<String>) -> Self {
        self.default_language = lang.into();
        self
    }

    pub fn with_ttl(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_costs(mut self, costs: CostSchedule) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_recorder(mut self, recorder: RecorderConfig) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_enrichment_ttl(mut self, ttl: Duration) -> Self {
        self.enrichment_ttl = ttl;
        self
    }

    pub fn with_max_generation_tasks(mut self, max: usize) -> Self {
        self.max_generation_tasks = max;
        self
    }
}
