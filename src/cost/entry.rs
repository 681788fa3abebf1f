//! Access log records and aggregate views.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Where a response came from. A `Provider` access is a paid call; `Cache`
/// and `Store` hits were previously paid for and cost nothing now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessSource {
    Provider,
    Cache,
    Store,
}

impl AccessSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessSource::Provider => "provider",
            AccessSource::Cache => "cache",
            AccessSource::Store => "store",
        }
    }
}

/// One access to a provider, the cache, or the durable store.
/// Append-only and immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub id: Uuid,
    pub service_name: String,
    pub endpoint: String,
    pub source: AccessSource,
    pub cache_key: Option<String>,
    /// Request parameters serialized as JSON, for auditing.
    pub request_params: String,
    /// Estimated cost in USD; always zero for cache and store hits.
    pub estimated_cost: f64,
    pub duration_ms: u64,
    pub user_id: Option<Uuid>,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AccessLogEntry {
    /// A paid provider call.
    pub fn provider(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        params: serde_json::Value,
        estimated_cost: f64,
        duration: Duration,
        user_id: Option<Uuid>,
    ) -> Self {
        Self::provider_outcome(service, endpoint, params, estimated_cost, duration, user_id, None)
    }

    /// A failed provider call; the estimate is still recorded because most
    /// providers bill attempts.
    pub fn provider_failure(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        params: serde_json::Value,
        estimated_cost: f64,
        duration: Duration,
        user_id: Option<Uuid>,
        error: impl Into<String>,
    ) -> Self {
        Self::provider_outcome(
            service,
            endpoint,
            params,
            estimated_cost,
            duration,
            user_id,
            Some(error.into()),
        )
    }

    fn provider_outcome(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        params: serde_json::Value,
        estimated_cost: f64,
        duration: Duration,
        user_id: Option<Uuid>,
        error: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_name: service.into(),
            endpoint: endpoint.into(),
            source: AccessSource::Provider,
            cache_key: None,
            request_params: params.to_string(),
            estimated_cost,
            duration_ms: duration.as_millis() as u64,
            user_id,
            success: error.is_none(),
            error_message: error,
            created_at: Utc::now(),
        }
    }

    /// A cache hit; free.
    pub fn cache_hit(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        cache_key: impl Into<String>,
        user_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_name: service.into(),
            endpoint: endpoint.into(),
            source: AccessSource::Cache,
            cache_key: Some(cache_key.into()),
            request_params: String::new(),
            estimated_cost: 0.0,
            duration_ms: 0,
            user_id,
            success: true,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// A durable-store hit (previously generated content); free.
    pub fn store_hit(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        user_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_name: service.into(),
            endpoint: endpoint.into(),
            source: AccessSource::Store,
            cache_key: None,
            request_params: String::new(),
            estimated_cost: 0.0,
            duration_ms: 0,
            user_id,
            success: true,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}

/// Half-open wall-clock window for aggregate queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The trailing `days` days, ending now.
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - chrono::Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Per-service (or per-endpoint) request statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    pub service_name: String,
    pub endpoint: Option<String>,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub provider_hits: u64,
    /// Percentage of requests served without a paid call.
    pub cache_hit_rate: f64,
    pub total_cost: f64,
    pub avg_duration_ms: f64,
}

/// Daily rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub provider_hits: u64,
    pub total_cost: f64,
}

/// Cost breakdown for one service, paid calls only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCost {
    pub service_name: String,
    pub total_requests: u64,
    pub total_cost: f64,
    pub cost_per_request: f64,
}

/// Aggregated usage view over one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    pub window: TimeWindow,
    pub total_requests: u64,
    pub provider_requests: u64,
    pub cache_hits: u64,
    pub cache_hit_rate: f64,
    pub total_cost: f64,
    /// Estimated spend avoided by serving hits instead of paid calls.
    pub cost_saved: f64,
    pub by_service: Vec<ServiceStats>,
    pub service_costs: Vec<ServiceCost>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_are_free_and_successful() {
        let cache = AccessLogEntry::cache_hit("search", "web_search", "search:abc", None);
        assert_eq!(cache.source, AccessSource::Cache);
        assert_eq!(cache.estimated_cost, 0.0);
        assert!(cache.success);

        let store = AccessLogEntry::store_hit("generative", "enrichment", None);
        assert_eq!(store.source, AccessSource::Store);
        assert_eq!(store.estimated_cost, 0.0);
        assert!(store.success);
    }

    #[test]
    fn test_provider_failure_keeps_estimate() {
        let entry = AccessLogEntry::provider_failure(
            "search",
            "web_search",
            serde_json::json!({"query": "q"}),
            0.005,
            Duration::from_millis(120),
            None,
            "upstream 503",
        );
        assert!(!entry.success);
        assert_eq!(entry.estimated_cost, 0.005);
        assert_eq!(entry.error_message.as_deref(), Some("upstream 503"));
    }

    #[test]
    fn test_window_contains() {
        let window = TimeWindow::last_days(7);
        assert!(window.contains(Utc::now() - chrono::Duration::days(1)));
        assert!(!window.contains(Utc::now() - chrono::Duration::days(8)));
    }
}
