//! Durable log storage and window-scoped aggregates.

use super::entry::{
    AccessLogEntry, AccessSource, DailyStats, ServiceCost, ServiceStats, TimeWindow,
};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Durable, append-only log store with aggregate queries.
///
/// Batches are written as one durable write; aggregates only see flushed
/// entries. Cost sums count paid calls only: cache and store hits carry a
/// zero estimate by construction.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append_batch(&self, entries: &[AccessLogEntry]) -> Result<()>;
    async fn stats_by_service(&self, window: &TimeWindow) -> Result<Vec<ServiceStats>>;
    async fn stats_by_endpoint(
        &self,
        service: Option<&str>,
        window: &TimeWindow,
    ) -> Result<Vec<ServiceStats>>;
    async fn daily_stats(&self, window: &TimeWindow) -> Result<Vec<DailyStats>>;
    async fn service_costs(&self, window: &TimeWindow) -> Result<Vec<ServiceCost>>;
    async fn total_cost(&self, window: &TimeWindow) -> Result<f64>;
    async fn cache_hit_rate(&self, window: &TimeWindow) -> Result<f64>;
    /// Delete entries created before `before`; returns the number removed.
    async fn delete_before(&self, before: DateTime<Utc>) -> Result<u64>;
}

#[derive(Default)]
struct Bucket {
    total: u64,
    cache_hits: u64,
    provider_hits: u64,
    total_cost: f64,
    duration_sum: u64,
}

impl Bucket {
    fn add(&mut self, entry: &AccessLogEntry) {
        self.total += 1;
        match entry.source {
            AccessSource::Provider => self.provider_hits += 1,
            AccessSource::Cache | AccessSource::Store => self.cache_hits += 1,
        }
        self.total_cost += entry.estimated_cost;
        self.duration_sum += entry.duration_ms;
    }

    fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.cache_hits as f64 * 100.0 / self.total as f64
        }
    }
}

/// In-memory [`LogStore`] for tests and single-process deployments.
pub struct MemoryLogStore {
    entries: RwLock<Vec<AccessLogEntry>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<AccessLogEntry> {
        self.entries.read().unwrap().clone()
    }

    fn in_window(&self, window: &TimeWindow) -> Vec<AccessLogEntry> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| window.contains(e.created_at))
            .cloned()
            .collect()
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append_batch(&self, entries: &[AccessLogEntry]) -> Result<()> {
        self.entries.write().unwrap().extend_from_slice(entries);
        Ok(())
    }

    async fn stats_by_service(&self, window: &TimeWindow) -> Result<Vec<ServiceStats>> {
        let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
        for entry in self.in_window(window) {
            buckets.entry(entry.service_name.clone()).or_default().add(&entry);
        }
        let mut stats: Vec<ServiceStats> = buckets
            .into_iter()
            .map(|(service_name, b)| ServiceStats {
                service_name,
                endpoint: None,
                total_requests: b.total,
                cache_hits: b.cache_hits,
                provider_hits: b.provider_hits,
                cache_hit_rate: b.hit_rate(),
                total_cost: b.total_cost,
                avg_duration_ms: if b.total == 0 {
                    0.0
                } else {
                    b.duration_sum as f64 / b.total as f64
                },
            })
            .collect();
        stats.sort_by(|a, b| b.total_requests.cmp(&a.total_requests));
        Ok(stats)
    }

    async fn stats_by_endpoint(
        &self,
        service: Option<&str>,
        window: &TimeWindow,
    ) -> Result<Vec<ServiceStats>> {
        let mut buckets: BTreeMap<(String, String), Bucket> = BTreeMap::new();
        for entry in self.in_window(window) {
            if let Some(filter) = service {
                if entry.service_name != filter {
                    continue;
                }
            }
            buckets
                .entry((entry.service_name.clone(), entry.endpoint.clone()))
                .or_default()
                .add(&entry);
        }
        let mut stats: Vec<ServiceStats> = buckets
            .into_iter()
            .map(|((service_name, endpoint), b)| ServiceStats {
                service_name,
                endpoint: Some(endpoint),
                total_requests: b.total,
                cache_hits: b.cache_hits,
                provider_hits: b.provider_hits,
                cache_hit_rate: b.hit_rate(),
                total_cost: b.total_cost,
                avg_duration_ms: if b.total == 0 {
                    0.0
                } else {
                    b.duration_sum as f64 / b.total as f64
                },
            })
            .collect();
        stats.sort_by(|a, b| b.total_requests.cmp(&a.total_requests));
        Ok(stats)
    }

    async fn daily_stats(&self, window: &TimeWindow) -> Result<Vec<DailyStats>> {
        let mut buckets: BTreeMap<chrono::NaiveDate, Bucket> = BTreeMap::new();
        for entry in self.in_window(window) {
            buckets
                .entry(entry.created_at.date_naive())
                .or_default()
                .add(&entry);
        }
        Ok(buckets
            .into_iter()
            .rev()
            .map(|(date, b)| DailyStats {
                date,
                total_requests: b.total,
                cache_hits: b.cache_hits,
                provider_hits: b.provider_hits,
                total_cost: b.total_cost,
            })
            .collect())
    }

    async fn service_costs(&self, window: &TimeWindow) -> Result<Vec<ServiceCost>> {
        let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
        for entry in self.in_window(window) {
            if entry.source != AccessSource::Provider {
                continue;
            }
            buckets.entry(entry.service_name.clone()).or_default().add(&entry);
        }
        let mut costs: Vec<ServiceCost> = buckets
            .into_iter()
            .map(|(service_name, b)| ServiceCost {
                service_name,
                total_requests: b.total,
                total_cost: b.total_cost,
                cost_per_request: if b.total == 0 {
                    0.0
                } else {
                    b.total_cost / b.total as f64
                },
            })
            .collect();
        costs.sort_by(|a, b| {
            b.total_cost
                .partial_cmp(&a.total_cost)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(costs)
    }

    async fn total_cost(&self, window: &TimeWindow) -> Result<f64> {
        Ok(self
            .in_window(window)
            .iter()
            .filter(|e| e.source == AccessSource::Provider)
            .map(|e| e.estimated_cost)
            .sum())
    }

    async fn cache_hit_rate(&self, window: &TimeWindow) -> Result<f64> {
        let entries = self.in_window(window);
        if entries.is_empty() {
            return Ok(0.0);
        }
        let hits = entries
            .iter()
            .filter(|e| e.source != AccessSource::Provider)
            .count();
        Ok(hits as f64 * 100.0 / entries.len() as f64)
    }

    async fn delete_before(&self, before: DateTime<Utc>) -> Result<u64> {
        let mut entries = self.entries.write().unwrap();
        let original = entries.len();
        entries.retain(|e| e.created_at >= before);
        Ok((original - entries.len()) as u64)
    }
}
