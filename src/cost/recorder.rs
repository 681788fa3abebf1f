//! Buffered write-behind access recorder.

use super::entry::{AccessLogEntry, TimeWindow, UsageSummary};
use super::store::LogStore;
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Buffer size that triggers an immediate asynchronous flush.
    pub max_buffer: usize,
    /// Interval of the background flush sweep.
    pub flush_interval: std::time::Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_buffer: 100,
            flush_interval: std::time::Duration::from_secs(30),
        }
    }
}

impl RecorderConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_max_buffer(mut self, max: usize) -> Self {
        self.max_buffer = max;
        self
    }
    pub fn with_flush_interval(mut self, interval: std::time::Duration) -> Self {
        self.flush_interval = interval;
        self
    }
}

/// Asynchronous, batched recorder of access log entries.
///
/// `record` appends to a lock-guarded buffer and returns immediately; the
/// buffer is flushed to the durable store when it reaches `max_buffer`
/// (spawned flush) or on the interval sweep, whichever comes first. A flush
/// swaps in a fresh buffer under the lock and writes the captured batch as
/// one durable write. Flush failures are logged and dropped: telemetry
/// must never fail or slow the request that produced it.
///
/// Must be created inside a Tokio runtime (the sweep task is spawned on
/// construction).
pub struct CostRecorder {
    store: Arc<dyn LogStore>,
    buffer: Mutex<Vec<AccessLogEntry>>,
    config: RecorderConfig,
    shutdown: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CostRecorder {
    pub fn new(store: Arc<dyn LogStore>, config: RecorderConfig) -> Arc<Self> {
        let (shutdown, mut watch_rx) = watch::channel(false);
        let recorder = Arc::new(Self {
            store,
            buffer: Mutex::new(Vec::with_capacity(config.max_buffer)),
            config: config.clone(),
            shutdown,
            sweeper: Mutex::new(None),
        });

        let weak = Arc::downgrade(&recorder);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match weak.upgrade() {
                            Some(recorder) => recorder.flush().await,
                            None => break,
                        }
                    }
                    changed = watch_rx.changed() => {
                        if changed.is_err() || *watch_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
        *recorder.sweeper.lock().unwrap() = Some(handle);
        recorder
    }

    /// Enqueue one entry. Never blocks on I/O and never fails.
    pub fn record(self: &Arc<Self>, entry: AccessLogEntry) {
        let should_flush = {
            let mut buffer = self.buffer.lock().unwrap();
            buffer.push(entry);
            buffer.len() >= self.config.max_buffer
        };
        if should_flush {
            let recorder = Arc::clone(self);
            tokio::spawn(async move { recorder.flush().await });
        }
    }

    /// Flush the current buffer to the durable store.
    ///
    /// On failure the batch is dropped: never retried, never re-buffered,
    /// never propagated.
    pub async fn flush(&self) {
        let batch = {
            let mut buffer = self.buffer.lock().unwrap();
            if buffer.is_empty() {
                return;
            }
            std::mem::replace(&mut *buffer, Vec::with_capacity(self.config.max_buffer))
        };
        let count = batch.len();
        if let Err(err) = self.store.append_batch(&batch).await {
            tracing::warn!(count, error = %err, "dropping access log batch, flush failed");
        } else {
            tracing::debug!(count, "access log batch flushed");
        }
    }

    /// Entries currently buffered (not yet durable).
    pub fn pending(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    /// Usage aggregates for the window, computed from the durable store.
    /// May lag entries that have not been flushed yet.
    pub async fn usage_summary(&self, window: &TimeWindow) -> Result<UsageSummary> {
        let by_service = self.store.stats_by_service(window).await?;
        let service_costs = self.store.service_costs(window).await?;
        let cache_hit_rate = self.store.cache_hit_rate(window).await?;
        let total_cost = self.store.total_cost(window).await?;

        let mut total_requests = 0;
        let mut provider_requests = 0;
        let mut cache_hits = 0;
        for stats in &by_service {
            total_requests += stats.total_requests;
            provider_requests += stats.provider_hits;
            cache_hits += stats.cache_hits;
        }

        Ok(UsageSummary {
            window: *window,
            total_requests,
            provider_requests,
            cache_hits,
            cache_hit_rate,
            total_cost,
            cost_saved: total_cost * (cache_hit_rate / 100.0),
            by_service,
            service_costs,
        })
    }

    /// Direct access to the backing store for the remaining aggregates.
    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    /// Remove durable entries older than `before`; returns the count.
    pub async fn prune(&self, before: DateTime<Utc>) -> Result<u64> {
        self.store.delete_before(before).await
    }

    /// Stop the sweep task and flush whatever is buffered.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.sweeper.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::MemoryLogStore;
    use std::time::Duration;

    fn entry() -> AccessLogEntry {
        AccessLogEntry::provider(
            "search",
            "web_search",
            serde_json::json!({"query": "q"}),
            0.005,
            Duration::from_millis(10),
            None,
        )
    }

    #[tokio::test]
    async fn test_forced_flush_is_exact() {
        let store = Arc::new(MemoryLogStore::new());
        let recorder = CostRecorder::new(
            store.clone(),
            RecorderConfig::new().with_max_buffer(1000),
        );
        for _ in 0..25 {
            recorder.record(entry());
        }
        assert_eq!(store.len(), 0);
        recorder.flush().await;
        assert_eq!(store.len(), 25);
        assert_eq!(recorder.pending(), 0);

        // A second flush of an empty buffer writes nothing.
        recorder.flush().await;
        assert_eq!(store.len(), 25);
    }

    #[tokio::test]
    async fn test_threshold_triggers_async_flush() {
        let store = Arc::new(MemoryLogStore::new());
        let recorder = CostRecorder::new(store.clone(), RecorderConfig::new().with_max_buffer(3));
        for _ in 0..3 {
            recorder.record(entry());
        }
        // The flush runs on a spawned task; poll briefly.
        for _ in 0..50 {
            if store.len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_interval_sweep_flushes() {
        let store = Arc::new(MemoryLogStore::new());
        let recorder = CostRecorder::new(
            store.clone(),
            RecorderConfig::new()
                .with_max_buffer(1000)
                .with_flush_interval(Duration::from_millis(20)),
        );
        recorder.record(entry());
        for _ in 0..50 {
            if store.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_remainder() {
        let store = Arc::new(MemoryLogStore::new());
        let recorder = CostRecorder::new(store.clone(), RecorderConfig::default());
        recorder.record(entry());
        recorder.shutdown().await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_summary_cost_saved() {
        let store = Arc::new(MemoryLogStore::new());
        let recorder = CostRecorder::new(store.clone(), RecorderConfig::default());
        recorder.record(entry());
        recorder.record(AccessLogEntry::cache_hit("search", "web_search", "k", None));
        recorder.flush().await;

        let summary = recorder
            .usage_summary(&TimeWindow::last_days(1))
            .await
            .unwrap();
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.provider_requests, 1);
        assert_eq!(summary.cache_hits, 1);
        assert!((summary.cache_hit_rate - 50.0).abs() < 1e-9);
        assert!((summary.total_cost - 0.005).abs() < 1e-9);
        assert!((summary.cost_saved - 0.0025).abs() < 1e-9);
    }
}
