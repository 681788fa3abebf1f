//! Fail-open cache-aside front.

use super::backend::CacheBackend;
use super::key::CacheKey;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ResultCacheConfig {
    pub enabled: bool,
    /// Bound on every backend call; an elapsed timeout degrades to a miss.
    pub op_timeout: Duration,
    pub max_entry_size: usize,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            op_timeout: Duration::from_secs(2),
            max_entry_size: 1024 * 1024,
        }
    }
}

impl ResultCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }
}

/// Outcome of a typed cache probe. There is no error variant: the read
/// path never raises, every failure classifies as a miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Hit(T),
    Miss,
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub errors: u64,
}

struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Typed cache-aside guard over a [`CacheBackend`].
///
/// `get` classifies every outcome as hit or miss: backend errors, timeouts
/// and undecodable payloads are misses (fail-open: cache unavailability
/// must never block producing a fresh result). `set` takes the TTL from the
/// caller because it is resource-kind-specific; a zero TTL means "do not
/// cache". Write failures are logged and swallowed.
pub struct ResultCache {
    config: ResultCacheConfig,
    backend: Box<dyn CacheBackend>,
    stats: AtomicStats,
}

impl ResultCache {
    pub fn new(config: ResultCacheConfig, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            stats: AtomicStats::new(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Lookup<T> {
        if !self.config.enabled {
            return Lookup::Miss;
        }
        let probe = tokio::time::timeout(self.config.op_timeout, self.backend.get(key));
        match probe.await {
            Ok(Ok(Some(data))) => match serde_json::from_slice(&data) {
                Ok(value) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    Lookup::Hit(value)
                }
                Err(err) => {
                    // Stale shape from an older release; treat as a miss so
                    // the entry gets overwritten with a fresh payload.
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(key = %key, error = %err, "cache payload undecodable");
                    Lookup::Miss
                }
            },
            Ok(Ok(None)) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Miss
            }
            Ok(Err(err)) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %err, "cache get failed, treating as miss");
                Lookup::Miss
            }
            Err(_) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, "cache get timed out, treating as miss");
                Lookup::Miss
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if !self.config.enabled || ttl.is_zero() {
            return;
        }
        let data = match serde_json::to_vec(value) {
            Ok(data) => data,
            Err(err) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %err, "cache payload unserializable");
                return;
            }
        };
        if data.len() > self.config.max_entry_size {
            return;
        }
        let write = tokio::time::timeout(self.config.op_timeout, self.backend.set(key, &data, ttl));
        match write.await {
            Ok(Ok(())) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(err)) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %err, "cache set failed");
            }
            Err(_) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, "cache set timed out");
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
