//! Result caching in front of every paid provider call.
//!
//! The cache is a cache-aside guard: callers derive a namespaced key from
//! the typed request parameters, probe the cache, and only on a miss pay
//! for the provider call before populating the cache with a TTL chosen per
//! resource kind. The cache is strictly best-effort: backend failures,
//! timeouts, and undecodable payloads all classify as misses and never
//! block producing a fresh result.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheKey`] / [`KeyDeriver`] | Deterministic digest keys per resource kind |
//! | [`ResourceKind`] | Namespace tags for every cacheable resource |
//! | [`CacheBackend`] | Trait for pluggable cache backends |
//! | [`MemoryCache`] | Bounded in-memory implementation |
//! | [`NullCache`] | No-op backend for disabling caching |
//! | [`ResultCache`] | Typed, fail-open cache-aside front |
//! | [`TtlPolicy`] | Per-kind time-to-live defaults |

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, MemoryCache, NullCache};
pub use key::{CacheKey, KeyDeriver, ResourceKind};
pub use manager::{CacheStats, Lookup, ResultCache, ResultCacheConfig};

use std::time::Duration;

/// Per-kind time-to-live policy.
///
/// Volatile results expire quickly; rarely-changing details and
/// translations are kept far longer.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
    pub web_search: Duration,
    pub image_search: Duration,
    pub video_search: Duration,
    pub video_details: Duration,
    pub place_text: Duration,
    pub place_details: Duration,
    pub nearby_places: Duration,
    pub translation: Duration,
    pub detect_language: Duration,
    pub ai_search: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        const HOUR: Duration = Duration::from_secs(60 * 60);
        const DAY: Duration = Duration::from_secs(24 * 60 * 60);
        Self {
            web_search: HOUR,
            image_search: 6 * HOUR,
            video_search: 6 * HOUR,
            video_details: 6 * HOUR,
            place_text: HOUR,
            place_details: DAY,
            nearby_places: HOUR,
            translation: 7 * DAY,
            detect_language: 7 * DAY,
            ai_search: 6 * HOUR,
        }
    }
}

impl TtlPolicy {
    /// TTL to use when writing a payload of the given kind.
    pub fn for_kind(&self, kind: ResourceKind) -> Duration {
        match kind {
            ResourceKind::WebSearch => self.web_search,
            ResourceKind::ImageSearch => self.image_search,
            ResourceKind::VideoSearch => self.video_search,
            ResourceKind::VideoDetails => self.video_details,
            ResourceKind::PlaceText => self.place_text,
            ResourceKind::PlaceDetails => self.place_details,
            ResourceKind::NearbyPlaces => self.nearby_places,
            ResourceKind::Translation => self.translation,
            ResourceKind::DetectLanguage => self.detect_language,
            ResourceKind::AiSearch => self.ai_search,
        }
    }
}
