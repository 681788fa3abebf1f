//! # tourgate
//!
//! Cost-aware caching and enrichment gateway for paid travel-data providers.
//!
//! This crate sits between a travel/search application and several paid
//! external providers (web search, points of interest, video, translation,
//! generative language). Every provider call goes through a cache-aside
//! guard, every access is cost-logged asynchronously, and point-of-interest
//! records are enriched with generated narrative content in the background
//! without blocking callers or duplicating expensive work.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`query`] | Bare-query expansion against a fixed bilingual gazetteer |
//! | [`cache`] | Cache key derivation and the fail-open result cache |
//! | [`cost`] | Buffered access logging, pricing, and usage aggregates |
//! | [`providers`] | Typed interfaces to the paid upstream providers |
//! | [`enrich`] | Background enrichment: single-flight generation per entity/language |
//! | [`gateway`] | The exposed surface tying the pieces together |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tourgate::{Gateway, GatewayConfig, SearchKind, SearchParams};
//! # use tourgate::cache::MemoryCache;
//! # use tourgate::cost::MemoryLogStore;
//! # use tourgate::enrich::MemoryEnrichmentStore;
//! # async fn demo(web: Arc<dyn tourgate::providers::WebSearchProvider>,
//! #               places: Arc<dyn tourgate::providers::PlaceProvider>,
//! #               videos: Arc<dyn tourgate::providers::VideoProvider>,
//! #               translator: Arc<dyn tourgate::providers::TranslationProvider>,
//! #               generative: Arc<dyn tourgate::providers::GenerativeProvider>)
//! #               -> tourgate::Result<()> {
//! let gateway = Gateway::builder(GatewayConfig::default())
//!     .with_cache_backend(Box::new(MemoryCache::new(10_000)))
//!     .with_log_store(Arc::new(MemoryLogStore::new()))
//!     .with_enrichment_store(Arc::new(MemoryEnrichmentStore::new()))
//!     .with_web_search(web)
//!     .with_places(places)
//!     .with_videos(videos)
//!     .with_translator(translator)
//!     .with_generative(generative)
//!     .build()?;
//!
//! let params = SearchParams::new("เชียงใหม่");
//! let (page, provenance) = gateway.search(SearchKind::Web, &params, None).await?;
//! # let _ = (page, provenance);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod cost;
pub mod enrich;
pub mod error;
pub mod gateway;
pub mod providers;
pub mod query;

// Re-export main types for convenience
pub use cache::{CacheKey, ResourceKind, TtlPolicy};
pub use config::GatewayConfig;
pub use cost::{AccessLogEntry, AccessSource, CostSchedule, TimeWindow, UsageSummary};
pub use enrich::{EnrichmentRecord, EnrichmentStatus, EntitySnapshot};
pub use error::Error;
pub use gateway::{
    AiSearchSummary, Gateway, GatewayBuilder, Provenance, SearchKind, SearchPage, SearchParams,
};
pub use providers::{ChatMessage, ChatRole};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
