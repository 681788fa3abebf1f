//! The exposed gateway surface.
//!
//! Every read goes: normalize query → derive key → probe the result cache →
//! on a miss, one bounded provider call (with a single transient retry) →
//! record the access with its estimated cost → populate the cache with the
//! resource kind's TTL. Cache hits are recorded too, at zero cost, so the
//! usage summary can report how much spend the cache avoided. Enrichment
//! requests are delegated to the background orchestrator and never block.

use crate::cache::{CacheBackend, CacheKey, CacheStats, KeyDeriver, Lookup, MemoryCache, ResultCache};
use crate::config::GatewayConfig;
use crate::cost::{
    AccessLogEntry, AccessSource, CostRecorder, LogStore, MemoryLogStore, TimeWindow, UsageSummary,
};
use crate::enrich::{
    EnrichmentSettings, EnrichmentStatus, EnrichmentStore, EntitySnapshot, MemoryEnrichmentStore,
    Orchestrator,
};
use crate::providers::{
    with_retry, ChatMessage, DetectedLanguage, GenerativeProvider, ImagePage, NearbyQuery,
    PlaceDetails, PlacePage, PlaceProvider, Translation, TranslationProvider, VideoPage,
    VideoProvider, WebItem, WebPage, WebSearchProvider,
};
use crate::query::expand_query;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Search result families exposed through the unified entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Web,
    Image,
    Video,
}

/// Parameters of a unified search request.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
    /// Empty means the configured default language.
    pub language: String,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 1,
            page_size: 10,
            language: String::new(),
        }
    }
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// A typed result page from the unified search entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPage {
    Web(WebPage),
    Image(ImagePage),
    Video(VideoPage),
}

/// Where a response came from and what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub source: AccessSource,
    pub cache_key: String,
    pub estimated_cost: f64,
    pub duration: Duration,
}

impl Provenance {
    fn cached(key: &str) -> Self {
        Self {
            source: AccessSource::Cache,
            cache_key: key.to_string(),
            estimated_cost: 0.0,
            duration: Duration::ZERO,
        }
    }
    fn fresh(key: &str, estimated_cost: f64, duration: Duration) -> Self {
        Self {
            source: AccessSource::Provider,
            cache_key: key.to_string(),
            estimated_cost,
            duration,
        }
    }
}

/// A generated search summary with the sources it was grounded on.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AiSearchSummary {
    pub query: String,
    pub summary: String,
    pub sources: Vec<crate::providers::WebItem>,
}

/// The cost-aware caching and enrichment gateway.
///
/// Owns the result cache, the cost recorder, the provider handles, and the
/// enrichment orchestrator. The only in-process shared mutable state is the
/// recorder's buffer and the orchestrator's guard set, both behind
/// short-held locks.
pub struct Gateway {
    config: GatewayConfig,
    keys: KeyDeriver,
    cache: ResultCache,
    recorder: Arc<CostRecorder>,
    web: Arc<dyn WebSearchProvider>,
    places: Arc<dyn PlaceProvider>,
    videos: Arc<dyn VideoProvider>,
    translator: Arc<dyn TranslationProvider>,
    generative: Arc<dyn GenerativeProvider>,
    orchestrator: Orchestrator,
}

impl Gateway {
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    /// Unified search entry point.
    pub async fn search(
        &self,
        kind: SearchKind,
        params: &SearchParams,
        user_id: Option<Uuid>,
    ) -> Result<(SearchPage, Provenance)> {
        match kind {
            SearchKind::Web => {
                let (page, provenance) = self.search_web(params, user_id).await?;
                Ok((SearchPage::Web(page), provenance))
            }
            SearchKind::Image => {
                let (page, provenance) = self.search_images(params, user_id).await?;
                Ok((SearchPage::Image(page), provenance))
            }
            SearchKind::Video => {
                let (page, provenance) = self.search_videos(params, user_id).await?;
                Ok((SearchPage::Video(page), provenance))
            }
        }
    }

    pub async fn search_web(
        &self,
        params: &SearchParams,
        user_id: Option<Uuid>,
    ) -> Result<(WebPage, Provenance)> {
        let page = params.page.max(1);
        let page_size = if params.page_size == 0 { 10 } else { params.page_size };
        let query = expand_query(&params.query, &params.language);
        let key = self.keys.web_search(&query, page);
        self.fetch_with_cache(
            self.web.name(),
            "web_search",
            key,
            self.config.ttl.web_search,
            self.config.costs.web_search,
            serde_json::json!({ "query": query, "page": page, "page_size": page_size }),
            user_id,
            || {
                let web = Arc::clone(&self.web);
                let query = query.clone();
                async move { web.search_web(&query, page, page_size).await }
            },
        )
        .await
    }

    pub async fn search_images(
        &self,
        params: &SearchParams,
        user_id: Option<Uuid>,
    ) -> Result<(ImagePage, Provenance)> {
        let page = params.page.max(1);
        let page_size = if params.page_size == 0 { 10 } else { params.page_size };
        let query = expand_query(&params.query, "");
        let key = self.keys.image_search(&query, page);
        self.fetch_with_cache(
            self.web.name(),
            "image_search",
            key,
            self.config.ttl.image_search,
            self.config.costs.image_search,
            serde_json::json!({ "query": query, "page": page, "page_size": page_size }),
            user_id,
            || {
                let web = Arc::clone(&self.web);
                let query = query.clone();
                async move { web.search_images(&query, page, page_size).await }
            },
        )
        .await
    }

    pub async fn search_videos(
        &self,
        params: &SearchParams,
        user_id: Option<Uuid>,
    ) -> Result<(VideoPage, Provenance)> {
        let page_size = if params.page_size == 0 { 10 } else { params.page_size };
        let query = expand_query(&params.query, "");
        let key = self.keys.video_search(&query, page_size);
        self.fetch_with_cache(
            self.videos.name(),
            "video_search",
            key,
            self.config.ttl.video_search,
            self.config.costs.video_search,
            serde_json::json!({ "query": query, "limit": page_size }),
            user_id,
            || {
                let videos = Arc::clone(&self.videos);
                let query = query.clone();
                async move { videos.search_videos(&query, page_size).await }
            },
        )
        .await
    }

    pub async fn place_text_search(
        &self,
        query: &str,
        language: &str,
        user_id: Option<Uuid>,
    ) -> Result<(PlacePage, Provenance)> {
        let language = self.resolve_language(language);
        let key = self.keys.place_text(query, &language);
        self.fetch_with_cache(
            self.places.name(),
            "text_search",
            key,
            self.config.ttl.place_text,
            self.config.costs.place_text_search,
            serde_json::json!({ "query": query, "language": language }),
            user_id,
            || {
                let places = Arc::clone(&self.places);
                let query = query.to_string();
                let language = language.clone();
                async move { places.text_search(&query, &language).await }
            },
        )
        .await
    }

    pub async fn nearby_places(
        &self,
        query: &NearbyQuery,
        user_id: Option<Uuid>,
    ) -> Result<(PlacePage, Provenance)> {
        let key = self.keys.nearby_places(
            query.lat,
            query.lng,
            query.radius_m,
            query.category.as_deref().unwrap_or(""),
            query.keyword.as_deref().unwrap_or(""),
            query.language.as_deref().unwrap_or(""),
        );
        self.fetch_with_cache(
            self.places.name(),
            "nearby_search",
            key,
            self.config.ttl.nearby_places,
            self.config.costs.place_nearby_search,
            serde_json::to_value(query)?,
            user_id,
            || {
                let places = Arc::clone(&self.places);
                let query = query.clone();
                async move { places.nearby_search(&query).await }
            },
        )
        .await
    }

    pub async fn place_details(
        &self,
        place_id: &str,
        language: &str,
        user_id: Option<Uuid>,
    ) -> Result<(PlaceDetails, Provenance)> {
        let language = self.resolve_language(language);
        let key = self.keys.place_details(place_id, &language);
        self.fetch_with_cache(
            self.places.name(),
            "place_details",
            key,
            self.config.ttl.place_details,
            self.config.costs.place_details,
            serde_json::json!({ "place_id": place_id, "language": language }),
            user_id,
            || {
                let places = Arc::clone(&self.places);
                let place_id = place_id.to_string();
                let language = language.clone();
                async move { places.details(&place_id, &language).await }
            },
        )
        .await
    }

    pub async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
        user_id: Option<Uuid>,
    ) -> Result<(Translation, Provenance)> {
        let key = self.keys.translation(text, source, target);
        self.fetch_with_cache(
            self.translator.name(),
            "translate",
            key,
            self.config.ttl.translation,
            self.config.costs.translation(text.chars().count()),
            serde_json::json!({ "source": source, "target": target, "chars": text.chars().count() }),
            user_id,
            || {
                let translator = Arc::clone(&self.translator);
                let text = text.to_string();
                let source = source.to_string();
                let target = target.to_string();
                async move { translator.translate(&text, &source, &target).await }
            },
        )
        .await
    }

    pub async fn detect_language(
        &self,
        text: &str,
        user_id: Option<Uuid>,
    ) -> Result<(DetectedLanguage, Provenance)> {
        let key = self.keys.detect_language(text);
        self.fetch_with_cache(
            self.translator.name(),
            "detect_language",
            key,
            self.config.ttl.detect_language,
            self.config.costs.detect_language,
            serde_json::json!({ "chars": text.chars().count() }),
            user_id,
            || {
                let translator = Arc::clone(&self.translator);
                let text = text.to_string();
                async move { translator.detect_language(&text).await }
            },
        )
        .await
    }

    /// A generated summary of the best web results for a query, cached as
    /// one unit because the generative call dominates its cost.
    pub async fn ai_search(
        &self,
        query: &str,
        language: &str,
        user_id: Option<Uuid>,
    ) -> Result<(AiSearchSummary, Provenance)> {
        let language = self.resolve_language(language);
        let key = self.keys.ai_search(query);

        if let Lookup::Hit(value) = self.cache.get::<AiSearchSummary>(&key).await {
            self.recorder.record(AccessLogEntry::cache_hit(
                self.generative.name(),
                "ai_search",
                key.as_str(),
                user_id,
            ));
            return Ok((value, Provenance::cached(key.as_str())));
        }

        let started = Instant::now();

        // Ground the summary on a small page of fresh web results. This is
        // the primary path: either provider failure surfaces to the caller.
        let (page, _) = self
            .search_web(
                &SearchParams::new(query)
                    .with_page_size(5)
                    .with_language(language.clone()),
                user_id,
            )
            .await?;

        let messages = ai_search_messages(query, &page.items, &language);
        let outcome = with_retry(|| async {
            match tokio::time::timeout(
                self.config.provider_timeout,
                self.generative.complete(
                    &messages,
                    self.config.generation.narrative_max_tokens,
                    self.config.generation.temperature,
                ),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::timed_out(self.generative.name(), "ai_search")),
            }
        })
        .await;
        let elapsed = started.elapsed();

        let params = serde_json::json!({ "query": query, "language": language });
        self.recorder.record(match &outcome {
            Ok(_) => AccessLogEntry::provider(
                self.generative.name(),
                "ai_search",
                params,
                self.config.costs.generative_call,
                elapsed,
                user_id,
            ),
            Err(err) => AccessLogEntry::provider_failure(
                self.generative.name(),
                "ai_search",
                params,
                self.config.costs.generative_call,
                elapsed,
                user_id,
                err.to_string(),
            ),
        });

        let summary = AiSearchSummary {
            query: query.to_string(),
            summary: outcome?,
            sources: page.items,
        };
        self.cache.set(&key, &summary, self.config.ttl.ai_search).await;
        Ok((summary, Provenance::fresh(key.as_str(), self.config.costs.generative_call, elapsed)))
    }

    /// Enrichment state for one (entity, language) pair. The entity
    /// snapshot is fetched through the cached details path; generation, if
    /// triggered, runs in the background and this call returns immediately.
    pub async fn get_enrichment(
        &self,
        entity_id: &str,
        language: &str,
        include_generation: bool,
        user_id: Option<Uuid>,
    ) -> Result<EnrichmentStatus> {
        let (details, _) = self.place_details(entity_id, language, user_id).await?;
        let snapshot = EntitySnapshot::from_details(&details);
        self.orchestrator
            .get_enrichment(&snapshot, language, include_generation, user_id)
            .await
    }

    /// Usage aggregates over the window, computed from durable storage.
    pub async fn usage_summary(&self, window: &TimeWindow) -> Result<UsageSummary> {
        self.recorder.usage_summary(window).await
    }

    /// Physically remove enrichment records that expired before `before`.
    pub async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64> {
        self.orchestrator.purge_expired(before).await
    }

    /// Remove access log entries older than `before`.
    pub async fn prune_access_logs(&self, before: DateTime<Utc>) -> Result<u64> {
        self.recorder.prune(before).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Force the recorder's buffer to durable storage.
    pub async fn flush_access_logs(&self) {
        self.recorder.flush().await;
    }

    /// Drain outstanding generation tasks, stop the flush sweep, and write
    /// the final access-log batch.
    pub async fn shutdown(&self) {
        self.orchestrator.drain().await;
        self.recorder.shutdown().await;
    }

    fn resolve_language(&self, language: &str) -> String {
        if language.is_empty() {
            self.config.default_language.clone()
        } else {
            language.to_string()
        }
    }

    /// The cache-aside flow shared by every read path.
    #[allow(clippy::too_many_arguments)]
    async fn fetch_with_cache<T, F, Fut>(
        &self,
        service: &str,
        endpoint: &str,
        key: CacheKey,
        ttl: Duration,
        cost: f64,
        params: serde_json::Value,
        user_id: Option<Uuid>,
        call: F,
    ) -> Result<(T, Provenance)>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Lookup::Hit(value) = self.cache.get::<T>(&key).await {
            tracing::debug!(service, endpoint, key = %key, "cache hit");
            self.recorder
                .record(AccessLogEntry::cache_hit(service, endpoint, key.as_str(), user_id));
            return Ok((value, Provenance::cached(key.as_str())));
        }

        let started = Instant::now();
        let outcome = with_retry(|| async {
            match tokio::time::timeout(self.config.provider_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(Error::timed_out(service, endpoint)),
            }
        })
        .await;
        let elapsed = started.elapsed();

        self.recorder.record(match &outcome {
            Ok(_) => AccessLogEntry::provider(service, endpoint, params, cost, elapsed, user_id),
            Err(err) => AccessLogEntry::provider_failure(
                service,
                endpoint,
                params,
                cost,
                elapsed,
                user_id,
                err.to_string(),
            ),
        });

        match &outcome {
            Ok(_) => tracing::debug!(service, endpoint, elapsed_ms = elapsed.as_millis() as u64, "provider call completed"),
            Err(err) => tracing::warn!(service, endpoint, error = %err, "provider call failed"),
        }

        let value = outcome?;
        self.cache.set(&key, &value, ttl).await;
        Ok((value, Provenance::fresh(key.as_str(), cost, elapsed)))
    }
}

fn ai_search_messages(query: &str, sources: &[WebItem], language: &str) -> Vec<ChatMessage> {
    let mut context = String::new();
    for item in sources {
        context.push_str(&format!("Title: {}\nContent: {}\n", item.title, item.snippet));
    }
    if language == "en" {
        vec![
            ChatMessage::system(
                "You are a travel assistant specializing in Thai tourism. Summarize the \
provided search results into a helpful answer for a traveler. Be accurate and concise; \
answer in English.",
            ),
            ChatMessage::user(format!(
                "Question: {query}\n\nSearch results:\n{context}"
            )),
        ]
    } else {
        vec![
            ChatMessage::system(
                "คุณเป็นผู้ช่วยด้านการท่องเที่ยวไทย สรุปผลการค้นหาที่ให้มาเป็นคำตอบที่เป็นประโยชน์ \
สำหรับนักท่องเที่ยว ให้ข้อมูลที่ถูกต้องและกระชับ ตอบเป็นภาษาไทย",
            ),
            ChatMessage::user(format!(
                "คำถาม: {query}\n\nผลการค้นหา:\n{context}"
            )),
        ]
    }
}

/// Builder for [`Gateway`]. Providers are required; the cache backend and
/// both stores default to the in-memory implementations.
pub struct GatewayBuilder {
    config: GatewayConfig,
    cache_backend: Option<Box<dyn CacheBackend>>,
    log_store: Option<Arc<dyn LogStore>>,
    enrichment_store: Option<Arc<dyn EnrichmentStore>>,
    web: Option<Arc<dyn WebSearchProvider>>,
    places: Option<Arc<dyn PlaceProvider>>,
    videos: Option<Arc<dyn VideoProvider>>,
    translator: Option<Arc<dyn TranslationProvider>>,
    generative: Option<Arc<dyn GenerativeProvider>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            cache_backend: None,
            log_store: None,
            enrichment_store: None,
            web: None,
            places: None,
            videos: None,
            translator: None,
            generative: None,
        }
    }

    pub fn with_cache_backend(mut self, backend: Box<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }
    pub fn with_log_store(mut self, store: Arc<dyn LogStore>) -> Self {
        self.log_store = Some(store);
        self
    }
    pub fn with_enrichment_store(mut self, store: Arc<dyn EnrichmentStore>) -> Self {
        self.enrichment_store = Some(store);
        self
    }
    pub fn with_web_search(mut self, provider: Arc<dyn WebSearchProvider>) -> Self {
        self.web = Some(provider);
        self
    }
    pub fn with_places(mut self, provider: Arc<dyn PlaceProvider>) -> Self {
        self.places = Some(provider);
        self
    }
    pub fn with_videos(mut self, provider: Arc<dyn VideoProvider>) -> Self {
        self.videos = Some(provider);
        self
    }
    pub fn with_translator(mut self, provider: Arc<dyn TranslationProvider>) -> Self {
        self.translator = Some(provider);
        self
    }
    pub fn with_generative(mut self, provider: Arc<dyn GenerativeProvider>) -> Self {
        self.generative = Some(provider);
        self
    }

    /// Build the gateway. Must run inside a Tokio runtime: the recorder's
    /// flush sweep is spawned here.
    pub fn build(self) -> Result<Gateway> {
        let web = self
            .web
            .ok_or_else(|| Error::Configuration("web search provider is required".into()))?;
        let places = self
            .places
            .ok_or_else(|| Error::Configuration("place provider is required".into()))?;
        let videos = self
            .videos
            .ok_or_else(|| Error::Configuration("video provider is required".into()))?;
        let translator = self
            .translator
            .ok_or_else(|| Error::Configuration("translation provider is required".into()))?;
        let generative = self
            .generative
            .ok_or_else(|| Error::Configuration("generative provider is required".into()))?;

        let config = self.config;
        let backend = self
            .cache_backend
            .unwrap_or_else(|| Box::new(MemoryCache::new(10_000)));
        let log_store = self
            .log_store
            .unwrap_or_else(|| Arc::new(MemoryLogStore::new()));
        let enrichment_store = self
            .enrichment_store
            .unwrap_or_else(|| Arc::new(MemoryEnrichmentStore::new()));

        let recorder = CostRecorder::new(log_store, config.recorder.clone());
        let cache = ResultCache::new(config.cache.clone(), backend);
        let settings = EnrichmentSettings {
            default_language: config.default_language.clone(),
            record_ttl: config.enrichment_ttl,
            max_tasks: config.max_generation_tasks,
            generation: config.generation.clone(),
            generative_cost: config.costs.generative_call,
            media_search_cost: config.costs.video_search,
        };
        let orchestrator = Orchestrator::new(
            enrichment_store,
            Arc::clone(&generative),
            Some(Arc::clone(&videos)),
            Arc::clone(&recorder),
            settings,
        );

        Ok(Gateway {
            keys: KeyDeriver::new(config.default_language.clone()),
            config,
            cache,
            recorder,
            web,
            places,
            videos,
            translator,
            generative,
            orchestrator,
        })
    }
}
