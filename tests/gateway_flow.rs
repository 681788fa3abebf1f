//! End-to-end gateway scenarios against stub providers.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tourgate::cache::MemoryCache;
use tourgate::cost::{MemoryLogStore, RecorderConfig};
use tourgate::enrich::MemoryEnrichmentStore;
use tourgate::providers::*;
use tourgate::{
    AccessSource, ChatMessage, Error, Gateway, GatewayConfig, Result, SearchKind, SearchParams,
    TimeWindow, TtlPolicy,
};

#[derive(Default)]
struct CallCounts {
    web: AtomicUsize,
    images: AtomicUsize,
    videos: AtomicUsize,
    details: AtomicUsize,
    translate: AtomicUsize,
    generative: AtomicUsize,
}

struct StubProviders {
    counts: Arc<CallCounts>,
    web_fails: usize,
}

impl StubProviders {
    fn new(counts: Arc<CallCounts>) -> Self {
        Self {
            counts,
            web_fails: 0,
        }
    }
}

#[async_trait]
impl WebSearchProvider for StubProviders {
    async fn search_web(&self, query: &str, _page: u32, _page_size: u32) -> Result<WebPage> {
        let n = self.counts.web.fetch_add(1, Ordering::SeqCst);
        if n < self.web_fails {
            return Err(Error::transient("search", "web_search", "503 upstream"));
        }
        Ok(WebPage {
            items: vec![WebItem {
                title: format!("result for {query}"),
                url: "https://example.com".into(),
                snippet: "snippet".into(),
                display_link: "example.com".into(),
            }],
            total: 1,
        })
    }
    async fn search_images(&self, _query: &str, _page: u32, _page_size: u32) -> Result<ImagePage> {
        self.counts.images.fetch_add(1, Ordering::SeqCst);
        Ok(ImagePage { items: vec![] })
    }
    fn name(&self) -> &str {
        "search"
    }
}

#[async_trait]
impl PlaceProvider for StubProviders {
    async fn text_search(&self, _query: &str, _language: &str) -> Result<PlacePage> {
        Ok(PlacePage { items: vec![] })
    }
    async fn nearby_search(&self, _query: &NearbyQuery) -> Result<PlacePage> {
        Ok(PlacePage { items: vec![] })
    }
    async fn details(&self, place_id: &str, _language: &str) -> Result<PlaceDetails> {
        self.counts.details.fetch_add(1, Ordering::SeqCst);
        Ok(PlaceDetails {
            place_id: place_id.into(),
            name: "Wat Phra Singh".into(),
            formatted_address: "Chiang Mai, Thailand".into(),
            lat: 18.7883,
            lng: 98.9813,
            rating: 4.7,
            review_count: 12000,
            price_level: None,
            categories: vec!["temple".into()],
            phone: None,
            website: None,
            maps_url: None,
            opening_hours: vec![],
            photos: vec![],
        })
    }
    fn name(&self) -> &str {
        "places"
    }
}

#[async_trait]
impl VideoProvider for StubProviders {
    async fn search_videos(&self, _query: &str, _limit: u32) -> Result<VideoPage> {
        self.counts.videos.fetch_add(1, Ordering::SeqCst);
        Ok(VideoPage { items: vec![] })
    }
    async fn video_details(&self, _video_ids: &[String]) -> Result<Vec<VideoDetails>> {
        Ok(vec![])
    }
    fn name(&self) -> &str {
        "video"
    }
}

#[async_trait]
impl TranslationProvider for StubProviders {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<Translation> {
        self.counts.translate.fetch_add(1, Ordering::SeqCst);
        Ok(Translation {
            translated_text: format!("[en] {text}"),
            detected_source: Some("th".into()),
        })
    }
    async fn detect_language(&self, _text: &str) -> Result<DetectedLanguage> {
        Ok(DetectedLanguage {
            language: "th".into(),
            confidence: 0.98,
        })
    }
    fn name(&self) -> &str {
        "translate"
    }
}

#[async_trait]
impl GenerativeProvider for StubProviders {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _max_tokens: u32,
        _temperature: f64,
    ) -> Result<String> {
        self.counts.generative.fetch_add(1, Ordering::SeqCst);
        // Narrative and guide prompts are distinguished by their schema.
        if messages[1].content.contains("quickFacts") {
            Ok(r#"{"quickFacts": ["fact"], "talkingPoints": [], "commonQuestions": []}"#.into())
        } else {
            Ok(r#"Sure! {"summary": "An important Lanna temple.", "history": "Built in 1345.",
                 "highlights": ["Lion Buddha"], "bestTimeToVisit": "Morning.", "tips": ["go early"]}"#
                .into())
        }
    }
    fn name(&self) -> &str {
        "genai"
    }
}

struct Harness {
    gateway: Gateway,
    counts: Arc<CallCounts>,
    log_store: Arc<MemoryLogStore>,
}

fn harness_with(config: GatewayConfig, web_fails: usize) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let counts = Arc::new(CallCounts::default());
    let providers = Arc::new(StubProviders {
        web_fails,
        ..StubProviders::new(Arc::clone(&counts))
    });
    let log_store = Arc::new(MemoryLogStore::new());
    let gateway = Gateway::builder(config)
        .with_cache_backend(Box::new(MemoryCache::new(1024)))
        .with_log_store(log_store.clone())
        .with_enrichment_store(Arc::new(MemoryEnrichmentStore::new()))
        .with_web_search(providers.clone())
        .with_places(providers.clone())
        .with_videos(providers.clone())
        .with_translator(providers.clone())
        .with_generative(providers)
        .build()
        .expect("gateway builds");
    Harness {
        gateway,
        counts,
        log_store,
    }
}

fn harness() -> Harness {
    harness_with(GatewayConfig::default(), 0)
}

#[tokio::test]
async fn repeated_search_pays_once() {
    let h = harness();
    let params = SearchParams::new("เชียงใหม่");

    let (_, first) = h.gateway.search(SearchKind::Web, &params, None).await.unwrap();
    let (_, second) = h.gateway.search(SearchKind::Web, &params, None).await.unwrap();

    assert_eq!(h.counts.web.load(Ordering::SeqCst), 1);
    assert_eq!(first.source, AccessSource::Provider);
    assert!(first.estimated_cost > 0.0);
    assert_eq!(second.source, AccessSource::Cache);
    assert_eq!(second.estimated_cost, 0.0);
    assert_eq!(first.cache_key, second.cache_key);

    // Both accesses were logged; the hit at zero cost.
    h.gateway.flush_access_logs().await;
    let entries = h.log_store.entries();
    assert_eq!(entries.len(), 2);
    let hit = entries
        .iter()
        .find(|e| e.source == AccessSource::Cache)
        .expect("cache hit logged");
    assert_eq!(hit.estimated_cost, 0.0);
    assert!(hit.cache_key.is_some());
}

#[tokio::test]
async fn equivalent_queries_share_one_key() {
    let h = harness();
    // A bare province and its pre-expanded form normalize identically.
    let bare = SearchParams::new("เชียงใหม่");
    let expanded = SearchParams::new("เชียงใหม่ สถานที่ท่องเที่ยว");

    h.gateway.search(SearchKind::Web, &bare, None).await.unwrap();
    h.gateway.search(SearchKind::Web, &expanded, None).await.unwrap();

    assert_eq!(h.counts.web.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_provider_error_is_retried_once() {
    let h = harness_with(GatewayConfig::default(), 1);
    let params = SearchParams::new("krabi beaches");

    let (page, provenance) = h.gateway.search_web(&params, None).await.unwrap();
    assert_eq!(h.counts.web.load(Ordering::SeqCst), 2);
    assert_eq!(provenance.source, AccessSource::Provider);
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn two_transient_failures_surface_and_are_logged() {
    let h = harness_with(GatewayConfig::default(), 2);
    let params = SearchParams::new("krabi beaches");

    let err = h.gateway.search_web(&params, None).await.unwrap_err();
    assert!(matches!(err, Error::TransientProvider { .. }));

    h.gateway.flush_access_logs().await;
    let entries = h.log_store.entries();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].success);
    assert!(entries[0].error_message.is_some());
}

#[tokio::test]
async fn zero_ttl_kind_is_never_cached() {
    let mut ttl = TtlPolicy::default();
    ttl.web_search = Duration::ZERO;
    let h = harness_with(GatewayConfig::default().with_ttl(ttl), 0);
    let params = SearchParams::new("phuket nightlife");

    h.gateway.search_web(&params, None).await.unwrap();
    h.gateway.search_web(&params, None).await.unwrap();
    assert_eq!(h.counts.web.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn translation_uses_long_ttl_cache() {
    let h = harness();
    h.gateway.translate("สวัสดี", "th", "en", None).await.unwrap();
    let (translation, provenance) = h.gateway.translate("สวัสดี", "th", "en", None).await.unwrap();

    assert_eq!(h.counts.translate.load(Ordering::SeqCst), 1);
    assert_eq!(provenance.source, AccessSource::Cache);
    assert_eq!(translation.translated_text, "[en] สวัสดี");
}

#[tokio::test]
async fn ai_search_caches_summary_and_sources_as_one_unit() {
    let h = harness();

    let (first, provenance) = h.gateway.ai_search("น่าน", "th", None).await.unwrap();
    assert_eq!(provenance.source, AccessSource::Provider);
    assert_eq!(h.counts.web.load(Ordering::SeqCst), 1);
    assert_eq!(h.counts.generative.load(Ordering::SeqCst), 1);
    assert_eq!(first.sources.len(), 1);

    let (second, provenance) = h.gateway.ai_search("น่าน", "th", None).await.unwrap();
    assert_eq!(provenance.source, AccessSource::Cache);
    assert_eq!(second.summary, first.summary);
    // Neither the search nor the generative provider was paid again.
    assert_eq!(h.counts.web.load(Ordering::SeqCst), 1);
    assert_eq!(h.counts.generative.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_enrichment_requests_spawn_one_generation() {
    let h = harness();

    let (a, b) = tokio::join!(
        h.gateway.get_enrichment("place123", "en", true, None),
        h.gateway.get_enrichment("place123", "en", true, None),
    );
    assert!(a.unwrap().is_pending());
    assert!(b.unwrap().is_pending());

    h.gateway.shutdown().await;

    // One task: narrative + guide.
    assert_eq!(h.counts.generative.load(Ordering::SeqCst), 2);

    let status = h
        .gateway
        .get_enrichment("place123", "en", true, None)
        .await
        .unwrap();
    match status {
        tourgate::EnrichmentStatus::Ready(record) => {
            assert_eq!(record.summary, "An important Lanna temple.");
            assert_eq!(record.language, "en");
        }
        other => panic!("expected ready, got {}", other.as_str()),
    }
}

#[tokio::test]
async fn enrichment_without_generation_is_unavailable() {
    let h = harness();
    let status = h
        .gateway
        .get_enrichment("place123", "en", false, None)
        .await
        .unwrap();
    assert_eq!(status, tourgate::EnrichmentStatus::Unavailable);
    assert_eq!(h.counts.generative.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn usage_summary_reports_costs_and_savings() {
    let config = GatewayConfig::default()
        .with_recorder(RecorderConfig::new().with_max_buffer(1000));
    let h = harness_with(config, 0);
    let params = SearchParams::new("เลย");

    h.gateway.search_web(&params, None).await.unwrap();
    h.gateway.search_web(&params, None).await.unwrap();
    h.gateway.flush_access_logs().await;

    let summary = h
        .gateway
        .usage_summary(&TimeWindow::last_days(1))
        .await
        .unwrap();
    assert_eq!(summary.total_requests, 2);
    assert_eq!(summary.provider_requests, 1);
    assert_eq!(summary.cache_hits, 1);
    assert!((summary.cache_hit_rate - 50.0).abs() < 1e-9);
    assert!((summary.total_cost - 0.005).abs() < 1e-9);
    assert!((summary.cost_saved - 0.0025).abs() < 1e-9);
    assert_eq!(summary.service_costs.len(), 1);
    assert_eq!(summary.service_costs[0].service_name, "search");
}

#[tokio::test]
async fn buffered_records_become_exactly_n_rows() {
    let h = harness();
    let deriver = |i: u32| SearchParams::new(format!("query {i}"));
    for i in 0..7 {
        h.gateway.search_web(&deriver(i), None).await.unwrap();
    }
    assert!(h.log_store.len() < 7);
    h.gateway.flush_access_logs().await;
    assert_eq!(h.log_store.len(), 7);
}

#[tokio::test]
async fn place_lookups_and_detection_share_the_cache_aside_flow() {
    let h = harness();

    let (_, first) = h
        .gateway
        .place_text_search("วัดพระสิงห์", "", None)
        .await
        .unwrap();
    // An omitted language and the default are the same key.
    let (_, second) = h
        .gateway
        .place_text_search("วัดพระสิงห์", "th", None)
        .await
        .unwrap();
    assert_eq!(first.source, AccessSource::Provider);
    assert_eq!(second.source, AccessSource::Cache);

    let nearby = NearbyQuery {
        lat: 18.7883,
        lng: 98.9813,
        radius_m: 1500,
        category: Some("temple".into()),
        keyword: None,
        language: None,
    };
    let (_, first) = h.gateway.nearby_places(&nearby, None).await.unwrap();
    let (_, second) = h.gateway.nearby_places(&nearby, None).await.unwrap();
    assert_eq!(first.source, AccessSource::Provider);
    assert_eq!(second.source, AccessSource::Cache);

    let (detected, _) = h.gateway.detect_language("สวัสดีครับ", None).await.unwrap();
    assert_eq!(detected.language, "th");
}

#[tokio::test]
async fn prune_access_logs_enforces_retention() {
    let h = harness();
    h.gateway
        .search_web(&SearchParams::new("หาดใหญ่ ตลาด"), None)
        .await
        .unwrap();
    h.gateway.flush_access_logs().await;
    assert_eq!(h.log_store.len(), 1);

    let removed = h
        .gateway
        .prune_access_logs(chrono::Utc::now() + chrono::Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(h.log_store.len(), 0);
}

#[tokio::test]
async fn purge_expired_counts_reaped_records() {
    let h = harness();
    h.gateway
        .get_enrichment("place123", "th", true, None)
        .await
        .unwrap();
    h.gateway.shutdown().await;

    // Nothing has expired yet.
    assert_eq!(h.gateway.purge_expired(chrono::Utc::now()).await.unwrap(), 0);
    // Everything expires before a far-future instant.
    let far_future = chrono::Utc::now() + chrono::Duration::days(365);
    assert_eq!(h.gateway.purge_expired(far_future).await.unwrap(), 1);
}
