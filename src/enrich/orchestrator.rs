//! Per-(entity, language) cache-then-generate orchestration.

use super::extract::tolerant_parse;
use super::guard::GenerationGuard;
use super::record::{EnrichmentRecord, EntitySnapshot, Faq, MediaItem};
use super::store::EnrichmentStore;
use super::worker::TaskPool;
use super::EnrichmentStatus;
use crate::config::GenerationConfig;
use crate::cost::{AccessLogEntry, CostRecorder};
use crate::providers::{with_retry, ChatMessage, GenerativeProvider, VideoProvider};
use crate::{Error, Result};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Orchestrator knobs, mapped from [`crate::GatewayConfig`].
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub default_language: String,
    /// Forward expiry applied to generated records.
    pub record_ttl: Duration,
    /// Concurrency bound of the generation pool.
    pub max_tasks: usize,
    pub generation: GenerationConfig,
    /// Estimated cost of one generative call.
    pub generative_cost: f64,
    /// Estimated cost of one related-media search.
    pub media_search_cost: f64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            default_language: "th".into(),
            record_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            max_tasks: 4,
            generation: GenerationConfig::default(),
            generative_cost: 0.002,
            media_search_cost: 0.0001,
        }
    }
}

/// Drives the ABSENT → GENERATING → READY state machine for each
/// (entity, language) pair.
///
/// Requests never wait on generation: an absent pair claims the guard,
/// submits one background task, and answers "pending" immediately;
/// concurrent requests for the same pair see the guard and also answer
/// "pending" without spawning a second task. The guard set lives on this
/// instance, so orchestrators do not interfere with each other.
pub struct Orchestrator {
    store: Arc<dyn EnrichmentStore>,
    generative: Arc<dyn GenerativeProvider>,
    videos: Option<Arc<dyn VideoProvider>>,
    recorder: Arc<CostRecorder>,
    guard: Arc<GenerationGuard>,
    pool: TaskPool,
    settings: EnrichmentSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn EnrichmentStore>,
        generative: Arc<dyn GenerativeProvider>,
        videos: Option<Arc<dyn VideoProvider>>,
        recorder: Arc<CostRecorder>,
        settings: EnrichmentSettings,
    ) -> Self {
        Self {
            store,
            generative,
            videos,
            recorder,
            guard: Arc::new(GenerationGuard::new()),
            pool: TaskPool::new(settings.max_tasks),
            settings,
        }
    }

    /// Resolve the enrichment state for one (entity, language) pair,
    /// starting a background generation when the pair is absent and the
    /// caller asked for it. Returns without waiting in every case.
    pub async fn get_enrichment(
        &self,
        snapshot: &EntitySnapshot,
        language: &str,
        include_generation: bool,
        user_id: Option<Uuid>,
    ) -> Result<EnrichmentStatus> {
        let language = if language.is_empty() {
            self.settings.default_language.clone()
        } else {
            language.to_string()
        };

        match self.store.get(&snapshot.entity_id, &language).await {
            Ok(Some(record)) if !record.is_expired(Utc::now()) => {
                self.recorder.record(AccessLogEntry::store_hit(
                    self.generative.name(),
                    "enrichment",
                    user_id,
                ));
                return Ok(EnrichmentStatus::Ready(record));
            }
            Ok(_) => {}
            Err(err) => {
                // Read trouble means the pair looks absent; a fresh
                // generation can still repopulate the store.
                tracing::warn!(
                    entity_id = %snapshot.entity_id,
                    language = %language,
                    error = %err,
                    "enrichment store read failed"
                );
            }
        }

        if !include_generation {
            return Ok(EnrichmentStatus::Unavailable);
        }

        if !self.guard.begin(&snapshot.entity_id, &language) {
            return Ok(EnrichmentStatus::Pending);
        }

        let task = GenerationTask {
            store: Arc::clone(&self.store),
            generative: Arc::clone(&self.generative),
            videos: self.videos.clone(),
            recorder: Arc::clone(&self.recorder),
            guard: Arc::clone(&self.guard),
            settings: self.settings.clone(),
            snapshot: snapshot.clone(),
            language,
        };
        self.pool.submit(async move { task.run().await });
        Ok(EnrichmentStatus::Pending)
    }

    /// Physically remove records that expired before `before`.
    pub async fn purge_expired(&self, before: chrono::DateTime<Utc>) -> Result<u64> {
        self.store.purge_expired(before).await
    }

    /// Await outstanding generation tasks (shutdown path).
    pub async fn drain(&self) {
        self.pool.drain().await;
    }

    pub fn generating(&self) -> usize {
        self.guard.len()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NarrativeDraft {
    summary: String,
    #[serde(default)]
    history: String,
    #[serde(default)]
    highlights: Vec<String>,
    #[serde(default)]
    best_time_to_visit: String,
    #[serde(default)]
    tips: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GuideDraft {
    quick_facts: Vec<String>,
    talking_points: Vec<String>,
    common_questions: Vec<Faq>,
}

/// One background generation: mandatory narrative, best-effort guide facts
/// and related media. Everything it needs is owned, because it outlives the
/// request that spawned it.
struct GenerationTask {
    store: Arc<dyn EnrichmentStore>,
    generative: Arc<dyn GenerativeProvider>,
    videos: Option<Arc<dyn VideoProvider>>,
    recorder: Arc<CostRecorder>,
    guard: Arc<GenerationGuard>,
    settings: EnrichmentSettings,
    snapshot: EntitySnapshot,
    language: String,
}

impl GenerationTask {
    async fn run(self) {
        // Released on every exit path, so a failed generation leaves the
        // pair absent and retryable rather than stuck generating.
        let _release = self.guard.deferred(&self.snapshot.entity_id, &self.language);

        tracing::info!(
            entity_id = %self.snapshot.entity_id,
            language = %self.language,
            "enrichment generation started"
        );

        let narrative = match self.narrative().await {
            Ok(narrative) => narrative,
            Err(err) => {
                tracing::warn!(
                    entity_id = %self.snapshot.entity_id,
                    language = %self.language,
                    error = %err,
                    "enrichment generation failed, nothing persisted"
                );
                return;
            }
        };

        // Secondary content: worth having, not worth failing over.
        let (guide, media) = futures::join!(self.guide_info(), self.related_media());
        let guide = guide.unwrap_or_else(|err| {
            tracing::warn!(
                entity_id = %self.snapshot.entity_id,
                error = %err,
                "guide facts unavailable, omitting"
            );
            GuideDraft::default()
        });
        let media = media.unwrap_or_else(|err| {
            tracing::warn!(
                entity_id = %self.snapshot.entity_id,
                error = %err,
                "related media unavailable, omitting"
            );
            Vec::new()
        });

        let now = Utc::now();
        let expires_at = now
            + chrono::Duration::from_std(self.settings.record_ttl)
                .unwrap_or_else(|_| chrono::Duration::days(30));
        let record = EnrichmentRecord {
            entity_id: self.snapshot.entity_id.clone(),
            entity_name: self.snapshot.name.clone(),
            language: self.language.clone(),
            summary: narrative.summary,
            history: narrative.history,
            highlights: narrative.highlights,
            best_time_to_visit: narrative.best_time_to_visit,
            tips: narrative.tips,
            quick_facts: guide.quick_facts,
            talking_points: guide.talking_points,
            faq: guide.common_questions,
            related_media: media,
            generated_at: now,
            expires_at,
        };

        if let Err(err) = self.store.upsert(record).await {
            tracing::warn!(
                entity_id = %self.snapshot.entity_id,
                language = %self.language,
                error = %err,
                "failed to persist enrichment record"
            );
        } else {
            tracing::info!(
                entity_id = %self.snapshot.entity_id,
                language = %self.language,
                "enrichment generation completed"
            );
        }
    }

    /// The mandatory primary call; failure aborts the task.
    async fn narrative(&self) -> Result<NarrativeDraft> {
        let (system, prompt) = narrative_prompt(&self.snapshot, &self.language);
        let text = self
            .complete("narrative", &system, &prompt, self.settings.generation.narrative_max_tokens)
            .await?;
        tolerant_parse::<NarrativeDraft>(&text).ok_or_else(|| Error::GenerationFailed {
            entity_id: self.snapshot.entity_id.clone(),
            language: self.language.clone(),
            message: "no parsable narrative payload in model output".into(),
        })
    }

    async fn guide_info(&self) -> Result<GuideDraft> {
        let (system, prompt) = guide_prompt(&self.snapshot, &self.language);
        let text = self
            .complete("guide", &system, &prompt, self.settings.generation.guide_max_tokens)
            .await?;
        // Unparsable secondary output degrades to empty sections.
        Ok(tolerant_parse::<GuideDraft>(&text).unwrap_or_default())
    }

    async fn related_media(&self) -> Result<Vec<MediaItem>> {
        let Some(videos) = &self.videos else {
            return Ok(Vec::new());
        };
        let query = if self.language == "en" {
            format!("{} travel", self.snapshot.name)
        } else {
            format!("{} ท่องเที่ยว", self.snapshot.name)
        };
        let limit = self.settings.generation.related_media_limit;

        let started = Instant::now();
        let search = with_retry(|| async {
            match tokio::time::timeout(
                self.settings.generation.call_timeout,
                videos.search_videos(&query, limit),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::timed_out(videos.name(), "video_search")),
            }
        })
        .await;
        self.recorder.record(match &search {
            Ok(_) => AccessLogEntry::provider(
                videos.name(),
                "video_search",
                serde_json::json!({ "query": query, "limit": limit }),
                self.settings.media_search_cost,
                started.elapsed(),
                None,
            ),
            Err(err) => AccessLogEntry::provider_failure(
                videos.name(),
                "video_search",
                serde_json::json!({ "query": query, "limit": limit }),
                self.settings.media_search_cost,
                started.elapsed(),
                None,
                err.to_string(),
            ),
        });
        let page = search?;

        // Playback metadata is a nice-to-have on top of a nice-to-have.
        let ids: Vec<String> = page.items.iter().map(|v| v.video_id.clone()).collect();
        let details = if ids.is_empty() {
            Vec::new()
        } else {
            videos.video_details(&ids).await.unwrap_or_default()
        };

        Ok(page
            .items
            .into_iter()
            .map(|item| {
                let extra = details.iter().find(|d| d.video_id == item.video_id);
                MediaItem {
                    media_id: item.video_id,
                    title: item.title,
                    thumbnail_url: item.thumbnail_url,
                    channel_title: item.channel_title,
                    duration: extra.map(|d| d.duration.clone()),
                    view_count: extra.map(|d| d.view_count),
                }
            })
            .collect())
    }

    /// One bounded, cost-logged generative call.
    async fn complete(
        &self,
        endpoint: &str,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];
        let started = Instant::now();
        let outcome = with_retry(|| async {
            match tokio::time::timeout(
                self.settings.generation.call_timeout,
                self.generative.complete(
                    &messages,
                    max_tokens,
                    self.settings.generation.temperature,
                ),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(Error::timed_out(self.generative.name(), endpoint)),
            }
        })
        .await;

        let params = serde_json::json!({
            "entity_id": self.snapshot.entity_id,
            "language": self.language,
        });
        self.recorder.record(match &outcome {
            Ok(_) => AccessLogEntry::provider(
                self.generative.name(),
                endpoint,
                params,
                self.settings.generative_cost,
                started.elapsed(),
                None,
            ),
            Err(err) => AccessLogEntry::provider_failure(
                self.generative.name(),
                endpoint,
                params,
                self.settings.generative_cost,
                started.elapsed(),
                None,
                err.to_string(),
            ),
        });
        outcome
    }
}

fn entity_facts(snapshot: &EntitySnapshot, thai: bool) -> String {
    if thai {
        format!(
            "ชื่อสถานที่: {}\nที่ตั้ง: {}\nประเภท: {}\nคะแนน: {:.1} ({} รีวิว)\nพิกัด: {:.6}, {:.6}",
            snapshot.name,
            snapshot.address,
            snapshot.categories.join(", "),
            snapshot.rating,
            snapshot.review_count,
            snapshot.lat,
            snapshot.lng,
        )
    } else {
        format!(
            "Place name: {}\nLocation: {}\nTypes: {}\nRating: {:.1} ({} reviews)\nCoordinates: {:.6}, {:.6}",
            snapshot.name,
            snapshot.address,
            snapshot.categories.join(", "),
            snapshot.rating,
            snapshot.review_count,
            snapshot.lat,
            snapshot.lng,
        )
    }
}

fn narrative_prompt(snapshot: &EntitySnapshot, language: &str) -> (String, String) {
    if language == "en" {
        let system = "You are an expert tour guide specializing in Thai tourism with over \
20 years of experience. You have deep knowledge of history, culture, and tourist attractions \
throughout Thailand. Provide accurate, detailed, and useful information for tour guiding."
            .to_string();
        let prompt = format!(
            "Create detailed visitor information about this place:\n\n{}\n\n\
Respond in JSON with this exact shape:\n\
{{\n\
    \"summary\": \"What this place is, its significance, and why tourists should visit (5-7 sentences)\",\n\
    \"history\": \"Historical background: founding, key events, evolution (2-3 paragraphs)\",\n\
    \"highlights\": [\"5 highlights, each with a short explanation\"],\n\
    \"bestTimeToVisit\": \"Best season and time of day, with reasons (2-3 sentences)\",\n\
    \"tips\": [\"6 practical tips: preparation, dress code, photo spots, food nearby, transport, costs\"]\n\
}}\n\n\
Rules: respond in English only; if unsure about a fact, say \"Please verify this information\"; \
respond with JSON only, no other text.",
            entity_facts(snapshot, false)
        );
        (system, prompt)
    } else {
        let system = "คุณเป็นมัคคุเทศก์ผู้เชี่ยวชาญด้านการท่องเที่ยวไทยที่มีประสบการณ์มากกว่า 20 ปี \
คุณมีความรู้ลึกซึ้งเกี่ยวกับประวัติศาสตร์ วัฒนธรรม และสถานที่ท่องเที่ยวทั่วประเทศไทย \
ให้ข้อมูลที่ถูกต้อง ละเอียด และเป็นประโยชน์สำหรับการนำเที่ยว"
            .to_string();
        let prompt = format!(
            "กรุณาสร้างข้อมูลที่ละเอียดและมีประโยชน์เกี่ยวกับสถานที่นี้:\n\n{}\n\n\
ตอบเป็น JSON ตามโครงสร้างนี้:\n\
{{\n\
    \"summary\": \"ภาพรวมของสถานที่ ความสำคัญ และเหตุผลที่ควรมาเยี่ยมชม (5-7 ประโยค)\",\n\
    \"history\": \"ประวัติความเป็นมา ปีที่ก่อตั้ง เหตุการณ์สำคัญ (2-3 ย่อหน้า)\",\n\
    \"highlights\": [\"จุดเด่น 5 ข้อ พร้อมคำอธิบายสั้นๆ\"],\n\
    \"bestTimeToVisit\": \"เวลาที่เหมาะสมในการเยี่ยมชม พร้อมเหตุผล (2-3 ประโยค)\",\n\
    \"tips\": [\"เคล็ดลับ 6 ข้อ: การเตรียมตัว การแต่งกาย จุดถ่ายรูป ร้านอาหาร การเดินทาง ค่าใช้จ่าย\"]\n\
}}\n\n\
กฎสำคัญ: ตอบเป็นภาษาไทยเท่านั้น ข้อมูลต้องถูกต้อง ถ้าไม่แน่ใจให้ระบุว่า \"ควรตรวจสอบข้อมูลเพิ่มเติม\" \
ตอบเฉพาะ JSON เท่านั้น ไม่ต้องมีข้อความอื่น",
            entity_facts(snapshot, true)
        );
        (system, prompt)
    }
}

fn guide_prompt(snapshot: &EntitySnapshot, language: &str) -> (String, String) {
    if language == "en" {
        let system = "You are an expert tour guide with over 20 years of experience. You know \
how to tell engaging stories and understand common tourist questions. Provide detailed and \
genuinely useful information."
            .to_string();
        let prompt = format!(
            "Create guiding material for tourists at:\n\n{}\n\n\
Respond in JSON with this exact shape:\n\
{{\n\
    \"quickFacts\": [\"5 facts: statistics, records, things visitors rarely know\"],\n\
    \"talkingPoints\": [\"5 stories or legends worth telling, each 2-3 sentences\"],\n\
    \"commonQuestions\": [{{\"question\": \"...\", \"answer\": \"detailed answer, 3-4 sentences\"}}]\n\
}}\n\n\
Rules: respond in English only; answers must be detailed enough to use with real tourists; \
respond with JSON only, no other text.",
            entity_facts(snapshot, false)
        );
        (system, prompt)
    } else {
        let system = "คุณเป็นมัคคุเทศก์ผู้เชี่ยวชาญที่มีประสบการณ์นำเที่ยวมากกว่า 20 ปี \
คุณรู้วิธีเล่าเรื่องให้น่าสนใจและรู้คำถามที่นักท่องเที่ยวมักถาม ให้ข้อมูลที่ละเอียดและเป็นประโยชน์จริง"
            .to_string();
        let prompt = format!(
            "กรุณาสร้างข้อมูลสำหรับการนำเที่ยวที่:\n\n{}\n\n\
ตอบเป็น JSON ตามโครงสร้างนี้:\n\
{{\n\
    \"quickFacts\": [\"ข้อเท็จจริง 5 ข้อ: สถิติ ความพิเศษ สิ่งที่นักท่องเที่ยวมักไม่รู้\"],\n\
    \"talkingPoints\": [\"เรื่องเล่าหรือตำนาน 5 เรื่อง เรื่องละ 2-3 ประโยค\"],\n\
    \"commonQuestions\": [{{\"question\": \"...\", \"answer\": \"คำตอบละเอียด 3-4 ประโยค\"}}]\n\
}}\n\n\
กฎสำคัญ: ตอบเป็นภาษาไทยเท่านั้น คำตอบต้องละเอียดพอที่จะใช้ตอบนักท่องเที่ยวจริง \
ตอบเฉพาะ JSON เท่านั้น ไม่ต้องมีข้อความอื่น",
            entity_facts(snapshot, true)
        );
        (system, prompt)
    }
}
