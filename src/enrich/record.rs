//! Enrichment record types.

use crate::providers::PlaceDetails;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A frequently asked question with its answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// A related media item (video) attached to an enrichment record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub media_id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub channel_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
}

/// Generated narrative content for one entity in one language.
///
/// Unique per (entity_id, language); upserted by the generation task and
/// logically absent once `expires_at` has passed. Expired rows are only
/// physically removed by the periodic purge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub entity_id: String,
    pub entity_name: String,
    pub language: String,
    pub summary: String,
    pub history: String,
    pub highlights: Vec<String>,
    pub best_time_to_visit: String,
    pub tips: Vec<String>,
    pub quick_facts: Vec<String>,
    pub talking_points: Vec<String>,
    pub faq: Vec<Faq>,
    pub related_media: Vec<MediaItem>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EnrichmentRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// The entity facts a generation prompt is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: String,
    pub name: String,
    pub address: String,
    pub categories: Vec<String>,
    pub rating: f64,
    pub review_count: u32,
    pub lat: f64,
    pub lng: f64,
}

impl EntitySnapshot {
    pub fn from_details(details: &PlaceDetails) -> Self {
        Self {
            entity_id: details.place_id.clone(),
            name: details.name.clone(),
            address: details.formatted_address.clone(),
            categories: details.categories.clone(),
            rating: details.rating,
            review_count: details.review_count,
            lat: details.lat,
            lng: details.lng,
        }
    }
}
