//! Typed interfaces to the paid upstream providers.
//!
//! Transport is an implementation concern left to the application: each
//! provider is an async trait returning typed payloads or a classified
//! error ([`crate::Error::TransientProvider`] for failures worth one retry,
//! [`crate::Error::PermanentProvider`] for everything else). Payloads are
//! serde-serializable so the result cache can round-trip them.

mod retry;
mod types;

pub use retry::with_retry;
pub use types::{
    DetectedLanguage, ImageItem, ImagePage, NearbyQuery, PlaceDetails, PlacePage, PlaceSummary,
    Translation, VideoDetails, VideoItem, VideoPage, WebItem, WebPage,
};

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message role for the generative-language provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a generative-language request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Paid web/image search provider.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search_web(&self, query: &str, page: u32, page_size: u32) -> Result<WebPage>;
    async fn search_images(&self, query: &str, page: u32, page_size: u32) -> Result<ImagePage>;
    /// Service name used in access logs.
    fn name(&self) -> &str;
}

/// Paid points-of-interest provider.
#[async_trait]
pub trait PlaceProvider: Send + Sync {
    async fn text_search(&self, query: &str, language: &str) -> Result<PlacePage>;
    async fn nearby_search(&self, query: &NearbyQuery) -> Result<PlacePage>;
    async fn details(&self, place_id: &str, language: &str) -> Result<PlaceDetails>;
    fn name(&self) -> &str;
}

/// Paid video search provider.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn search_videos(&self, query: &str, limit: u32) -> Result<VideoPage>;
    async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoDetails>>;
    fn name(&self) -> &str;
}

/// Paid translation provider.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation>;
    async fn detect_language(&self, text: &str) -> Result<DetectedLanguage>;
    fn name(&self) -> &str;
}

/// Generative-language provider: role-tagged messages in, free-form text
/// out. The returned text may wrap structured data in extra prose: see
/// [`crate::enrich`] for the tolerant extraction contract.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String>;
    fn name(&self) -> &str;
}
