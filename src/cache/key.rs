//! Cache key derivation.
//!
//! Keys are `namespace:hex-digest` strings built from an ordered parameter
//! tuple per resource kind. Optional parameters are substituted with their
//! defaults *before* hashing, so semantically identical requests never
//! scatter across keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Resource kinds with distinct key namespaces, TTLs, and costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    WebSearch,
    ImageSearch,
    VideoSearch,
    VideoDetails,
    PlaceText,
    PlaceDetails,
    NearbyPlaces,
    Translation,
    DetectLanguage,
    AiSearch,
}

impl ResourceKind {
    /// Key namespace prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            ResourceKind::WebSearch => "search",
            ResourceKind::ImageSearch => "search:image",
            ResourceKind::VideoSearch => "youtube",
            ResourceKind::VideoDetails => "youtube:details",
            ResourceKind::PlaceText => "place:text",
            ResourceKind::PlaceDetails => "place:details",
            ResourceKind::NearbyPlaces => "places:nearby",
            ResourceKind::Translation => "translate",
            ResourceKind::DetectLanguage => "detect",
            ResourceKind::AiSearch => "search:ai",
        }
    }
}

/// A derived, namespaced cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ResourceKind,
    value: String,
}

impl CacheKey {
    fn new(kind: ResourceKind, canonical: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher.finalize().iter().map(|b| format!("{b:02x}")).collect();
        Self {
            kind,
            value: format!("{}:{}", kind.prefix(), hash),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Derives cache keys from typed parameter tuples.
///
/// Parameter order is fixed per kind and documented on each method; the
/// default language is substituted for an omitted one before hashing.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    default_language: String,
}

impl KeyDeriver {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
        }
    }

    fn lang<'a>(&'a self, lang: &'a str) -> &'a str {
        if lang.is_empty() {
            &self.default_language
        } else {
            lang
        }
    }

    /// Web search: `query:page`.
    pub fn web_search(&self, query: &str, page: u32) -> CacheKey {
        CacheKey::new(ResourceKind::WebSearch, &format!("{query}:{page}"))
    }

    /// Image search: `query:page`.
    pub fn image_search(&self, query: &str, page: u32) -> CacheKey {
        CacheKey::new(ResourceKind::ImageSearch, &format!("{query}:{page}"))
    }

    /// Video search: `query:limit`.
    pub fn video_search(&self, query: &str, limit: u32) -> CacheKey {
        CacheKey::new(ResourceKind::VideoSearch, &format!("{query}:{limit}"))
    }

    /// Video details: `video_ids` joined with `,` in caller order.
    pub fn video_details(&self, video_ids: &[String]) -> CacheKey {
        CacheKey::new(ResourceKind::VideoDetails, &video_ids.join(","))
    }

    /// Place text search: `query:language`.
    pub fn place_text(&self, query: &str, language: &str) -> CacheKey {
        CacheKey::new(
            ResourceKind::PlaceText,
            &format!("{query}:{}", self.lang(language)),
        )
    }

    /// Place details: `place_id:language`.
    pub fn place_details(&self, place_id: &str, language: &str) -> CacheKey {
        CacheKey::new(
            ResourceKind::PlaceDetails,
            &format!("{place_id}:{}", self.lang(language)),
        )
    }

    /// Nearby places: `lat:lng:radius:category:keyword:language`, with
    /// coordinates fixed to six decimals so float formatting stays stable.
    #[allow(clippy::too_many_arguments)]
    pub fn nearby_places(
        &self,
        lat: f64,
        lng: f64,
        radius_m: u32,
        category: &str,
        keyword: &str,
        language: &str,
    ) -> CacheKey {
        CacheKey::new(
            ResourceKind::NearbyPlaces,
            &format!(
                "{lat:.6}:{lng:.6}:{radius_m}:{category}:{keyword}:{}",
                self.lang(language)
            ),
        )
    }

    /// Translation: `text:source:target`.
    pub fn translation(&self, text: &str, source: &str, target: &str) -> CacheKey {
        CacheKey::new(ResourceKind::Translation, &format!("{text}:{source}:{target}"))
    }

    /// Language detection: `text`.
    pub fn detect_language(&self, text: &str) -> CacheKey {
        CacheKey::new(ResourceKind::DetectLanguage, text)
    }

    /// Generated search summary: `query`.
    pub fn ai_search(&self, query: &str) -> CacheKey {
        CacheKey::new(ResourceKind::AiSearch, query)
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new("th")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let deriver = KeyDeriver::default();
        assert_eq!(
            deriver.web_search("เชียงใหม่", 1),
            deriver.web_search("เชียงใหม่", 1)
        );
        assert_ne!(
            deriver.web_search("เชียงใหม่", 1),
            deriver.web_search("เชียงใหม่", 2)
        );
    }

    #[test]
    fn test_default_language_substituted_before_hashing() {
        let deriver = KeyDeriver::default();
        assert_eq!(
            deriver.place_details("ChIJabc", ""),
            deriver.place_details("ChIJabc", "th")
        );
        assert_ne!(
            deriver.place_details("ChIJabc", "en"),
            deriver.place_details("ChIJabc", "th")
        );
    }

    #[test]
    fn test_namespaced_prefix() {
        let deriver = KeyDeriver::default();
        let key = deriver.translation("สวัสดี", "th", "en");
        assert!(key.as_str().starts_with("translate:"));
        assert_eq!(key.kind(), ResourceKind::Translation);
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let deriver = KeyDeriver::default();
        // Same canonical tuple, different namespace.
        assert_ne!(
            deriver.web_search("q", 1).as_str(),
            deriver.image_search("q", 1).as_str()
        );
    }

    #[test]
    fn test_nearby_float_formatting_stable() {
        let deriver = KeyDeriver::default();
        assert_eq!(
            deriver.nearby_places(18.7883, 98.9853, 1500, "temple", "", ""),
            deriver.nearby_places(18.7883, 98.9853, 1500, "temple", "", "th")
        );
    }
}
