//! Per-call cost estimates.
//!
//! Provider prices change; the schedule is injected configuration rather
//! than constants baked into call sites. Defaults reflect published list
//! prices in USD per call (translation is per character).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSchedule {
    pub web_search: f64,
    pub image_search: f64,
    pub place_text_search: f64,
    pub place_nearby_search: f64,
    pub place_details: f64,
    pub video_search: f64,
    pub video_details: f64,
    pub translate_per_char: f64,
    pub detect_language: f64,
    pub generative_call: f64,
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self {
            // ~$5 per 1000 queries
            web_search: 0.005,
            image_search: 0.005,
            // $32 per 1000 requests
            place_text_search: 0.032,
            place_nearby_search: 0.032,
            // contact + atmosphere field tiers
            place_details: 0.008,
            // quota based
            video_search: 0.0001,
            video_details: 0.0001,
            // $20 per 1M characters
            translate_per_char: 0.00002,
            detect_language: 0.00002,
            // ~$2 per 1000 tokens, averaged per call
            generative_call: 0.002,
        }
    }
}

impl CostSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimated cost of translating `chars` characters.
    pub fn translation(&self, chars: usize) -> f64 {
        self.translate_per_char * chars as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_scales_with_length() {
        let schedule = CostSchedule::default();
        assert!(schedule.translation(1_000_000) > schedule.translation(10));
        assert!((schedule.translation(1_000_000) - 20.0).abs() < 1e-9);
    }
}
