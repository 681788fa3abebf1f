//! Background enrichment of point-of-interest records.
//!
//! For each (entity, language) pair the orchestrator runs a small state
//! machine: a non-expired stored record is served as-is (READY); an absent
//! record triggers exactly one background generation task (single-flight)
//! while every concurrent caller gets a "pending" answer immediately; the
//! request path never waits on generation. The generation task composes a
//! mandatory narrative call with optional secondary calls whose failure
//! degrades to omission rather than aborting the task.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Orchestrator`] | Per-(entity, language) cache-then-generate flow |
//! | [`EnrichmentRecord`] | Generated narrative content with forward expiry |
//! | [`EnrichmentStore`] | Upsert-by-composite-key durable store |
//! | [`GenerationGuard`] | In-flight set ensuring at most one generation per pair |
//! | [`TaskPool`] | Bounded pool for fire-and-forget generation tasks |
//! | [`extract`] | Tolerant extraction of JSON from free-form model output |

pub mod extract;
mod guard;
mod orchestrator;
mod record;
mod store;
mod worker;

pub use guard::GenerationGuard;
pub use orchestrator::{EnrichmentSettings, Orchestrator};
pub use record::{EnrichmentRecord, EntitySnapshot, Faq, MediaItem};
pub use store::{EnrichmentStore, MemoryEnrichmentStore};
pub use worker::TaskPool;

/// Outcome of an enrichment request.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentStatus {
    /// A non-expired record exists; no generation was triggered.
    Ready(EnrichmentRecord),
    /// Generation is running (started by this call or an earlier one).
    Pending,
    /// No record exists and generation was not requested.
    Unavailable,
}

impl EnrichmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentStatus::Ready(_) => "ready",
            EnrichmentStatus::Pending => "pending",
            EnrichmentStatus::Unavailable => "unavailable",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, EnrichmentStatus::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EnrichmentStatus::Pending)
    }
}
