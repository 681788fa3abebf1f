//! Enrichment record storage.

use super::record::EnrichmentRecord;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// Durable store for enrichment records, keyed by (entity_id, language).
///
/// `upsert` replaces any existing record for the pair: the most recently
/// completed generation wins. `get` only returns non-expired records.
#[async_trait]
pub trait EnrichmentStore: Send + Sync {
    async fn get(&self, entity_id: &str, language: &str) -> Result<Option<EnrichmentRecord>>;
    async fn upsert(&self, record: EnrichmentRecord) -> Result<()>;
    /// Physically remove records that expired before `before`; returns the
    /// number removed.
    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64>;
}

/// In-memory [`EnrichmentStore`] for tests and single-process deployments.
pub struct MemoryEnrichmentStore {
    records: RwLock<HashMap<(String, String), EnrichmentRecord>>,
}

impl MemoryEnrichmentStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryEnrichmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrichmentStore for MemoryEnrichmentStore {
    async fn get(&self, entity_id: &str, language: &str) -> Result<Option<EnrichmentRecord>> {
        let records = self.records.read().unwrap();
        Ok(records
            .get(&(entity_id.to_string(), language.to_string()))
            .filter(|r| !r.is_expired(Utc::now()))
            .cloned())
    }

    async fn upsert(&self, record: EnrichmentRecord) -> Result<()> {
        let key = (record.entity_id.clone(), record.language.clone());
        self.records.write().unwrap().insert(key, record);
        Ok(())
    }

    async fn purge_expired(&self, before: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.write().unwrap();
        let original = records.len();
        records.retain(|_, r| r.expires_at > before);
        Ok((original - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entity: &str, language: &str, expires_in_secs: i64) -> EnrichmentRecord {
        let now = Utc::now();
        EnrichmentRecord {
            entity_id: entity.into(),
            entity_name: "Wat Test".into(),
            language: language.into(),
            summary: "summary".into(),
            history: String::new(),
            highlights: vec![],
            best_time_to_visit: String::new(),
            tips: vec![],
            quick_facts: vec![],
            talking_points: vec![],
            faq: vec![],
            related_media: vec![],
            generated_at: now,
            expires_at: now + chrono::Duration::seconds(expires_in_secs),
        }
    }

    #[tokio::test]
    async fn test_unique_per_entity_and_language() {
        let store = MemoryEnrichmentStore::new();
        store.upsert(record("p1", "th", 3600)).await.unwrap();
        store.upsert(record("p1", "en", 3600)).await.unwrap();
        assert_eq!(store.len(), 2);

        // Upsert replaces, the latest generation wins.
        let mut updated = record("p1", "th", 3600);
        updated.summary = "regenerated".into();
        store.upsert(updated).await.unwrap();
        assert_eq!(store.len(), 2);
        let got = store.get("p1", "th").await.unwrap().unwrap();
        assert_eq!(got.summary, "regenerated");
    }

    #[tokio::test]
    async fn test_expired_record_reads_as_absent() {
        let store = MemoryEnrichmentStore::new();
        store.upsert(record("p1", "th", -10)).await.unwrap();
        assert!(store.get("p1", "th").await.unwrap().is_none());
        // Still physically present until purged.
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge_expired(Utc::now()).await.unwrap(), 1);
        assert!(store.is_empty());
    }
}
