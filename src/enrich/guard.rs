//! In-flight generation tracking.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Tracks which (entity_id, language) pairs have a generation in flight.
///
/// Owned by the orchestrator instance, never global, so independent
/// orchestrators (e.g. under test) cannot interfere. The set is guarded by
/// one mutex held only for the check-and-set or removal: no I/O happens
/// under the lock. An entry implies exactly one active generation task for
/// that pair within this process.
#[derive(Default)]
pub struct GenerationGuard {
    inflight: Mutex<HashSet<(String, String)>>,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the pair. Returns `false` when a generation is
    /// already in flight, in which case the caller must not start another.
    pub fn begin(&self, entity_id: &str, language: &str) -> bool {
        self.inflight
            .lock()
            .unwrap()
            .insert((entity_id.to_string(), language.to_string()))
    }

    /// Release the pair, making it eligible for a future generation.
    pub fn release(&self, entity_id: &str, language: &str) {
        self.inflight
            .lock()
            .unwrap()
            .remove(&(entity_id.to_string(), language.to_string()));
    }

    pub fn is_generating(&self, entity_id: &str, language: &str) -> bool {
        self.inflight
            .lock()
            .unwrap()
            .contains(&(entity_id.to_string(), language.to_string()))
    }

    pub fn len(&self) -> usize {
        self.inflight.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A handle that releases the pair when dropped. The generation task
    /// holds one so the pair is released on every exit path, panic and
    /// early return included.
    pub fn deferred(self: &Arc<Self>, entity_id: &str, language: &str) -> ReleaseHandle {
        ReleaseHandle {
            guard: Arc::clone(self),
            entity_id: entity_id.to_string(),
            language: language.to_string(),
        }
    }
}

/// Releases a claimed pair on drop.
pub struct ReleaseHandle {
    guard: Arc<GenerationGuard>,
    entity_id: String,
    language: String,
}

impl Drop for ReleaseHandle {
    fn drop(&mut self) {
        self.guard.release(&self.entity_id, &self.language);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_check_and_set() {
        let guard = GenerationGuard::new();
        assert!(guard.begin("p1", "th"));
        assert!(!guard.begin("p1", "th"));
        // Languages transition independently.
        assert!(guard.begin("p1", "en"));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn test_release_allows_retry() {
        let guard = GenerationGuard::new();
        assert!(guard.begin("p1", "th"));
        guard.release("p1", "th");
        assert!(guard.begin("p1", "th"));
    }

    #[test]
    fn test_deferred_release_on_drop() {
        let guard = Arc::new(GenerationGuard::new());
        assert!(guard.begin("p1", "th"));
        {
            let _handle = guard.deferred("p1", "th");
            assert!(guard.is_generating("p1", "th"));
        }
        assert!(!guard.is_generating("p1", "th"));
    }
}
