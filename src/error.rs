use thiserror::Error;

/// Unified error type for the gateway.
///
/// Provider failures are split into transient (worth one retry) and
/// permanent (surfaced immediately); cache and cost-logging failures are
/// internal-only and never reach callers through the primary path.
#[derive(Debug, Error)]
pub enum Error {
    #[error("transient failure from {service}/{endpoint}: {message}")]
    TransientProvider {
        service: String,
        endpoint: String,
        message: String,
    },

    #[error("provider {service}/{endpoint} rejected the request: {message}")]
    PermanentProvider {
        service: String,
        endpoint: String,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("generation failed for {entity_id} ({language}): {message}")]
    GenerationFailed {
        entity_id: String,
        language: String,
        message: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a transient provider error (eligible for a single retry).
    pub fn transient(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::TransientProvider {
            service: service.into(),
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a permanent provider error (never retried).
    pub fn permanent(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::PermanentProvider {
            service: service.into(),
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Timeouts are classified as transient: the next attempt may succeed.
    pub fn timed_out(service: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Error::transient(service, endpoint, "call timed out")
    }

    /// Whether a single retry is justified for this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientProvider { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::transient("search", "web_search", "503").is_transient());
        assert!(Error::timed_out("search", "web_search").is_transient());
        assert!(!Error::permanent("search", "web_search", "bad key").is_transient());
        assert!(!Error::NotFound("place".into()).is_transient());
    }
}
