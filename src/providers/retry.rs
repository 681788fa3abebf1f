//! Single-retry policy for provider calls.

use crate::Result;
use std::future::Future;

/// Run a provider call, retrying exactly once on a transient error.
///
/// Permanent errors surface immediately; a second transient failure is
/// surfaced as-is. At most two attempts, no backoff: the caller is a
/// user-facing request path.
pub async fn with_retry<T, F, Fut>(op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match op().await {
        Err(err) if err.is_transient() => {
            tracing::debug!(error = %err, "transient provider error, retrying once");
            op().await
        }
        outcome => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_transient_retried_once() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32> = with_retry(|| async {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::transient("search", "web_search", "503"))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_not_retried() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32> = with_retry(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::permanent("search", "web_search", "invalid key"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_two_transients_surface_failure() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32> = with_retry(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::transient("search", "web_search", "503"))
        })
        .await;
        assert!(matches!(result, Err(Error::TransientProvider { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
