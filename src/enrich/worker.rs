//! Bounded pool for fire-and-forget background tasks.

use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Runs fire-and-forget tasks with a concurrency bound.
///
/// `submit` returns immediately; the task waits for a permit inside its own
/// spawn, so at most `max_concurrent` tasks run at once while submission
/// never blocks the request path. Handles are tracked so outstanding work
/// can be drained at shutdown instead of leaking.
pub struct TaskPool {
    permits: Arc<Semaphore>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskPool {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Submit a task. Never blocks; the task queues on the pool's permits.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let handle = tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            task.await;
        });
        let mut handles = self.handles.lock().unwrap();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Tasks submitted and not yet finished.
    pub fn outstanding(&self) -> usize {
        let mut handles = self.handles.lock().unwrap();
        handles.retain(|h| !h.is_finished());
        handles.len()
    }

    /// Await every outstanding task. Tasks submitted while draining are
    /// picked up by the next round.
    pub async fn drain(&self) {
        loop {
            let drained: Vec<JoinHandle<()>> = {
                let mut handles = self.handles.lock().unwrap();
                handles.drain(..).collect()
            };
            if drained.is_empty() {
                break;
            }
            for handle in drained {
                let _ = handle.await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrency_bound_respected() {
        let pool = TaskPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }

        pool.drain().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_drain_waits_for_completion() {
        let pool = TaskPool::new(4);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let done = Arc::clone(&done);
            pool.submit(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 4);
    }
}
