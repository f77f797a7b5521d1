//! Bounded per-event worker pool.
//!
//! Each accepted delivery becomes one spawned task. A semaphore caps how many
//! of those run at once; tasks beyond the cap wait for a permit instead of
//! being rejected, so submission itself never blocks the HTTP handler.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Default cap on concurrently running event workers.
pub const DEFAULT_MAX_CONCURRENT_EVENTS: usize = 32;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    /// Creates a pool running at most `max_concurrent` jobs at once (minimum 1).
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Spawns `job`; it starts once a permit is free.
    pub fn submit<F>(&self, job: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            // The semaphore is never closed.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            job.await;
        })
    }

    #[cfg(test)]
    fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_EVENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn runs_submitted_jobs() {
        let pool = WorkerPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let counter = Arc::clone(&counter);
                pool.submit(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn caps_concurrent_jobs() {
        let pool = WorkerPool::new(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (second_tx, mut second_rx) = oneshot::channel::<()>();

        let first = pool.submit(async move {
            let _ = release_rx.await;
        });
        let second = pool.submit(async move {
            let _ = second_tx.send(());
        });

        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(second_rx.try_recv().is_err());
        assert_eq!(pool.available(), 0);

        release_tx.send(()).unwrap();
        first.await.unwrap();
        second.await.unwrap();
        assert!(second_rx.try_recv().is_ok());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(WorkerPool::new(0).available(), 1);
    }
}
