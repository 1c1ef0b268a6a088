//! Bounded worker pools with distinct backpressure policies
//!
//! Two pools with deliberately different overflow behavior:
//!
//! - [`CachePool`] rejects submissions outright when its queue is full
//!   (abort policy); the caller is responsible for still delivering a
//!   failure to whoever is waiting, typically on the unbounded
//!   `tokio::spawn` fallback path.
//! - [`RevalidationPool`] discards the oldest queued task to make room
//!   (discard-oldest policy); background revalidation is best-effort and
//!   explicitly allowed to drop work under sustained load.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// A unit of work executed by a pool worker
pub type Job = BoxFuture<'static, ()>;

/// Default worker count for the cache pool
const DEFAULT_CACHE_WORKERS: usize = 2;

/// Default queue capacity for the cache pool (small, rejects on overflow)
const DEFAULT_CACHE_QUEUE: usize = 16;

/// Default worker count for the revalidation pool
const DEFAULT_REVALIDATION_WORKERS: usize = 2;

/// Default queue capacity for the revalidation pool (larger, discards oldest)
const DEFAULT_REVALIDATION_QUEUE: usize = 64;

/// Bounded pool for asynchronous cache gets and puts
///
/// Submissions over capacity are returned to the caller (abort policy).
pub struct CachePool {
    sender: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl CachePool {
    /// Create a pool with the default worker count and queue capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_WORKERS, DEFAULT_CACHE_QUEUE)
    }

    /// Create a pool with explicit worker count and queue capacity
    ///
    /// Both values are clamped to at least 1.
    pub fn with_capacity(workers: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>(queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..workers.max(1))
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        match job {
                            Some(job) => job.await,
                            None => {
                                trace!("cache pool worker {index} shutting down");
                                break;
                            }
                        }
                    }
                })
            })
            .collect();

        Self { sender, workers }
    }

    /// Submit a job for execution
    ///
    /// On overflow the job is handed back so the caller can route the
    /// associated failure through its fallback delivery path.
    pub fn try_submit(&self, job: Job) -> Result<(), Job> {
        self.sender.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(job) | mpsc::error::TrySendError::Closed(job) => job,
        })
    }

    /// Stop all workers. Queued jobs that have not started are dropped.
    pub fn shutdown(&mut self) {
        for worker in self.workers.drain(..) {
            worker.abort();
        }
    }
}

impl Default for CachePool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CachePool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct RevalidationQueue {
    jobs: Mutex<VecDeque<Job>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
}

/// Bounded pool for background stale revalidation
///
/// On overflow the oldest queued task is discarded to make room for the
/// new one; no caller is ever waiting on a revalidation, so dropped work
/// is only logged.
pub struct RevalidationPool {
    queue: Arc<RevalidationQueue>,
    workers: Vec<JoinHandle<()>>,
}

impl RevalidationPool {
    /// Create a pool with the default worker count and queue capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REVALIDATION_WORKERS, DEFAULT_REVALIDATION_QUEUE)
    }

    /// Create a pool with explicit worker count and queue capacity
    ///
    /// Both values are clamped to at least 1.
    pub fn with_capacity(workers: usize, queue_capacity: usize) -> Self {
        let queue = Arc::new(RevalidationQueue {
            jobs: Mutex::new(VecDeque::new()),
            capacity: queue_capacity.max(1),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        });

        let workers = (0..workers.max(1))
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    loop {
                        let job = queue.jobs.lock().pop_front();
                        if let Some(job) = job {
                            job.await;
                            continue;
                        }
                        let notified = queue.notify.notified();
                        if !queue.jobs.lock().is_empty() {
                            continue;
                        }
                        notified.await;
                    }
                })
            })
            .collect();

        Self { queue, workers }
    }

    /// Enqueue a revalidation task, discarding the oldest queued task if
    /// the queue is full
    pub fn submit(&self, job: Job) {
        {
            let mut jobs = self.queue.jobs.lock();
            if jobs.len() >= self.queue.capacity {
                jobs.pop_front();
                self.queue.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Revalidation queue full, discarding oldest task");
            }
            jobs.push_back(job);
        }
        self.queue.notify.notify_one();
    }

    /// Number of tasks discarded due to overflow
    pub fn dropped_jobs(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }

    /// Number of tasks currently queued (not yet picked up by a worker)
    pub fn queued_jobs(&self) -> usize {
        self.queue.jobs.lock().len()
    }

    /// Stop all workers. Queued jobs that have not started are dropped.
    pub fn shutdown(&mut self) {
        for worker in self.workers.drain(..) {
            worker.abort();
        }
    }
}

impl Default for RevalidationPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RevalidationPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_cache_pool_runs_jobs() {
        let pool = CachePool::with_capacity(2, 8);
        let (tx, rx) = oneshot::channel();
        pool.try_submit(Box::pin(async move {
            let _ = tx.send(5);
        }))
        .unwrap_or_else(|_| unreachable!("queue has capacity"));
        assert_eq!(rx.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_cache_pool_rejects_on_overflow() {
        // One worker blocked on a gate, queue of one
        let pool = CachePool::with_capacity(1, 1);
        let (gate_tx, gate_rx) = oneshot::channel::<()>();

        pool.try_submit(Box::pin(async move {
            let _ = gate_rx.await;
        }))
        .unwrap_or_else(|_| unreachable!("first job fits"));

        // Give the worker time to pick up the blocking job
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Fills the queue slot
        let second = pool.try_submit(Box::pin(async {}));
        assert!(second.is_ok());

        // Queue full: the job is handed back
        let rejected = pool.try_submit(Box::pin(async {}));
        assert!(rejected.is_err());

        let _ = gate_tx.send(());
    }

    #[tokio::test]
    async fn test_revalidation_pool_discards_oldest() {
        let mut pool = RevalidationPool::with_capacity(1, 2);
        // Freeze the worker so the queue actually fills
        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        pool.submit(Box::pin(async move {
            let _ = gate_rx.await;
        }));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let ran = Arc::new(AtomicUsize::new(0));
        for i in 0..3 {
            let ran = Arc::clone(&ran);
            pool.submit(Box::pin(async move {
                // Record which jobs survived: bit per job index
                ran.fetch_or(1 << i, Ordering::SeqCst);
            }));
        }

        // Capacity 2: job 0 was discarded for job 2
        assert_eq!(pool.dropped_jobs(), 1);

        let _ = gate_tx.send(());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0b110);

        pool.shutdown();
    }

    #[tokio::test]
    async fn test_revalidation_pool_runs_submitted_work() {
        let pool = RevalidationPool::with_capacity(2, 8);
        let (tx, rx) = oneshot::channel();
        pool.submit(Box::pin(async move {
            let _ = tx.send("done");
        }));
        assert_eq!(rx.await.unwrap(), "done");
    }
}
