//! The job queue and its worker loop.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::job::{EnrichmentJob, JobKind};
use crate::rate::TokenBucket;

/// Error type job handlers may return; the queue only logs it and drives
/// retry bookkeeping.
pub type JobError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer side of a queue: one per job kind.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn process(&self, job: &EnrichmentJob) -> Result<(), JobError>;
}

/// Snapshot of queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

struct QueuedJob {
    job: EnrichmentJob,
    priority: i32,
    seq: u64,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, FIFO within a priority.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Durable-enough, prioritized queue of enrichment jobs.
///
/// Constructed explicitly and shared by `Arc`; the dispatcher enqueues,
/// `concurrency` worker tasks consume. Failed jobs are re-enqueued with
/// exponential backoff until `max_attempts` is exhausted, at which point
/// they are dropped and counted as failed (affected records carry their
/// own FAILED state, so nothing is lost silently).
pub struct JobQueue {
    kind: JobKind,
    config: QueueConfig,
    heap: Mutex<BinaryHeap<QueuedJob>>,
    notify: Notify,
    seq: AtomicU64,
    limiter: TokenBucket,
    shutdown_token: CancellationToken,
    is_running: AtomicBool,
    waiting: AtomicUsize,
    active: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl JobQueue {
    pub fn new(kind: JobKind, config: QueueConfig) -> Arc<Self> {
        let limiter = TokenBucket::new(config.rate_limit_per_sec);
        Arc::new(Self {
            kind,
            config,
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            seq: AtomicU64::new(0),
            limiter,
            shutdown_token: CancellationToken::new(),
            is_running: AtomicBool::new(false),
            waiting: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        })
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Enqueue a job at default priority.
    pub async fn enqueue(&self, job: EnrichmentJob) -> Result<(), QueueError> {
        self.enqueue_with_priority(job, 0).await
    }

    /// Enqueue a job; higher priority runs first.
    pub async fn enqueue_with_priority(
        &self,
        job: EnrichmentJob,
        priority: i32,
    ) -> Result<(), QueueError> {
        if self.shutdown_token.is_cancelled() {
            return Err(QueueError::ShuttingDown);
        }
        debug!(
            kind = %self.kind,
            job_id = %job.id,
            emails = job.email_ids.len(),
            attempts = job.attempts,
            "Enqueueing job"
        );
        let seq = self.seq.fetch_add(1, AtomicOrdering::SeqCst);
        self.heap.lock().await.push(QueuedJob { job, priority, seq });
        self.waiting.fetch_add(1, AtomicOrdering::SeqCst);
        self.notify.notify_one();
        Ok(())
    }

    /// Start the worker tasks.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::AlreadyRunning` if already started.
    pub fn start(
        self: &Arc<Self>,
        handler: Arc<dyn JobHandler>,
    ) -> Result<Vec<JoinHandle<()>>, QueueError> {
        if self.is_running.swap(true, AtomicOrdering::SeqCst) {
            return Err(QueueError::AlreadyRunning);
        }
        let handles = (0..self.config.concurrency.max(1))
            .map(|worker| {
                let queue = Arc::clone(self);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    queue.worker_loop(worker, handler).await;
                })
            })
            .collect();
        info!(
            kind = %self.kind,
            concurrency = self.config.concurrency,
            "Queue workers started"
        );
        Ok(handles)
    }

    /// Signal workers to stop after their current batch.
    pub fn shutdown(&self) {
        info!(kind = %self.kind, "Queue shutting down");
        self.shutdown_token.cancel();
        // Wake any worker parked on an empty heap
        self.notify.notify_waiters();
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(AtomicOrdering::SeqCst) && !self.shutdown_token.is_cancelled()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            waiting: self.waiting.load(AtomicOrdering::SeqCst),
            active: self.active.load(AtomicOrdering::SeqCst),
            completed: self.completed.load(AtomicOrdering::SeqCst),
            failed: self.failed.load(AtomicOrdering::SeqCst),
        }
    }

    async fn next_job(&self) -> Option<QueuedJob> {
        loop {
            if self.shutdown_token.is_cancelled() {
                return None;
            }
            if let Some(queued) = self.heap.lock().await.pop() {
                self.waiting.fetch_sub(1, AtomicOrdering::SeqCst);
                return Some(queued);
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = self.shutdown_token.cancelled() => return None,
            }
        }
    }

    async fn worker_loop(self: Arc<Self>, worker: usize, handler: Arc<dyn JobHandler>) {
        debug!(kind = %self.kind, worker, "Worker loop started");
        while let Some(queued) = self.next_job().await {
            self.limiter.acquire().await;
            self.active.fetch_add(1, AtomicOrdering::SeqCst);

            let mut job = queued.job;
            job.attempts += 1;
            let start = std::time::Instant::now();
            match handler.process(&job).await {
                Ok(()) => {
                    self.completed.fetch_add(1, AtomicOrdering::SeqCst);
                    info!(
                        kind = %self.kind,
                        job_id = %job.id,
                        attempt = job.attempts,
                        duration_ms = start.elapsed().as_millis(),
                        "Job completed"
                    );
                }
                Err(e) => {
                    if job.attempts < self.config.max_attempts {
                        let delay = self.config.backoff_delay(job.attempts);
                        warn!(
                            kind = %self.kind,
                            job_id = %job.id,
                            attempt = job.attempts,
                            retry_in_ms = delay.as_millis(),
                            error = %e,
                            "Job failed, scheduling retry"
                        );
                        let queue = Arc::clone(&self);
                        let priority = queued.priority;
                        tokio::spawn(async move {
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => {
                                    if let Err(e) = queue.enqueue_with_priority(job, priority).await {
                                        warn!(kind = %queue.kind, error = %e, "Dropping retry");
                                    }
                                }
                                _ = queue.shutdown_token.cancelled() => {}
                            }
                        });
                    } else {
                        self.failed.fetch_add(1, AtomicOrdering::SeqCst);
                        error!(
                            kind = %self.kind,
                            job_id = %job.id,
                            attempts = job.attempts,
                            error = %e,
                            "Job failed permanently"
                        );
                    }
                }
            }
            self.active.fetch_sub(1, AtomicOrdering::SeqCst);
        }
        debug!(kind = %self.kind, worker, "Worker loop stopped");
    }
}
