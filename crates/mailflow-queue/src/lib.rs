//! # mailflow-queue
//!
//! Prioritized, retryable in-process queue for enrichment jobs.
//!
//! A `JobQueue` is an explicitly constructed object handed to the
//! dispatcher and workers at startup; there is no process-wide queue
//! state. Each queue runs a small fixed number of worker tasks, bounds
//! provider load with a token bucket, and re-enqueues failed jobs with
//! exponential backoff up to a bounded attempt count.

mod config;
mod error;
mod job;
mod queue;
mod rate;

pub use config::QueueConfig;
pub use error::QueueError;
pub use job::{EnrichmentJob, JobKind};
pub use queue::{JobError, JobHandler, JobQueue, QueueStats};
pub use rate::TokenBucket;
