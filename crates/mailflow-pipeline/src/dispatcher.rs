//! Fans pending enrichment work out onto the job queues.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mailflow_queue::{EnrichmentJob, JobKind, JobQueue};
use mailflow_types::EmailWorkflowRecord;

use crate::error::PipelineError;

/// Emails per embedding job. Summaries go out as a single batch because
/// the provider answers them in one structured call.
pub const EMBEDDING_BATCH_SIZE: usize = 10;

/// What a dispatch call enqueued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub embedding_candidates: usize,
    pub embedding_jobs: usize,
    pub summary_candidates: usize,
    pub summary_jobs: usize,
}

/// Scans a set of records for missing enrichment and enqueues jobs.
///
/// Dispatch is advisory: workers re-check eligibility with an atomic
/// claim, so double-dispatching the same record is harmless.
pub struct EnrichmentDispatcher {
    embedding_queue: Arc<JobQueue>,
    summary_queue: Arc<JobQueue>,
    batch_size: usize,
}

impl EnrichmentDispatcher {
    pub fn new(embedding_queue: Arc<JobQueue>, summary_queue: Arc<JobQueue>) -> Self {
        Self {
            embedding_queue,
            summary_queue,
            batch_size: EMBEDDING_BATCH_SIZE,
        }
    }

    #[cfg(test)]
    fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Enqueue embedding and summary jobs for every record in `records`
    /// that still needs them.
    pub async fn dispatch(
        &self,
        user_id: &str,
        records: &[EmailWorkflowRecord],
    ) -> Result<DispatchOutcome, PipelineError> {
        let mut outcome = DispatchOutcome::default();

        let embedding_ids: Vec<String> = records
            .iter()
            .filter(|r| r.needs_embedding())
            .map(|r| r.provider_message_id.clone())
            .collect();
        outcome.embedding_candidates = embedding_ids.len();
        for chunk in embedding_ids.chunks(self.batch_size) {
            self.embedding_queue
                .enqueue(EnrichmentJob::new(
                    JobKind::Embedding,
                    user_id,
                    chunk.to_vec(),
                ))
                .await?;
            outcome.embedding_jobs += 1;
        }

        let summary_ids: Vec<String> = records
            .iter()
            .filter(|r| r.needs_summary())
            .map(|r| r.provider_message_id.clone())
            .collect();
        outcome.summary_candidates = summary_ids.len();
        if !summary_ids.is_empty() {
            self.summary_queue
                .enqueue(EnrichmentJob::new(JobKind::Summary, user_id, summary_ids))
                .await?;
            outcome.summary_jobs = 1;
        }

        if outcome.embedding_jobs > 0 || outcome.summary_jobs > 0 {
            info!(
                user_id,
                embedding_jobs = outcome.embedding_jobs,
                embedding_candidates = outcome.embedding_candidates,
                summary_jobs = outcome.summary_jobs,
                summary_candidates = outcome.summary_candidates,
                "Dispatched enrichment jobs"
            );
        } else {
            debug!(user_id, records = records.len(), "Nothing to dispatch");
        }
        Ok(outcome)
    }
}
