//! Worker that turns claimed records into stored summaries.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use mailflow_provider::{EnrichmentProvider, SummaryInput};
use mailflow_queue::{EnrichmentJob, JobError, JobHandler};
use mailflow_store::{EmailRecordStore, SummaryUpdate};
use mailflow_types::{EnrichmentStatus, SUMMARY_FAILED_SENTINEL};

use crate::error::PipelineError;

/// Urgency written alongside the failure placeholder so failed rows still
/// sort deterministically.
const FAILURE_URGENCY: f32 = 0.5;

pub struct SummaryWorker {
    store: Arc<dyn EmailRecordStore>,
    provider: Arc<dyn EnrichmentProvider>,
}

impl SummaryWorker {
    pub fn new(
        store: Arc<dyn EmailRecordStore>,
        provider: Arc<dyn EnrichmentProvider>,
    ) -> Self {
        Self { store, provider }
    }

    fn failure_update(id: String) -> SummaryUpdate {
        SummaryUpdate {
            id,
            summary: SUMMARY_FAILED_SENTINEL.to_string(),
            urgency_score: FAILURE_URGENCY,
            status: EnrichmentStatus::Failed,
        }
    }

    /// Claim the job's records, summarize them in one provider call, and
    /// write results back atomically. Records absent from the provider's
    /// result map get the failure placeholder; a whole-call failure writes
    /// the placeholder for every claimed row and propagates.
    async fn process_batch(&self, job: &EnrichmentJob) -> Result<(), PipelineError> {
        let claimed = self
            .store
            .claim_for_summary(&job.user_id, &job.email_ids)
            .await?;
        if claimed.is_empty() {
            debug!(job_id = %job.id, "No records left to summarize");
            return Ok(());
        }

        let inputs: Vec<SummaryInput> = claimed
            .iter()
            .map(|r| SummaryInput {
                id: r.id.clone(),
                subject: r.subject.clone(),
                body: r.snippet.clone().unwrap_or_default(),
            })
            .collect();

        let mut results = match self.provider.summarize_batch(&inputs).await {
            Ok(results) => results,
            Err(e) => {
                error!(job_id = %job.id, claimed = claimed.len(), error = %e, "Summary call failed");
                let updates = claimed
                    .iter()
                    .map(|r| Self::failure_update(r.id.clone()))
                    .collect();
                self.store.batch_update_summaries(updates).await?;
                return Err(e.into());
            }
        };

        let mut completed = 0usize;
        let mut failed = 0usize;
        let updates: Vec<SummaryUpdate> = claimed
            .iter()
            .map(|record| match results.remove(&record.id) {
                Some(output) => {
                    completed += 1;
                    SummaryUpdate {
                        id: record.id.clone(),
                        summary: output.summary,
                        urgency_score: output.urgency_score.clamp(0.0, 1.0),
                        status: EnrichmentStatus::Completed,
                    }
                }
                None => {
                    failed += 1;
                    warn!(record_id = %record.id, "Provider returned no summary");
                    Self::failure_update(record.id.clone())
                }
            })
            .collect();
        self.store.batch_update_summaries(updates).await?;

        info!(
            job_id = %job.id,
            user_id = %job.user_id,
            completed,
            failed,
            "Summary batch written"
        );
        Ok(())
    }
}

#[async_trait]
impl JobHandler for SummaryWorker {
    async fn process(&self, job: &EnrichmentJob) -> Result<(), JobError> {
        self.process_batch(job).await.map_err(JobError::from)
    }
}
