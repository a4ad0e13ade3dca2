//! Worker that turns claimed records into stored embeddings.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use mailflow_provider::EnrichmentProvider;
use mailflow_queue::{EnrichmentJob, JobError, JobHandler};
use mailflow_store::{EmailRecordStore, EmbeddingUpdate};
use mailflow_types::EnrichmentStatus;

use crate::error::PipelineError;

pub struct EmbeddingWorker {
    store: Arc<dyn EmailRecordStore>,
    provider: Arc<dyn EnrichmentProvider>,
}

impl EmbeddingWorker {
    pub fn new(
        store: Arc<dyn EmailRecordStore>,
        provider: Arc<dyn EnrichmentProvider>,
    ) -> Self {
        Self { store, provider }
    }

    /// Claim the job's records, embed their text in one provider call, and
    /// write results back atomically. Per-item provider failures mark only
    /// that row Failed; a whole-call failure marks every claimed row Failed
    /// and propagates so the queue's retry accounting sees it.
    async fn process_batch(&self, job: &EnrichmentJob) -> Result<(), PipelineError> {
        let claimed = self
            .store
            .claim_for_embedding(&job.user_id, &job.email_ids)
            .await?;
        if claimed.is_empty() {
            debug!(job_id = %job.id, "No records left to embed");
            return Ok(());
        }

        let texts: Vec<String> = claimed.iter().map(|r| r.embedding_text()).collect();
        let embeddings = match self.provider.embed_batch(&texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                error!(job_id = %job.id, claimed = claimed.len(), error = %e, "Embedding call failed");
                let updates = claimed
                    .iter()
                    .map(|r| EmbeddingUpdate {
                        id: r.id.clone(),
                        embedding: None,
                        status: EnrichmentStatus::Failed,
                    })
                    .collect();
                self.store.batch_update_embeddings(updates).await?;
                return Err(e.into());
            }
        };

        let mut completed = 0usize;
        let mut failed = 0usize;
        let updates: Vec<EmbeddingUpdate> = claimed
            .iter()
            .zip(embeddings)
            .map(|(record, embedding)| match embedding {
                Some(embedding) => {
                    completed += 1;
                    EmbeddingUpdate {
                        id: record.id.clone(),
                        embedding: Some(embedding.into_values()),
                        status: EnrichmentStatus::Completed,
                    }
                }
                None => {
                    failed += 1;
                    warn!(record_id = %record.id, "Provider returned no embedding");
                    EmbeddingUpdate {
                        id: record.id.clone(),
                        embedding: None,
                        status: EnrichmentStatus::Failed,
                    }
                }
            })
            .collect();
        self.store.batch_update_embeddings(updates).await?;

        info!(
            job_id = %job.id,
            user_id = %job.user_id,
            completed,
            failed,
            "Embedding batch written"
        );
        Ok(())
    }
}

#[async_trait]
impl JobHandler for EmbeddingWorker {
    async fn process(&self, job: &EnrichmentJob) -> Result<(), JobError> {
        self.process_batch(job).await.map_err(JobError::from)
    }
}
