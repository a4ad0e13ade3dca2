//! The `Mailflow` facade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mailflow_pipeline::{DispatchOutcome, EmbeddingWorker, EnrichmentDispatcher, SummaryWorker};
use mailflow_provider::EnrichmentProvider;
use mailflow_queue::{JobKind, JobQueue, QueueStats};
use mailflow_search::{SearchEngine, SearchHit};
use mailflow_store::{EmailRecordStore, SyncOutcome};
use mailflow_types::{
    EmailWorkflowRecord, IncomingMessage, ListOptions, Page, WorkflowStatus,
};
use mailflow_workflow::{AutoReturnSweeper, WorkflowService};

use crate::config::MailflowConfig;
use crate::error::ServiceError;

/// Stats for both enrichment queues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentQueueStats {
    pub embedding: QueueStats,
    pub summary: QueueStats,
}

/// The assembled Mailflow system.
///
/// Construction wires everything; `start` brings up the queue workers and
/// the sweeper. Without an enrichment provider the queues are never
/// started and dispatch is skipped, so sync, listing, workflow updates,
/// and fuzzy search keep working unchanged.
pub struct Mailflow {
    store: Arc<dyn EmailRecordStore>,
    provider: Option<Arc<dyn EnrichmentProvider>>,
    config: MailflowConfig,
    embedding_queue: Arc<JobQueue>,
    summary_queue: Arc<JobQueue>,
    dispatcher: Arc<EnrichmentDispatcher>,
    search: SearchEngine,
    workflow: WorkflowService,
    sweeper: Arc<AutoReturnSweeper>,
    started: AtomicBool,
}

impl Mailflow {
    pub fn new(
        store: Arc<dyn EmailRecordStore>,
        provider: Option<Arc<dyn EnrichmentProvider>>,
        config: MailflowConfig,
    ) -> Self {
        let embedding_queue = JobQueue::new(JobKind::Embedding, config.queue.clone());
        let summary_queue = JobQueue::new(JobKind::Summary, config.queue.clone());
        let dispatcher = Arc::new(EnrichmentDispatcher::new(
            embedding_queue.clone(),
            summary_queue.clone(),
        ));
        let search = SearchEngine::new(store.clone(), provider.clone());
        let workflow = WorkflowService::new(store.clone());
        let sweeper = Arc::new(AutoReturnSweeper::with_interval(
            store.clone(),
            Duration::from_secs(config.sweep_interval_secs),
        ));
        Self {
            store,
            provider,
            config,
            embedding_queue,
            summary_queue,
            dispatcher,
            search,
            workflow,
            sweeper,
            started: AtomicBool::new(false),
        }
    }

    /// Start queue workers (when a provider is configured) and the
    /// auto-return sweeper.
    pub fn start(&self) -> Result<(), ServiceError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::AlreadyStarted);
        }
        if let Some(provider) = &self.provider {
            self.embedding_queue.start(Arc::new(EmbeddingWorker::new(
                self.store.clone(),
                provider.clone(),
            )))?;
            self.summary_queue.start(Arc::new(SummaryWorker::new(
                self.store.clone(),
                provider.clone(),
            )))?;
        } else {
            info!("No enrichment provider configured, queues stay idle");
        }
        self.sweeper.start();
        info!("Mailflow started");
        Ok(())
    }

    pub fn shutdown(&self) {
        self.embedding_queue.shutdown();
        self.summary_queue.shutdown();
        self.sweeper.shutdown();
        info!("Mailflow shut down");
    }

    /// Upsert a batch of synced messages, then enqueue enrichment for the
    /// records that still need it.
    pub async fn sync_messages(
        &self,
        user_id: &str,
        messages: Vec<IncomingMessage>,
    ) -> Result<SyncOutcome, ServiceError> {
        let message_ids: Vec<String> = messages
            .iter()
            .map(|m| m.provider_message_id.clone())
            .collect();
        let outcome = self.store.sync_messages(user_id, messages).await?;
        info!(
            user_id,
            created = outcome.created,
            updated = outcome.updated,
            "Messages synced"
        );

        if self.provider.is_some() {
            let records = self.records_for_messages(user_id, &message_ids).await?;
            self.dispatcher.dispatch(user_id, &records).await?;
        }
        Ok(outcome)
    }

    /// One page of the user's records in `status`. Listing doubles as an
    /// enrichment trigger: records on the page that still need embeddings
    /// or summaries are dispatched in the background.
    pub async fn list_workflows(
        &self,
        user_id: &str,
        status: WorkflowStatus,
        options: &ListOptions,
        limit: usize,
        offset: usize,
    ) -> Result<Page<EmailWorkflowRecord>, ServiceError> {
        let page = self
            .workflow
            .list(user_id, status, options, limit, offset)
            .await?;

        if self.provider.is_some() {
            let needs_work: Vec<EmailWorkflowRecord> = page
                .items
                .iter()
                .filter(|r| r.needs_embedding() || r.needs_summary())
                .cloned()
                .collect();
            if !needs_work.is_empty() {
                let dispatcher = self.dispatcher.clone();
                let user_id = user_id.to_string();
                tokio::spawn(async move {
                    if let Err(e) = dispatcher.dispatch(&user_id, &needs_work).await {
                        warn!(user_id, error = %e, "Background dispatch failed");
                    }
                });
            }
        }
        Ok(page)
    }

    /// Re-dispatch enrichment for the newest records still waiting on an
    /// embedding. The manual lever for catching up after downtime.
    pub async fn dispatch_pending(
        &self,
        user_id: &str,
    ) -> Result<DispatchOutcome, ServiceError> {
        if self.provider.is_none() {
            return Ok(DispatchOutcome::default());
        }
        let records = self
            .store
            .find_pending_embeddings(user_id, self.config.redispatch_limit)
            .await?;
        Ok(self.dispatcher.dispatch(user_id, &records).await?)
    }

    pub async fn search_fuzzy(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<SearchHit>, ServiceError> {
        Ok(self.search.search_fuzzy(user_id, query, limit, offset).await?)
    }

    pub async fn search_semantic(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<SearchHit>, ServiceError> {
        Ok(self
            .search
            .search_semantic(user_id, query, limit, offset)
            .await?)
    }

    pub async fn set_status(
        &self,
        user_id: &str,
        id: &str,
        status: WorkflowStatus,
    ) -> Result<EmailWorkflowRecord, ServiceError> {
        Ok(self.workflow.set_status(user_id, id, status).await?)
    }

    pub async fn snooze(
        &self,
        user_id: &str,
        id: &str,
        snoozed_until: DateTime<Utc>,
    ) -> Result<EmailWorkflowRecord, ServiceError> {
        Ok(self.workflow.snooze(user_id, id, snoozed_until).await?)
    }

    pub async fn set_priority(
        &self,
        user_id: &str,
        id: &str,
        priority: i32,
    ) -> Result<EmailWorkflowRecord, ServiceError> {
        Ok(self.workflow.set_priority(user_id, id, priority).await?)
    }

    pub async fn set_deadline(
        &self,
        user_id: &str,
        id: &str,
        deadline: DateTime<Utc>,
    ) -> Result<EmailWorkflowRecord, ServiceError> {
        Ok(self.workflow.set_deadline(user_id, id, deadline).await?)
    }

    pub async fn find_overdue(
        &self,
        user_id: &str,
    ) -> Result<Vec<EmailWorkflowRecord>, ServiceError> {
        Ok(self.workflow.find_overdue(user_id).await?)
    }

    /// Run one auto-return sweep immediately, outside the timer.
    pub async fn sweep_snoozed(&self) -> mailflow_workflow::SweepStats {
        self.sweeper.sweep_once().await
    }

    pub fn queue_stats(&self) -> EnrichmentQueueStats {
        EnrichmentQueueStats {
            embedding: self.embedding_queue.stats(),
            summary: self.summary_queue.stats(),
        }
    }

    async fn records_for_messages(
        &self,
        user_id: &str,
        message_ids: &[String],
    ) -> Result<Vec<EmailWorkflowRecord>, ServiceError> {
        let mut records = Vec::with_capacity(message_ids.len());
        for message_id in message_ids {
            if let Some(record) = self.store.find_by_message_id(user_id, message_id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailflow_provider::MockProvider;
    use mailflow_queue::QueueConfig;
    use mailflow_store::MemoryStore;
    use mailflow_types::EnrichmentStatus;
    use pretty_assertions::assert_eq;

    fn message(n: usize) -> IncomingMessage {
        IncomingMessage {
            provider_message_id: format!("m-{n}"),
            subject: format!("Subject {n}"),
            sender: "alice@example.com".to_string(),
            snippet: Some(format!("Snippet {n}")),
            date: Utc::now(),
            has_attachment: false,
            is_read: false,
        }
    }

    fn fast_config() -> MailflowConfig {
        MailflowConfig {
            queue: QueueConfig {
                concurrency: 2,
                max_attempts: 2,
                rate_limit_per_sec: 1000,
                initial_backoff_ms: 10,
                max_backoff_ms: 50,
            },
            ..Default::default()
        }
    }

    async fn wait_for_enrichment(mailflow: &Mailflow, user_id: &str, count: usize) {
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let stats = mailflow.queue_stats();
            if stats.embedding.completed + stats.embedding.failed >= 1
                && stats.summary.completed + stats.summary.failed >= 1
            {
                let page = mailflow
                    .list_workflows(
                        user_id,
                        WorkflowStatus::Inbox,
                        &ListOptions::default(),
                        count,
                        0,
                    )
                    .await
                    .unwrap();
                if page
                    .items
                    .iter()
                    .all(|r| r.embedding_status == Some(EnrichmentStatus::Completed))
                {
                    return;
                }
            }
        }
        panic!("enrichment did not finish in time");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_enriches_records_end_to_end() {
        let mailflow = Mailflow::new(
            Arc::new(MemoryStore::new()),
            Some(Arc::new(MockProvider::new())),
            fast_config(),
        );
        mailflow.start().unwrap();

        let outcome = mailflow
            .sync_messages("user-1", (1..=3).map(message).collect())
            .await
            .unwrap();
        assert_eq!(outcome, SyncOutcome { created: 3, updated: 0 });

        wait_for_enrichment(&mailflow, "user-1", 3).await;

        let page = mailflow
            .list_workflows(
                "user-1",
                WorkflowStatus::Inbox,
                &ListOptions::default(),
                10,
                0,
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        for record in &page.items {
            assert!(record.embedding.is_some());
            assert_eq!(record.summary_status, Some(EnrichmentStatus::Completed));
            assert!(record.ai_summary.is_some());
        }
        mailflow.shutdown();
    }

    #[tokio::test]
    async fn works_without_a_provider() {
        let mailflow = Mailflow::new(Arc::new(MemoryStore::new()), None, fast_config());
        mailflow.start().unwrap();

        mailflow
            .sync_messages("user-1", vec![message(1)])
            .await
            .unwrap();

        // Nothing enqueued without a provider
        assert_eq!(mailflow.queue_stats(), EnrichmentQueueStats::default());

        let page = mailflow
            .search_semantic("user-1", "subject", 10, 0)
            .await
            .unwrap();
        // Semantic degrades to fuzzy and still finds the record
        assert_eq!(page.total, 1);
        assert!(page.items[0].similarity.is_none());
        mailflow.shutdown();
    }

    #[tokio::test]
    async fn start_twice_errors() {
        let mailflow = Mailflow::new(Arc::new(MemoryStore::new()), None, fast_config());
        mailflow.start().unwrap();
        assert!(matches!(mailflow.start(), Err(ServiceError::AlreadyStarted)));
        mailflow.shutdown();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatch_pending_catches_up() {
        let store = Arc::new(MemoryStore::new());
        // Seed before the service exists, simulating records from downtime
        store
            .sync_messages("user-1", (1..=2).map(message).collect())
            .await
            .unwrap();

        let mailflow = Mailflow::new(
            store,
            Some(Arc::new(MockProvider::new())),
            fast_config(),
        );
        mailflow.start().unwrap();

        let outcome = mailflow.dispatch_pending("user-1").await.unwrap();
        assert_eq!(outcome.embedding_candidates, 2);
        assert_eq!(outcome.embedding_jobs, 1);

        wait_for_enrichment(&mailflow, "user-1", 2).await;
        mailflow.shutdown();
    }

    #[tokio::test]
    async fn workflow_operations_round_trip() {
        let mailflow = Mailflow::new(Arc::new(MemoryStore::new()), None, fast_config());
        mailflow.start().unwrap();
        mailflow
            .sync_messages("user-1", vec![message(1)])
            .await
            .unwrap();

        let page = mailflow
            .list_workflows(
                "user-1",
                WorkflowStatus::Inbox,
                &ListOptions::default(),
                10,
                0,
            )
            .await
            .unwrap();
        let id = page.items[0].id.clone();

        mailflow
            .snooze("user-1", &id, Utc::now() - chrono::Duration::seconds(1))
            .await
            .unwrap();
        let stats = mailflow.sweep_snoozed().await;
        assert_eq!(stats.returned, 1);

        let record = mailflow
            .set_status("user-1", &id, WorkflowStatus::Done)
            .await
            .unwrap();
        assert_eq!(record.status, WorkflowStatus::Done);
        mailflow.shutdown();
    }
}
