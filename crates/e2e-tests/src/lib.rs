//! End-to-end test infrastructure for mailflow.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering the full sync-to-search pipeline.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use mailflow_provider::MockProvider;
use mailflow_queue::QueueConfig;
use mailflow_service::{Mailflow, MailflowConfig};
use mailflow_store::{EmailRecordStore, MemoryStore};
use mailflow_types::{
    EmailWorkflowRecord, EnrichmentStatus, IncomingMessage, ListOptions, WorkflowStatus,
};

/// Shared test harness for E2E tests.
///
/// Wires a fresh in-memory store and a scriptable mock provider into a
/// full `Mailflow` instance with test-friendly queue timings.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub provider: Arc<MockProvider>,
    pub mailflow: Mailflow,
}

impl TestHarness {
    /// Harness with provider-backed enrichment, started and ready.
    pub fn started() -> Self {
        let harness = Self::new();
        harness.mailflow.start().expect("Failed to start mailflow");
        harness
    }

    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(MockProvider::new());
        let mailflow = Mailflow::new(
            store.clone(),
            Some(provider.clone()),
            test_config(),
        );
        Self {
            store,
            provider,
            mailflow,
        }
    }

    /// Sync `count` generated messages for `user_id` and wait for their
    /// enrichment to settle.
    pub async fn sync_and_enrich(&self, user_id: &str, count: usize) {
        self.mailflow
            .sync_messages(user_id, create_test_messages(count))
            .await
            .expect("Failed to sync messages");
        self.wait_for_enrichment(user_id, count).await;
    }

    /// Poll until every record for `user_id` has left Pending/Processing
    /// for both enrichment tracks.
    pub async fn wait_for_enrichment(&self, user_id: &str, count: usize) {
        for _ in 0..250 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let records = self.all_records(user_id).await;
            if records.len() >= count && records.iter().all(enrichment_settled) {
                return;
            }
        }
        panic!("enrichment did not settle for {user_id}");
    }

    /// Every record for `user_id`, across all workflow statuses.
    pub async fn all_records(&self, user_id: &str) -> Vec<EmailWorkflowRecord> {
        let mut records = Vec::new();
        for status in [
            WorkflowStatus::Inbox,
            WorkflowStatus::Todo,
            WorkflowStatus::InProgress,
            WorkflowStatus::Done,
            WorkflowStatus::Snoozed,
        ] {
            records.extend(
                self.store
                    .list_by_status(user_id, status, &ListOptions::default(), 1000, 0)
                    .await
                    .expect("Failed to list records"),
            );
        }
        records
    }

    pub async fn record_by_message(&self, user_id: &str, message_id: &str) -> EmailWorkflowRecord {
        self.store
            .find_by_message_id(user_id, message_id)
            .await
            .expect("Failed to look up record")
            .unwrap_or_else(|| panic!("no record for message {message_id}"))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn enrichment_settled(record: &EmailWorkflowRecord) -> bool {
    let done = |status: Option<EnrichmentStatus>| status.is_some_and(|s| s.is_terminal());
    done(record.embedding_status) && done(record.summary_status)
}

/// Queue timings tuned for tests: tight backoff, high rate limit.
pub fn test_config() -> MailflowConfig {
    MailflowConfig {
        queue: QueueConfig {
            concurrency: 3,
            max_attempts: 3,
            rate_limit_per_sec: 1000,
            initial_backoff_ms: 10,
            max_backoff_ms: 50,
        },
        sweep_interval_secs: 1,
        ..Default::default()
    }
}

/// Create N test messages with distinct subjects and descending dates.
pub fn create_test_messages(count: usize) -> Vec<IncomingMessage> {
    let topics = [
        "Quarterly budget review",
        "Team offsite logistics",
        "Production incident follow-up",
        "Contract renewal terms",
        "Hiring pipeline update",
    ];
    (1..=count)
        .map(|n| IncomingMessage {
            provider_message_id: format!("m-{n}"),
            subject: format!("{} {n}", topics[(n - 1) % topics.len()]),
            sender: format!("sender{n}@example.com"),
            snippet: Some(format!("Details for item {n} attached below")),
            date: Utc::now() - ChronoDuration::minutes(n as i64),
            has_attachment: n % 2 == 0,
            is_read: false,
        })
        .collect()
}
