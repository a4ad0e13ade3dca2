//! The `EmailRecordStore` capability contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mailflow_types::{
    EmailWorkflowRecord, EnrichmentStatus, IncomingMessage, ListOptions, WorkflowStatus,
};

use crate::error::StoreError;

/// Result of a sync upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub created: usize,
    pub updated: usize,
}

/// An id with a similarity or relevance score, as returned by the cheap
/// index-side queries. Full rows are fetched by primary key afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredId {
    pub id: String,
    pub score: f32,
}

/// One row of an atomic embedding write-back.
#[derive(Debug, Clone)]
pub struct EmbeddingUpdate {
    pub id: String,
    /// `None` marks the row with `status` but leaves the embedding untouched
    pub embedding: Option<Vec<f32>>,
    pub status: EnrichmentStatus,
}

/// One row of an atomic summary write-back.
#[derive(Debug, Clone)]
pub struct SummaryUpdate {
    pub id: String,
    pub summary: String,
    pub urgency_score: f32,
    pub status: EnrichmentStatus,
}

/// Durable store of email workflow records.
///
/// All mutation is by primary-key-scoped writes (single record or an
/// explicit batch of ids), never broad scan-and-update. Implementations
/// must be thread-safe.
#[async_trait]
pub trait EmailRecordStore: Send + Sync {
    /// Upsert a batch of synced messages keyed on
    /// `(user_id, provider_message_id)`. Creates land in `Inbox` with a
    /// pending embedding; updates refresh subject and snippet only.
    /// Applied transactionally.
    async fn sync_messages(
        &self,
        user_id: &str,
        messages: Vec<IncomingMessage>,
    ) -> Result<SyncOutcome, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<EmailWorkflowRecord>, StoreError>;

    /// Fetch full rows for a set of ids, scoped to one user. Order of the
    /// result is unspecified; callers re-order by their own score list.
    async fn find_by_ids(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError>;

    async fn find_by_message_id(
        &self,
        user_id: &str,
        provider_message_id: &str,
    ) -> Result<Option<EmailWorkflowRecord>, StoreError>;

    /// Page of records in one workflow status, honoring `ListOptions`
    /// filters and sort.
    async fn list_by_status(
        &self,
        user_id: &str,
        status: WorkflowStatus,
        options: &ListOptions,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError>;

    async fn count_by_status(
        &self,
        user_id: &str,
        status: WorkflowStatus,
        options: &ListOptions,
    ) -> Result<usize, StoreError>;

    /// Set workflow status. Any transition away from `Snoozed` clears
    /// `snoozed_until`.
    async fn update_status(
        &self,
        id: &str,
        status: WorkflowStatus,
    ) -> Result<EmailWorkflowRecord, StoreError>;

    /// Snooze a record: sets `status = Snoozed` and the wake timestamp
    /// together, preserving the snooze invariant.
    async fn update_snooze(
        &self,
        id: &str,
        snoozed_until: DateTime<Utc>,
    ) -> Result<EmailWorkflowRecord, StoreError>;

    async fn update_priority(
        &self,
        id: &str,
        priority: i32,
    ) -> Result<EmailWorkflowRecord, StoreError>;

    async fn update_deadline(
        &self,
        id: &str,
        deadline: DateTime<Utc>,
    ) -> Result<EmailWorkflowRecord, StoreError>;

    /// Records past their deadline and not yet done, ordered by deadline.
    async fn find_overdue(&self, user_id: &str) -> Result<Vec<EmailWorkflowRecord>, StoreError>;

    /// Snoozed records whose wake time has passed.
    async fn find_snoozed_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError>;

    /// Newest records still waiting for an embedding (the re-sync lever).
    async fn find_pending_embeddings(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError>;

    async fn update_embedding_status(
        &self,
        id: &str,
        status: EnrichmentStatus,
    ) -> Result<EmailWorkflowRecord, StoreError>;

    /// Conditionally claim records for embedding work: rows whose status is
    /// still Pending (or unset) and that carry no embedding are marked
    /// Processing in one atomic step, and only the rows actually claimed are
    /// returned. Rows already Processing, Completed, or Failed are skipped.
    async fn claim_for_embedding(
        &self,
        user_id: &str,
        provider_message_ids: &[String],
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError>;

    /// Same claim semantics for summarization eligibility.
    async fn claim_for_summary(
        &self,
        user_id: &str,
        provider_message_ids: &[String],
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError>;

    /// Apply a batch of embedding results as one atomic multi-row write.
    async fn batch_update_embeddings(
        &self,
        updates: Vec<EmbeddingUpdate>,
    ) -> Result<(), StoreError>;

    async fn update_summary(
        &self,
        id: &str,
        summary: &str,
        urgency_score: f32,
        status: EnrichmentStatus,
    ) -> Result<EmailWorkflowRecord, StoreError>;

    /// Apply a batch of summary results as one atomic multi-row write.
    async fn batch_update_summaries(&self, updates: Vec<SummaryUpdate>)
        -> Result<(), StoreError>;

    /// Lexical-similarity query returning ids with relevance scores, ranked
    /// by relevance desc, priority desc, urgency desc (nulls last), date
    /// desc. Returns `StoreError::Unsupported` when the backend has no
    /// similarity capability.
    async fn search_lexical(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScoredId>, StoreError>;

    async fn count_lexical(&self, user_id: &str, query: &str) -> Result<usize, StoreError>;

    /// Case-insensitive multi-term substring search, ranked by priority,
    /// urgency, date only. The degraded mode behind `search_lexical`.
    async fn search_basic(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError>;

    async fn count_basic(&self, user_id: &str, query: &str) -> Result<usize, StoreError>;

    /// Number of records with a completed embedding.
    async fn count_embedded(&self, user_id: &str) -> Result<usize, StoreError>;

    /// Vector-distance query over completed embeddings, returning ids with
    /// `similarity = 1 - cosine_distance`, closest first.
    async fn search_semantic(
        &self,
        user_id: &str,
        query_embedding: &[f32],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScoredId>, StoreError>;
}
