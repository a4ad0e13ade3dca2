//! In-memory reference implementation of `EmailRecordStore`.
//!
//! Backs the primitives with a record map guarded by one `RwLock`, which
//! makes every batch mutation naturally atomic: a write lock is held for
//! the whole multi-row update. Lexical search uses the trigram module,
//! semantic search brute-forces cosine distance over completed embeddings.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use ulid::Ulid;

use mailflow_types::{
    EmailWorkflowRecord, EnrichmentStatus, IncomingMessage, ListOptions, SortOrder,
    WorkflowStatus,
};

use crate::error::StoreError;
use crate::store::{
    EmailRecordStore, EmbeddingUpdate, ScoredId, SummaryUpdate, SyncOutcome,
};
use crate::trigram;

/// Similarity floor a field must clear to qualify a record, unless a
/// substring match catches it instead.
const SIMILARITY_THRESHOLD: f32 = 0.3;

const SUBJECT_WEIGHT: f32 = 3.0;
const SENDER_WEIGHT: f32 = 2.5;
const SNIPPET_WEIGHT: f32 = 1.0;
const SUMMARY_WEIGHT: f32 = 1.5;

#[derive(Default)]
struct State {
    records: HashMap<String, EmailWorkflowRecord>,
    /// (user_id, provider_message_id) -> record id
    by_message: HashMap<(String, String), String>,
}

/// In-memory `EmailRecordStore`.
pub struct MemoryStore {
    state: RwLock<State>,
    trigram_enabled: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            trigram_enabled: true,
        }
    }

    /// A store whose similarity capability is unavailable; `search_lexical`
    /// returns `Unsupported` so callers exercise the basic-mode fallback.
    pub fn without_trigram() -> Self {
        Self {
            state: RwLock::new(State::default()),
            trigram_enabled: false,
        }
    }

    fn get_mut<'a>(
        state: &'a mut State,
        id: &str,
    ) -> Result<&'a mut EmailWorkflowRecord, StoreError> {
        state
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn matches_filters(record: &EmailWorkflowRecord, options: &ListOptions) -> bool {
        (!options.unread_only || !record.is_read)
            && (!options.attachments_only || record.has_attachment)
    }

    /// Default listing order: priority desc, urgency desc (nulls last),
    /// date desc.
    fn default_order(a: &EmailWorkflowRecord, b: &EmailWorkflowRecord) -> Ordering {
        b.priority
            .cmp(&a.priority)
            .then_with(|| Self::urgency_desc_nulls_last(a, b))
            .then_with(|| b.date.cmp(&a.date))
    }

    fn urgency_desc_nulls_last(a: &EmailWorkflowRecord, b: &EmailWorkflowRecord) -> Ordering {
        match (a.urgency_score, b.urgency_score) {
            (Some(ua), Some(ub)) => ub.total_cmp(&ua),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Weighted relevance plus whether the record qualifies at all.
    ///
    /// A record qualifies when any field's raw similarity clears the
    /// threshold, or any field contains the query as a case-insensitive
    /// substring. The substring arm deliberately catches short exact
    /// queries that trigram similarity under-scores.
    fn lexical_relevance(record: &EmailWorkflowRecord, query: &str) -> Option<f32> {
        let fields = [
            (record.subject.as_str(), SUBJECT_WEIGHT),
            (record.sender.as_str(), SENDER_WEIGHT),
            (record.snippet.as_deref().unwrap_or(""), SNIPPET_WEIGHT),
            (record.ai_summary.as_deref().unwrap_or(""), SUMMARY_WEIGHT),
        ];

        let query_lower = query.to_lowercase();
        let mut relevance: f32 = 0.0;
        let mut qualifies = false;
        for (text, weight) in fields {
            let sim = trigram::similarity(text, query);
            relevance = relevance.max(sim * weight);
            if sim > SIMILARITY_THRESHOLD || text.to_lowercase().contains(&query_lower) {
                qualifies = true;
            }
        }
        qualifies.then_some(relevance)
    }

    /// All qualifying records for a query, ranked but not yet paginated.
    fn lexical_ranked(state: &State, user_id: &str, query: &str) -> Vec<(String, f32)> {
        let mut scored: Vec<(&EmailWorkflowRecord, f32)> = state
            .records
            .values()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| Self::lexical_relevance(r, query).map(|score| (r, score)))
            .collect();
        scored.sort_by(|(ra, sa), (rb, sb)| {
            sb.total_cmp(sa).then_with(|| Self::default_order(ra, rb))
        });
        scored
            .into_iter()
            .map(|(r, score)| (r.id.clone(), score))
            .collect()
    }

    fn basic_matches(record: &EmailWorkflowRecord, terms: &[String]) -> bool {
        let haystacks = [
            Some(record.subject.to_lowercase()),
            Some(record.sender.to_lowercase()),
            record.snippet.as_ref().map(|s| s.to_lowercase()),
            record.ai_summary.as_ref().map(|s| s.to_lowercase()),
        ];
        terms.iter().any(|term| {
            haystacks
                .iter()
                .flatten()
                .any(|haystack| haystack.contains(term))
        })
    }

    fn query_terms(query: &str) -> Vec<String> {
        query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl EmailRecordStore for MemoryStore {
    async fn sync_messages(
        &self,
        user_id: &str,
        messages: Vec<IncomingMessage>,
    ) -> Result<SyncOutcome, StoreError> {
        let mut state = self.state.write().await;
        let mut outcome = SyncOutcome::default();
        for message in messages {
            if message.provider_message_id.is_empty() {
                return Err(StoreError::InvalidInput(
                    "provider_message_id is missing for a synced message".to_string(),
                ));
            }
            let key = (user_id.to_string(), message.provider_message_id.clone());
            match state.by_message.get(&key) {
                Some(id) => {
                    let id = id.clone();
                    let record = Self::get_mut(&mut state, &id)?;
                    if !message.subject.trim().is_empty() {
                        record.subject = message.subject;
                    }
                    record.snippet = message.snippet;
                    record.is_read = message.is_read;
                    record.updated_at = Utc::now();
                    outcome.updated += 1;
                }
                None => {
                    let record = EmailWorkflowRecord::from_message(
                        Ulid::new().to_string(),
                        user_id.to_string(),
                        message,
                    );
                    state.by_message.insert(key, record.id.clone());
                    state.records.insert(record.id.clone(), record);
                    outcome.created += 1;
                }
            }
        }
        debug!(
            user_id = %user_id,
            created = outcome.created,
            updated = outcome.updated,
            "Synced messages"
        );
        Ok(outcome)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<EmailWorkflowRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.records.get(id).cloned())
    }

    async fn find_by_ids(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_message_id(
        &self,
        user_id: &str,
        provider_message_id: &str,
    ) -> Result<Option<EmailWorkflowRecord>, StoreError> {
        let state = self.state.read().await;
        let key = (user_id.to_string(), provider_message_id.to_string());
        Ok(state
            .by_message
            .get(&key)
            .and_then(|id| state.records.get(id))
            .cloned())
    }

    async fn list_by_status(
        &self,
        user_id: &str,
        status: WorkflowStatus,
        options: &ListOptions,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records: Vec<EmailWorkflowRecord> = state
            .records
            .values()
            .filter(|r| r.user_id == user_id && r.status == status)
            .filter(|r| Self::matches_filters(r, options))
            .cloned()
            .collect();
        match options.sort_by {
            Some(SortOrder::DateNewest) => records.sort_by(|a, b| b.date.cmp(&a.date)),
            Some(SortOrder::DateOldest) => records.sort_by(|a, b| a.date.cmp(&b.date)),
            None => records.sort_by(Self::default_order),
        }
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_by_status(
        &self,
        user_id: &str,
        status: WorkflowStatus,
        options: &ListOptions,
    ) -> Result<usize, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .filter(|r| r.user_id == user_id && r.status == status)
            .filter(|r| Self::matches_filters(r, options))
            .count())
    }

    async fn update_status(
        &self,
        id: &str,
        status: WorkflowStatus,
    ) -> Result<EmailWorkflowRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = Self::get_mut(&mut state, id)?;
        record.status = status;
        if status != WorkflowStatus::Snoozed {
            record.snoozed_until = None;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn update_snooze(
        &self,
        id: &str,
        snoozed_until: DateTime<Utc>,
    ) -> Result<EmailWorkflowRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = Self::get_mut(&mut state, id)?;
        record.status = WorkflowStatus::Snoozed;
        record.snoozed_until = Some(snoozed_until);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn update_priority(
        &self,
        id: &str,
        priority: i32,
    ) -> Result<EmailWorkflowRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = Self::get_mut(&mut state, id)?;
        record.priority = priority;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn update_deadline(
        &self,
        id: &str,
        deadline: DateTime<Utc>,
    ) -> Result<EmailWorkflowRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = Self::get_mut(&mut state, id)?;
        record.deadline = Some(deadline);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn find_overdue(&self, user_id: &str) -> Result<Vec<EmailWorkflowRecord>, StoreError> {
        let now = Utc::now();
        let state = self.state.read().await;
        let mut records: Vec<EmailWorkflowRecord> = state
            .records
            .values()
            .filter(|r| {
                r.user_id == user_id
                    && r.status != WorkflowStatus::Done
                    && r.deadline.is_some_and(|d| d < now)
            })
            .cloned()
            .collect();
        records.sort_by_key(|r| r.deadline);
        Ok(records)
    }

    async fn find_snoozed_due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .filter(|r| {
                r.status == WorkflowStatus::Snoozed && r.snoozed_until.is_some_and(|t| t <= now)
            })
            .cloned()
            .collect())
    }

    async fn find_pending_embeddings(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records: Vec<EmailWorkflowRecord> = state
            .records
            .values()
            .filter(|r| r.user_id == user_id && r.needs_embedding())
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn update_embedding_status(
        &self,
        id: &str,
        status: EnrichmentStatus,
    ) -> Result<EmailWorkflowRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = Self::get_mut(&mut state, id)?;
        record.embedding_status = Some(status);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn claim_for_embedding(
        &self,
        user_id: &str,
        provider_message_ids: &[String],
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError> {
        let mut state = self.state.write().await;
        let mut claimed = Vec::new();
        for message_id in provider_message_ids {
            let key = (user_id.to_string(), message_id.clone());
            let Some(id) = state.by_message.get(&key).cloned() else {
                continue;
            };
            let record = Self::get_mut(&mut state, &id)?;
            if record.needs_embedding() {
                record.embedding_status = Some(EnrichmentStatus::Processing);
                record.updated_at = Utc::now();
                claimed.push(record.clone());
            }
        }
        Ok(claimed)
    }

    async fn claim_for_summary(
        &self,
        user_id: &str,
        provider_message_ids: &[String],
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError> {
        let mut state = self.state.write().await;
        let mut claimed = Vec::new();
        for message_id in provider_message_ids {
            let key = (user_id.to_string(), message_id.clone());
            let Some(id) = state.by_message.get(&key).cloned() else {
                continue;
            };
            let record = Self::get_mut(&mut state, &id)?;
            if record.needs_summary() {
                record.summary_status = Some(EnrichmentStatus::Processing);
                record.updated_at = Utc::now();
                claimed.push(record.clone());
            }
        }
        Ok(claimed)
    }

    async fn batch_update_embeddings(
        &self,
        updates: Vec<EmbeddingUpdate>,
    ) -> Result<(), StoreError> {
        // One write lock for the whole batch: all-or-none visibility.
        let mut state = self.state.write().await;
        for update in &updates {
            if !state.records.contains_key(&update.id) {
                return Err(StoreError::NotFound(update.id.clone()));
            }
        }
        for update in updates {
            let record = Self::get_mut(&mut state, &update.id)?;
            if let Some(embedding) = update.embedding {
                record.embedding = Some(embedding);
            }
            if update.status != EnrichmentStatus::Completed {
                record.embedding = None;
            }
            record.embedding_status = Some(update.status);
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_summary(
        &self,
        id: &str,
        summary: &str,
        urgency_score: f32,
        status: EnrichmentStatus,
    ) -> Result<EmailWorkflowRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = Self::get_mut(&mut state, id)?;
        record.ai_summary = Some(summary.to_string());
        record.urgency_score = Some(urgency_score);
        record.summary_status = Some(status);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn batch_update_summaries(
        &self,
        updates: Vec<SummaryUpdate>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        for update in &updates {
            if !state.records.contains_key(&update.id) {
                return Err(StoreError::NotFound(update.id.clone()));
            }
        }
        for update in updates {
            let record = Self::get_mut(&mut state, &update.id)?;
            record.ai_summary = Some(update.summary);
            record.urgency_score = Some(update.urgency_score);
            record.summary_status = Some(update.status);
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn search_lexical(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScoredId>, StoreError> {
        if !self.trigram_enabled {
            return Err(StoreError::Unsupported(
                "trigram similarity".to_string(),
            ));
        }
        let state = self.state.read().await;
        Ok(Self::lexical_ranked(&state, user_id, query)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(id, score)| ScoredId { id, score })
            .collect())
    }

    async fn count_lexical(&self, user_id: &str, query: &str) -> Result<usize, StoreError> {
        if !self.trigram_enabled {
            return Err(StoreError::Unsupported(
                "trigram similarity".to_string(),
            ));
        }
        let state = self.state.read().await;
        Ok(Self::lexical_ranked(&state, user_id, query).len())
    }

    async fn search_basic(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<EmailWorkflowRecord>, StoreError> {
        let terms = Self::query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let state = self.state.read().await;
        let mut records: Vec<EmailWorkflowRecord> = state
            .records
            .values()
            .filter(|r| r.user_id == user_id && Self::basic_matches(r, &terms))
            .cloned()
            .collect();
        records.sort_by(Self::default_order);
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_basic(&self, user_id: &str, query: &str) -> Result<usize, StoreError> {
        let terms = Self::query_terms(query);
        if terms.is_empty() {
            return Ok(0);
        }
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .filter(|r| r.user_id == user_id && Self::basic_matches(r, &terms))
            .count())
    }

    async fn count_embedded(&self, user_id: &str) -> Result<usize, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .values()
            .filter(|r| {
                r.user_id == user_id
                    && r.embedding.is_some()
                    && r.embedding_status == Some(EnrichmentStatus::Completed)
            })
            .count())
    }

    async fn search_semantic(
        &self,
        user_id: &str,
        query_embedding: &[f32],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ScoredId>, StoreError> {
        let state = self.state.read().await;
        let mut scored: Vec<ScoredId> = state
            .records
            .values()
            .filter(|r| {
                r.user_id == user_id
                    && r.embedding_status == Some(EnrichmentStatus::Completed)
            })
            .filter_map(|r| {
                r.embedding.as_ref().map(|e| ScoredId {
                    id: r.id.clone(),
                    score: Self::cosine_similarity(e, query_embedding),
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scored.into_iter().skip(offset).take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message(id: &str, subject: &str) -> IncomingMessage {
        IncomingMessage {
            provider_message_id: id.to_string(),
            subject: subject.to_string(),
            sender: "alice@example.com".to_string(),
            snippet: Some("snippet text".to_string()),
            date: Utc::now(),
            has_attachment: false,
            is_read: false,
        }
    }

    async fn seeded(store: &MemoryStore, ids_subjects: &[(&str, &str)]) {
        let messages = ids_subjects
            .iter()
            .map(|(id, subject)| message(id, subject))
            .collect();
        store.sync_messages("user-1", messages).await.unwrap();
    }

    #[tokio::test]
    async fn sync_is_idempotent_upsert() {
        let store = MemoryStore::new();
        seeded(&store, &[("m-1", "First")]).await;
        let outcome = store
            .sync_messages("user-1", vec![message("m-1", "First updated")])
            .await
            .unwrap();
        assert_eq!(outcome, SyncOutcome { created: 0, updated: 1 });

        let record = store
            .find_by_message_id("user-1", "m-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.subject, "First updated");
        // Workflow fields survive re-sync
        assert_eq!(record.status, WorkflowStatus::Inbox);
        assert_eq!(record.embedding_status, Some(EnrichmentStatus::Pending));
    }

    #[tokio::test]
    async fn update_status_clears_snooze() {
        let store = MemoryStore::new();
        seeded(&store, &[("m-1", "Snooze me")]).await;
        let record = store
            .find_by_message_id("user-1", "m-1")
            .await
            .unwrap()
            .unwrap();

        let snoozed = store
            .update_snooze(&record.id, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(snoozed.status, WorkflowStatus::Snoozed);
        assert!(snoozed.snoozed_until.is_some());

        let returned = store
            .update_status(&record.id, WorkflowStatus::Todo)
            .await
            .unwrap();
        assert_eq!(returned.status, WorkflowStatus::Todo);
        assert!(returned.snoozed_until.is_none());
    }

    #[tokio::test]
    async fn claim_for_embedding_skips_in_flight_rows() {
        let store = MemoryStore::new();
        seeded(&store, &[("m-1", "A"), ("m-2", "B")]).await;
        let ids = vec!["m-1".to_string(), "m-2".to_string()];

        let first = store.claim_for_embedding("user-1", &ids).await.unwrap();
        assert_eq!(first.len(), 2);
        for record in &first {
            assert_eq!(record.embedding_status, Some(EnrichmentStatus::Processing));
        }

        // A second claim while the first is in flight gets nothing.
        let second = store.claim_for_embedding("user-1", &ids).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn batch_update_embeddings_enforces_invariant() {
        let store = MemoryStore::new();
        seeded(&store, &[("m-1", "A"), ("m-2", "B")]).await;
        let claimed = store
            .claim_for_embedding("user-1", &["m-1".to_string(), "m-2".to_string()])
            .await
            .unwrap();

        store
            .batch_update_embeddings(vec![
                EmbeddingUpdate {
                    id: claimed[0].id.clone(),
                    embedding: Some(vec![0.1; 8]),
                    status: EnrichmentStatus::Completed,
                },
                EmbeddingUpdate {
                    id: claimed[1].id.clone(),
                    embedding: None,
                    status: EnrichmentStatus::Failed,
                },
            ])
            .await
            .unwrap();

        let done = store.find_by_id(&claimed[0].id).await.unwrap().unwrap();
        assert_eq!(done.embedding_status, Some(EnrichmentStatus::Completed));
        assert!(done.embedding.is_some());

        let failed = store.find_by_id(&claimed[1].id).await.unwrap().unwrap();
        assert_eq!(failed.embedding_status, Some(EnrichmentStatus::Failed));
        assert!(failed.embedding.is_none());
    }

    #[tokio::test]
    async fn lexical_search_ranks_and_thresholds() {
        let store = MemoryStore::new();
        seeded(
            &store,
            &[
                ("m-1", "meeting notes"),
                ("m-2", "meting notes"),
                ("m-3", "completely unrelated topic"),
            ],
        )
        .await;

        let hits = store
            .search_lexical("user-1", "meeting notes", 10, 0)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        let total = store.count_lexical("user-1", "meeting notes").await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn lexical_substring_catches_short_queries() {
        let store = MemoryStore::new();
        seeded(&store, &[("m-1", "RE: Q3 budget planning meeting")]).await;
        // "q3" scores poorly on trigrams but substring-matches
        let hits = store.search_lexical("user-1", "q3", 10, 0).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn lexical_unsupported_without_trigram() {
        let store = MemoryStore::without_trigram();
        seeded(&store, &[("m-1", "meeting notes")]).await;
        let result = store.search_lexical("user-1", "meeting", 10, 0).await;
        assert!(matches!(result, Err(StoreError::Unsupported(_))));
        let basic = store.search_basic("user-1", "meeting", 10, 0).await.unwrap();
        assert_eq!(basic.len(), 1);
    }

    #[tokio::test]
    async fn semantic_search_orders_by_similarity() {
        let store = MemoryStore::new();
        seeded(&store, &[("m-1", "A"), ("m-2", "B"), ("m-3", "C")]).await;
        let claimed = store
            .claim_for_embedding(
                "user-1",
                &["m-1".to_string(), "m-2".to_string(), "m-3".to_string()],
            )
            .await
            .unwrap();

        // m-1 aligned with the query axis, m-2 orthogonal, m-3 left FAILED
        store
            .batch_update_embeddings(vec![
                EmbeddingUpdate {
                    id: claimed[0].id.clone(),
                    embedding: Some(vec![1.0, 0.0]),
                    status: EnrichmentStatus::Completed,
                },
                EmbeddingUpdate {
                    id: claimed[1].id.clone(),
                    embedding: Some(vec![0.0, 1.0]),
                    status: EnrichmentStatus::Completed,
                },
                EmbeddingUpdate {
                    id: claimed[2].id.clone(),
                    embedding: None,
                    status: EnrichmentStatus::Failed,
                },
            ])
            .await
            .unwrap();

        assert_eq!(store.count_embedded("user-1").await.unwrap(), 2);

        let hits = store
            .search_semantic("user-1", &[1.0, 0.0], 10, 0)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, claimed[0].id);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert!(hits[1].score.abs() < 1e-5);
    }

    #[tokio::test]
    async fn find_snoozed_due_ignores_future_wakes() {
        let store = MemoryStore::new();
        seeded(&store, &[("m-1", "Due"), ("m-2", "Not due")]).await;
        let due = store
            .find_by_message_id("user-1", "m-1")
            .await
            .unwrap()
            .unwrap();
        let not_due = store
            .find_by_message_id("user-1", "m-2")
            .await
            .unwrap()
            .unwrap();
        let now = Utc::now();
        store
            .update_snooze(&due.id, now - Duration::seconds(1))
            .await
            .unwrap();
        store
            .update_snooze(&not_due.id, now + Duration::hours(1))
            .await
            .unwrap();

        let found = store.find_snoozed_due(now).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, due.id);
    }

    #[tokio::test]
    async fn list_by_status_filters_and_sorts() {
        let store = MemoryStore::new();
        let mut older = message("m-1", "Older unread");
        older.date = Utc::now() - Duration::days(2);
        let mut newer = message("m-2", "Newer read");
        newer.is_read = true;
        newer.has_attachment = true;
        store
            .sync_messages("user-1", vec![older, newer])
            .await
            .unwrap();

        let unread = store
            .list_by_status(
                "user-1",
                WorkflowStatus::Inbox,
                &ListOptions {
                    unread_only: true,
                    ..Default::default()
                },
                10,
                0,
            )
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].subject, "Older unread");

        let oldest_first = store
            .list_by_status(
                "user-1",
                WorkflowStatus::Inbox,
                &ListOptions {
                    sort_by: Some(SortOrder::DateOldest),
                    ..Default::default()
                },
                10,
                0,
            )
            .await
            .unwrap();
        assert_eq!(oldest_first[0].subject, "Older unread");
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = MemoryStore::new();
        store
            .sync_messages("user-1", vec![message("m-1", "Mine")])
            .await
            .unwrap();
        store
            .sync_messages("user-2", vec![message("m-1", "Theirs")])
            .await
            .unwrap();

        let mine = store
            .find_by_message_id("user-1", "m-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mine.subject, "Mine");
        let count = store
            .count_by_status("user-2", WorkflowStatus::Inbox, &ListOptions::default())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
