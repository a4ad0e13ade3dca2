//! The search engine and its degradation chain.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mailflow_provider::EnrichmentProvider;
use mailflow_store::{EmailRecordStore, ScoredId};
use mailflow_types::{EmailWorkflowRecord, Page};

use crate::error::SearchError;

/// One search result. `relevance` is set by the lexical mode, `similarity`
/// by the semantic mode; the basic fallback sets neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub record: EmailWorkflowRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

/// Searches email workflow records through the store's index-side queries.
///
/// Index queries return scored ids only; the engine fetches full rows by
/// primary key afterwards and re-applies the score order, since batch
/// lookups return rows in arbitrary order.
pub struct SearchEngine {
    store: Arc<dyn EmailRecordStore>,
    provider: Option<Arc<dyn EnrichmentProvider>>,
}

impl SearchEngine {
    pub fn new(
        store: Arc<dyn EmailRecordStore>,
        provider: Option<Arc<dyn EnrichmentProvider>>,
    ) -> Self {
        Self { store, provider }
    }

    /// Lexical-similarity search, falling back to basic substring matching
    /// when the store has no similarity capability or the query errors.
    pub async fn search_fuzzy(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<SearchHit>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Page::empty(limit, offset));
        }

        match self.lexical(user_id, query, limit, offset).await {
            Ok(page) => Ok(page),
            Err(e) => {
                warn!(user_id, error = %e, "Lexical search unavailable, using basic matching");
                self.basic(user_id, query, limit, offset).await
            }
        }
    }

    /// Semantic search over completed embeddings, falling back to
    /// `search_fuzzy` when no provider is configured or the vector path
    /// errors anywhere.
    pub async fn search_semantic(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<SearchHit>, SearchError> {
        if query.trim().is_empty() {
            return Ok(Page::empty(limit, offset));
        }
        let Some(provider) = &self.provider else {
            debug!(user_id, "No enrichment provider, semantic search degrades to fuzzy");
            return self.search_fuzzy(user_id, query, limit, offset).await;
        };

        match self.semantic(user_id, provider, query, limit, offset).await {
            Ok(page) => Ok(page),
            Err(e) => {
                warn!(user_id, error = %e, "Semantic search failed, falling back to fuzzy");
                self.search_fuzzy(user_id, query, limit, offset).await
            }
        }
    }

    async fn lexical(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<SearchHit>, SearchError> {
        let scored = self.store.search_lexical(user_id, query, limit, offset).await?;
        let total = self.store.count_lexical(user_id, query).await?;
        let hits = self
            .hydrate(user_id, &scored, |record, score| SearchHit {
                record,
                relevance: Some(score),
                similarity: None,
            })
            .await?;
        Ok(Page::new(hits, total, limit, offset))
    }

    async fn basic(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<SearchHit>, SearchError> {
        let records = self.store.search_basic(user_id, query, limit, offset).await?;
        let total = self.store.count_basic(user_id, query).await?;
        let hits = records
            .into_iter()
            .map(|record| SearchHit {
                record,
                relevance: None,
                similarity: None,
            })
            .collect();
        Ok(Page::new(hits, total, limit, offset))
    }

    async fn semantic(
        &self,
        user_id: &str,
        provider: &Arc<dyn EnrichmentProvider>,
        query: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Page<SearchHit>, SearchError> {
        let query_embedding = provider.embed(query).await?;

        // Cheap count first: with nothing embedded there is nothing to rank.
        let total = self.store.count_embedded(user_id).await?;
        if total == 0 {
            debug!(user_id, "No completed embeddings, semantic search is empty");
            return Ok(Page::empty(limit, offset));
        }

        let scored = self
            .store
            .search_semantic(user_id, query_embedding.as_slice(), limit, offset)
            .await?;
        let hits = self
            .hydrate(user_id, &scored, |record, score| SearchHit {
                record,
                relevance: None,
                similarity: Some(score),
            })
            .await?;
        Ok(Page::new(hits, total, limit, offset))
    }

    /// Fetch full rows for scored ids and rebuild the score order.
    async fn hydrate(
        &self,
        user_id: &str,
        scored: &[ScoredId],
        make_hit: impl Fn(EmailWorkflowRecord, f32) -> SearchHit,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if scored.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = scored.iter().map(|s| s.id.clone()).collect();
        let mut by_id: HashMap<String, EmailWorkflowRecord> = self
            .store
            .find_by_ids(user_id, &ids)
            .await?
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        Ok(scored
            .iter()
            .filter_map(|s| by_id.remove(&s.id).map(|record| make_hit(record, s.score)))
            .collect())
    }
}
