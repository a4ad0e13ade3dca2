//! Enrichment provider trait.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::ProviderError;

/// One email handed to batch summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryInput {
    /// Caller-side key the result map is keyed on
    pub id: String,
    pub subject: String,
    pub body: String,
}

/// Summary plus urgency score for one email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub summary: String,
    /// Urgency in [0, 1]
    pub urgency_score: f32,
}

/// Opaque capability turning text into embeddings and emails into
/// summaries. Rate-limited and fallible per item: batch calls may succeed
/// as a whole while individual items come back empty.
///
/// Implementations must be thread-safe (Send + Sync) for concurrent use.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError>;

    /// Generate embeddings for a batch of texts. The result has one slot
    /// per input; `None` marks an item the provider could not embed.
    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<Option<Embedding>>, ProviderError>;

    /// Summarize one email.
    async fn summarize(&self, subject: &str, body: &str) -> Result<SummaryOutput, ProviderError>;

    /// Summarize a batch of emails, keyed by the caller-supplied id.
    /// Items the provider failed on are simply absent from the map.
    async fn summarize_batch(
        &self,
        items: &[SummaryInput],
    ) -> Result<HashMap<String, SummaryOutput>, ProviderError>;
}
