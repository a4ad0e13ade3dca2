//! Scriptable mock provider for tests.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use mailflow_types::EMBEDDING_DIMENSION;

use crate::embedding::Embedding;
use crate::error::ProviderError;
use crate::provider::{EnrichmentProvider, SummaryInput, SummaryOutput};

/// Deterministic mock `EnrichmentProvider`.
///
/// Embeddings are derived from a hash of the input text, so equal texts get
/// equal vectors and different texts diverge. Failures are scriptable at
/// two levels, matching the real provider's failure modes: whole-call
/// (`fail_all`) and per-item (`fail_on` substring match).
pub struct MockProvider {
    dimension: usize,
    fail_all: AtomicBool,
    fail_markers: Mutex<HashSet<String>>,
    embed_calls: AtomicUsize,
    summary_calls: AtomicUsize,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_dimension(EMBEDDING_DIMENSION)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            fail_all: AtomicBool::new(false),
            fail_markers: Mutex::new(HashSet::new()),
            embed_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
        }
    }

    /// Make every provider call return an error (transient outage).
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Fail individual items whose text or id contains `marker`.
    pub fn fail_on(&self, marker: impl Into<String>) {
        self.fail_markers
            .lock()
            .expect("fail_markers lock poisoned")
            .insert(marker.into());
    }

    /// Number of embedding calls made (single or batch).
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Number of summary calls made (single or batch).
    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    fn is_marked(&self, text: &str) -> bool {
        self.fail_markers
            .lock()
            .expect("fail_markers lock poisoned")
            .iter()
            .any(|marker| text.contains(marker))
    }

    fn check_outage(&self) -> Result<(), ProviderError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(ProviderError::Api("mock provider outage".to_string()));
        }
        Ok(())
    }

    fn vector_for(&self, text: &str) -> Embedding {
        let mut values = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            // Map the hash to [-1, 1]
            let raw = (hasher.finish() % 2000) as f32 / 1000.0 - 1.0;
            values.push(raw);
        }
        Embedding::new(values)
    }
}

#[async_trait]
impl EnrichmentProvider for MockProvider {
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.check_outage()?;
        if self.is_marked(text) {
            return Err(ProviderError::Api(format!("mock failure for: {text}")));
        }
        Ok(self.vector_for(text))
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<Option<Embedding>>, ProviderError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.check_outage()?;
        Ok(texts
            .iter()
            .map(|text| {
                if self.is_marked(text) {
                    None
                } else {
                    Some(self.vector_for(text))
                }
            })
            .collect())
    }

    async fn summarize(&self, subject: &str, _body: &str) -> Result<SummaryOutput, ProviderError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.check_outage()?;
        if self.is_marked(subject) {
            return Err(ProviderError::Api(format!("mock failure for: {subject}")));
        }
        Ok(SummaryOutput {
            summary: format!("Summary of: {subject}"),
            urgency_score: 0.7,
        })
    }

    async fn summarize_batch(
        &self,
        items: &[SummaryInput],
    ) -> Result<HashMap<String, SummaryOutput>, ProviderError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.check_outage()?;
        Ok(items
            .iter()
            .filter(|item| !self.is_marked(&item.id) && !self.is_marked(&item.subject))
            .map(|item| {
                (
                    item.id.clone(),
                    SummaryOutput {
                        summary: format!("Summary of: {}", item.subject),
                        urgency_score: 0.7,
                    },
                )
            })
            .collect())
    }
}
