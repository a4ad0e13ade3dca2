//! Enrichment job types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of enrichment work a job carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Embedding,
    Summary,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Embedding => write!(f, "embedding"),
            JobKind::Summary => write!(f, "summary"),
        }
    }
}

/// Transient unit of enrichment work.
///
/// Jobs are not persisted beyond the queue's own retention; idempotency
/// is enforced by re-checking record status at consumption time, not by
/// job deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentJob {
    pub id: Uuid,
    pub kind: JobKind,
    pub user_id: String,
    /// Provider message ids covered by this batch
    pub email_ids: Vec<String>,
    pub enqueued_at: DateTime<Utc>,
    /// Retries already consumed
    pub attempts: u32,
}

impl EnrichmentJob {
    pub fn new(kind: JobKind, user_id: impl Into<String>, email_ids: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            user_id: user_id.into(),
            email_ids,
            enqueued_at: Utc::now(),
            attempts: 0,
        }
    }
}
