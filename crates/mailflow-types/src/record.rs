//! The central email workflow entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{EnrichmentStatus, WorkflowStatus};

/// Fixed embedding dimension for the enrichment provider.
pub const EMBEDDING_DIMENSION: usize = 768;

/// Placeholder written when summarization fails for a record.
///
/// Kept verbatim for compatibility with rows written by earlier deployments,
/// where this string doubled as the "needs reprocessing" marker.
pub const SUMMARY_FAILED_SENTINEL: &str = "AI summarization failed";

/// Legacy placeholder meaning a summary was in flight when the row was written.
pub const SUMMARY_PROCESSING_SENTINEL: &str = "being processed";

/// A message snapshot as delivered by the mail provider sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Provider-assigned message id, unique per user
    pub provider_message_id: String,
    pub subject: String,
    pub sender: String,
    pub snippet: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub has_attachment: bool,
    #[serde(default)]
    pub is_read: bool,
}

/// Per-email workflow record.
///
/// Created on first sync with `status = Inbox` and
/// `embedding_status = Pending`; mutated by user-driven workflow updates,
/// the enrichment workers, and the auto-return sweeper. Never hard-deleted
/// by this system.
///
/// Invariants:
/// - `(user_id, provider_message_id)` is unique; create is an upsert on it.
/// - `embedding` is non-null iff `embedding_status == Completed`.
/// - `status == Snoozed` iff `snoozed_until` is non-null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailWorkflowRecord {
    /// Store-assigned id (ULID string)
    pub id: String,
    pub user_id: String,
    /// Provider-assigned message id, unique per user
    pub provider_message_id: String,

    // Content snapshot
    pub subject: String,
    pub sender: String,
    pub snippet: Option<String>,
    pub date: DateTime<Utc>,
    pub has_attachment: bool,
    pub is_read: bool,

    // Workflow fields
    pub status: WorkflowStatus,
    pub priority: i32,
    pub deadline: Option<DateTime<Utc>>,
    pub snoozed_until: Option<DateTime<Utc>>,

    // Enrichment fields
    pub ai_summary: Option<String>,
    /// Urgency in [0, 1]
    pub urgency_score: Option<f32>,
    pub summary_status: Option<EnrichmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub embedding_status: Option<EnrichmentStatus>,

    // Audit
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmailWorkflowRecord {
    /// Create a record from a synced message with initial workflow state.
    pub fn from_message(id: String, user_id: String, message: IncomingMessage) -> Self {
        let now = Utc::now();
        let subject = if message.subject.trim().is_empty() {
            "(No Subject)".to_string()
        } else {
            message.subject
        };
        let sender = if message.sender.trim().is_empty() {
            "unknown@example.com".to_string()
        } else {
            message.sender
        };
        Self {
            id,
            user_id,
            provider_message_id: message.provider_message_id,
            subject,
            sender,
            snippet: message.snippet,
            date: message.date,
            has_attachment: message.has_attachment,
            is_read: message.is_read,
            status: WorkflowStatus::Inbox,
            priority: 0,
            deadline: None,
            snoozed_until: None,
            ai_summary: None,
            urgency_score: None,
            summary_status: Some(EnrichmentStatus::Pending),
            embedding: None,
            embedding_status: Some(EnrichmentStatus::Pending),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this record should be enqueued for embedding generation.
    ///
    /// Processing and Completed rows are excluded so a concurrent dispatch
    /// never re-enqueues in-flight work.
    pub fn needs_embedding(&self) -> bool {
        self.embedding.is_none()
            && self
                .embedding_status
                .map_or(true, EnrichmentStatus::is_claimable)
    }

    /// Whether this record should be enqueued for summarization.
    ///
    /// `summary_status` is authoritative. Rows without one (written by
    /// earlier deployments) fall back to the sentinel-string check.
    pub fn needs_summary(&self) -> bool {
        match self.summary_status {
            Some(EnrichmentStatus::Processing) | Some(EnrichmentStatus::Completed) => false,
            Some(EnrichmentStatus::Pending) | Some(EnrichmentStatus::Failed) => true,
            None => match self.ai_summary.as_deref() {
                None => true,
                Some(summary) => {
                    let summary = summary.trim();
                    summary.is_empty()
                        || summary.contains(SUMMARY_FAILED_SENTINEL)
                        || summary.contains(SUMMARY_PROCESSING_SENTINEL)
                }
            },
        }
    }

    /// Text handed to the embedding provider: non-empty content fields
    /// joined with spaces.
    pub fn embedding_text(&self) -> String {
        [
            Some(self.subject.as_str()),
            Some(self.sender.as_str()),
            self.snippet.as_deref(),
            self.ai_summary.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str) -> IncomingMessage {
        IncomingMessage {
            provider_message_id: id.to_string(),
            subject: "Quarterly report".to_string(),
            sender: "alice@example.com".to_string(),
            snippet: Some("Please review the attached draft".to_string()),
            date: Utc::now(),
            has_attachment: true,
            is_read: false,
        }
    }

    #[test]
    fn from_message_initial_state() {
        let record =
            EmailWorkflowRecord::from_message("01ABC".into(), "user-1".into(), message("m-1"));
        assert_eq!(record.status, WorkflowStatus::Inbox);
        assert_eq!(record.embedding_status, Some(EnrichmentStatus::Pending));
        assert!(record.embedding.is_none());
        assert!(record.snoozed_until.is_none());
        assert_eq!(record.priority, 0);
    }

    #[test]
    fn from_message_fills_blank_subject_and_sender() {
        let mut msg = message("m-2");
        msg.subject = "   ".to_string();
        msg.sender = String::new();
        let record = EmailWorkflowRecord::from_message("01ABD".into(), "user-1".into(), msg);
        assert_eq!(record.subject, "(No Subject)");
        assert_eq!(record.sender, "unknown@example.com");
    }

    #[test]
    fn needs_embedding_excludes_in_flight_and_done() {
        let mut record =
            EmailWorkflowRecord::from_message("01ABE".into(), "user-1".into(), message("m-3"));
        assert!(record.needs_embedding());

        record.embedding_status = None;
        assert!(record.needs_embedding());

        record.embedding_status = Some(EnrichmentStatus::Processing);
        assert!(!record.needs_embedding());

        record.embedding_status = Some(EnrichmentStatus::Completed);
        record.embedding = Some(vec![0.0; EMBEDDING_DIMENSION]);
        assert!(!record.needs_embedding());

        record.embedding = None;
        record.embedding_status = Some(EnrichmentStatus::Failed);
        assert!(!record.needs_embedding());
    }

    #[test]
    fn needs_summary_uses_status_when_present() {
        let mut record =
            EmailWorkflowRecord::from_message("01ABF".into(), "user-1".into(), message("m-4"));
        assert!(record.needs_summary());

        record.summary_status = Some(EnrichmentStatus::Processing);
        assert!(!record.needs_summary());

        record.summary_status = Some(EnrichmentStatus::Completed);
        record.ai_summary = Some("Budget approval needed by Friday".to_string());
        assert!(!record.needs_summary());

        record.summary_status = Some(EnrichmentStatus::Failed);
        assert!(record.needs_summary());
    }

    #[test]
    fn needs_summary_legacy_sentinel_rows() {
        let mut record =
            EmailWorkflowRecord::from_message("01ABG".into(), "user-1".into(), message("m-5"));
        record.summary_status = None;

        record.ai_summary = None;
        assert!(record.needs_summary());

        record.ai_summary = Some("  ".to_string());
        assert!(record.needs_summary());

        record.ai_summary = Some(SUMMARY_FAILED_SENTINEL.to_string());
        assert!(record.needs_summary());

        record.ai_summary = Some("This email is being processed".to_string());
        assert!(record.needs_summary());

        record.ai_summary = Some("Team offsite moved to Thursday".to_string());
        assert!(!record.needs_summary());
    }

    #[test]
    fn embedding_text_skips_empty_parts() {
        let mut record =
            EmailWorkflowRecord::from_message("01ABH".into(), "user-1".into(), message("m-6"));
        record.snippet = Some(String::new());
        record.ai_summary = Some("Review requested".to_string());
        assert_eq!(
            record.embedding_text(),
            "Quarterly report alice@example.com Review requested"
        );
    }
}
