//! Workflow and enrichment status enums.
//!
//! Both enums serialize to fixed SCREAMING_SNAKE_CASE strings. These strings
//! are persisted by existing deployments, so the wire form must not change.

use serde::{Deserialize, Serialize};

/// Per-email workflow state.
///
/// Transitions are unrestricted point-to-point, except that entering
/// `Snoozed` requires a `snoozed_until` timestamp and leaving it clears
/// the timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// Newly synced, not yet triaged
    #[default]
    Inbox,
    /// Marked as actionable
    Todo,
    /// Being worked on
    InProgress,
    /// Completed
    Done,
    /// Hidden until `snoozed_until`
    Snoozed,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Inbox => write!(f, "INBOX"),
            WorkflowStatus::Todo => write!(f, "TODO"),
            WorkflowStatus::InProgress => write!(f, "IN_PROGRESS"),
            WorkflowStatus::Done => write!(f, "DONE"),
            WorkflowStatus::Snoozed => write!(f, "SNOOZED"),
        }
    }
}

/// Lifecycle of an AI enrichment field (embedding or summary).
///
/// Legal moves: Pending -> Processing -> {Completed, Failed}. Failed rows may
/// be claimed back to Processing by an explicit re-trigger, but never drop
/// back to Pending while a job is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrichmentStatus {
    /// Waiting to be picked up by a worker
    Pending,
    /// Claimed by an in-flight job
    Processing,
    /// Enrichment persisted
    Completed,
    /// Provider returned nothing for this record
    Failed,
}

impl EnrichmentStatus {
    /// Whether a job may still claim this record.
    pub fn is_claimable(self) -> bool {
        matches!(self, EnrichmentStatus::Pending)
    }

    /// Whether this state ends the enrichment lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, EnrichmentStatus::Completed | EnrichmentStatus::Failed)
    }
}

impl std::fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrichmentStatus::Pending => write!(f, "PENDING"),
            EnrichmentStatus::Processing => write!(f, "PROCESSING"),
            EnrichmentStatus::Completed => write!(f, "COMPLETED"),
            EnrichmentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_status_wire_strings() {
        assert_eq!(
            serde_json::to_string(&WorkflowStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(
            serde_json::to_string(&WorkflowStatus::Inbox).unwrap(),
            "\"INBOX\""
        );
        let status: WorkflowStatus = serde_json::from_str("\"SNOOZED\"").unwrap();
        assert_eq!(status, WorkflowStatus::Snoozed);
    }

    #[test]
    fn enrichment_status_wire_strings() {
        for (status, wire) in [
            (EnrichmentStatus::Pending, "\"PENDING\""),
            (EnrichmentStatus::Processing, "\"PROCESSING\""),
            (EnrichmentStatus::Completed, "\"COMPLETED\""),
            (EnrichmentStatus::Failed, "\"FAILED\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), wire);
        }
    }

    #[test]
    fn claimable_states() {
        assert!(EnrichmentStatus::Pending.is_claimable());
        assert!(!EnrichmentStatus::Processing.is_claimable());
        assert!(!EnrichmentStatus::Completed.is_claimable());
        assert!(!EnrichmentStatus::Failed.is_claimable());
    }

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(WorkflowStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!(EnrichmentStatus::Processing.to_string(), "PROCESSING");
    }
}
