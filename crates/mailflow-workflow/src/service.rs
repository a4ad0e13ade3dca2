//! User-driven workflow operations, ownership-checked.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use mailflow_store::EmailRecordStore;
use mailflow_types::{EmailWorkflowRecord, ListOptions, Page, WorkflowStatus};

use crate::error::WorkflowError;

/// Workflow mutations and listings over the record store.
///
/// Every by-id operation verifies the record belongs to the requesting
/// user before touching it; cross-user access is `Forbidden`, never a
/// silent no-op.
pub struct WorkflowService {
    store: Arc<dyn EmailRecordStore>,
}

impl WorkflowService {
    pub fn new(store: Arc<dyn EmailRecordStore>) -> Self {
        Self { store }
    }

    /// Move a record to a new workflow status. Moving away from `Snoozed`
    /// clears the wake timestamp; moving *to* `Snoozed` must go through
    /// [`snooze`](Self::snooze) because the timestamp is mandatory.
    pub async fn set_status(
        &self,
        user_id: &str,
        id: &str,
        status: WorkflowStatus,
    ) -> Result<EmailWorkflowRecord, WorkflowError> {
        if status == WorkflowStatus::Snoozed {
            return Err(WorkflowError::InvalidInput(
                "snoozing requires a wake timestamp".to_string(),
            ));
        }
        self.check_ownership(user_id, id).await?;
        let record = self.store.update_status(id, status).await?;
        info!(user_id, record_id = id, status = %status, "Status updated");
        Ok(record)
    }

    /// Snooze a record until `snoozed_until`. Status and timestamp are set
    /// together so the pair stays consistent.
    pub async fn snooze(
        &self,
        user_id: &str,
        id: &str,
        snoozed_until: DateTime<Utc>,
    ) -> Result<EmailWorkflowRecord, WorkflowError> {
        self.check_ownership(user_id, id).await?;
        let record = self.store.update_snooze(id, snoozed_until).await?;
        info!(user_id, record_id = id, until = %snoozed_until, "Record snoozed");
        Ok(record)
    }

    pub async fn set_priority(
        &self,
        user_id: &str,
        id: &str,
        priority: i32,
    ) -> Result<EmailWorkflowRecord, WorkflowError> {
        self.check_ownership(user_id, id).await?;
        Ok(self.store.update_priority(id, priority).await?)
    }

    pub async fn set_deadline(
        &self,
        user_id: &str,
        id: &str,
        deadline: DateTime<Utc>,
    ) -> Result<EmailWorkflowRecord, WorkflowError> {
        self.check_ownership(user_id, id).await?;
        Ok(self.store.update_deadline(id, deadline).await?)
    }

    /// One page of the user's records in `status`.
    pub async fn list(
        &self,
        user_id: &str,
        status: WorkflowStatus,
        options: &ListOptions,
        limit: usize,
        offset: usize,
    ) -> Result<Page<EmailWorkflowRecord>, WorkflowError> {
        let items = self
            .store
            .list_by_status(user_id, status, options, limit, offset)
            .await?;
        let total = self.store.count_by_status(user_id, status, options).await?;
        Ok(Page::new(items, total, limit, offset))
    }

    /// Records past their deadline and not yet done.
    pub async fn find_overdue(
        &self,
        user_id: &str,
    ) -> Result<Vec<EmailWorkflowRecord>, WorkflowError> {
        Ok(self.store.find_overdue(user_id).await?)
    }

    async fn check_ownership(&self, user_id: &str, id: &str) -> Result<(), WorkflowError> {
        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;
        if record.user_id != user_id {
            return Err(WorkflowError::Forbidden(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mailflow_store::MemoryStore;
    use mailflow_types::IncomingMessage;
    use pretty_assertions::assert_eq;

    fn message(id: &str) -> IncomingMessage {
        IncomingMessage {
            provider_message_id: id.to_string(),
            subject: format!("Subject {id}"),
            sender: "alice@example.com".to_string(),
            snippet: None,
            date: Utc::now(),
            has_attachment: false,
            is_read: false,
        }
    }

    async fn setup() -> (Arc<MemoryStore>, WorkflowService, String) {
        let store = Arc::new(MemoryStore::new());
        store
            .sync_messages("user-1", vec![message("m-1")])
            .await
            .unwrap();
        let id = store
            .find_by_message_id("user-1", "m-1")
            .await
            .unwrap()
            .unwrap()
            .id;
        let service = WorkflowService::new(store.clone());
        (store, service, id)
    }

    #[tokio::test]
    async fn status_transitions_and_snooze_clearing() {
        let (_store, service, id) = setup().await;

        let record = service
            .set_status("user-1", &id, WorkflowStatus::Todo)
            .await
            .unwrap();
        assert_eq!(record.status, WorkflowStatus::Todo);

        let snoozed = service
            .snooze("user-1", &id, Utc::now() + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(snoozed.status, WorkflowStatus::Snoozed);
        assert!(snoozed.snoozed_until.is_some());

        let done = service
            .set_status("user-1", &id, WorkflowStatus::Done)
            .await
            .unwrap();
        assert_eq!(done.status, WorkflowStatus::Done);
        assert!(done.snoozed_until.is_none());
    }

    #[tokio::test]
    async fn snoozed_status_requires_timestamp() {
        let (_store, service, id) = setup().await;
        let result = service
            .set_status("user-1", &id, WorkflowStatus::Snoozed)
            .await;
        assert!(matches!(result, Err(WorkflowError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn cross_user_access_is_forbidden() {
        let (_store, service, id) = setup().await;
        let result = service
            .set_status("user-2", &id, WorkflowStatus::Todo)
            .await;
        assert!(matches!(result, Err(WorkflowError::Forbidden(_))));

        let result = service.set_priority("user-2", &id, 5).await;
        assert!(matches!(result, Err(WorkflowError::Forbidden(_))));
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let (_store, service, _id) = setup().await;
        let result = service
            .set_status("user-1", "no-such-id", WorkflowStatus::Todo)
            .await;
        assert!(matches!(result, Err(WorkflowError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_pages_with_totals() {
        let store = Arc::new(MemoryStore::new());
        let messages = (1..=5).map(|n| message(&format!("m-{n}"))).collect();
        store.sync_messages("user-1", messages).await.unwrap();
        let service = WorkflowService::new(store);

        let page = service
            .list(
                "user-1",
                WorkflowStatus::Inbox,
                &ListOptions::default(),
                2,
                0,
            )
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 5);
        assert!(page.has_more());
    }

    #[tokio::test]
    async fn overdue_excludes_done_records() {
        let (store, service, id) = setup().await;
        store
            .sync_messages("user-1", vec![message("m-2")])
            .await
            .unwrap();
        let done_id = store
            .find_by_message_id("user-1", "m-2")
            .await
            .unwrap()
            .unwrap()
            .id;

        let past = Utc::now() - Duration::hours(1);
        service.set_deadline("user-1", &id, past).await.unwrap();
        service.set_deadline("user-1", &done_id, past).await.unwrap();
        service
            .set_status("user-1", &done_id, WorkflowStatus::Done)
            .await
            .unwrap();

        let overdue = service.find_overdue("user-1").await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, id);
    }
}
