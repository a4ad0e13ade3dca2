//! Service error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("store error: {0}")]
    Store(#[from] mailflow_store::StoreError),

    #[error("queue error: {0}")]
    Queue(#[from] mailflow_queue::QueueError),

    #[error("workflow error: {0}")]
    Workflow(#[from] mailflow_workflow::WorkflowError),

    #[error("search error: {0}")]
    Search(#[from] mailflow_search::SearchError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] mailflow_pipeline::PipelineError),

    #[error("service already started")]
    AlreadyStarted,
}
