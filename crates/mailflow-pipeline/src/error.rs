//! Pipeline error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] mailflow_store::StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] mailflow_provider::ProviderError),

    #[error("queue error: {0}")]
    Queue(#[from] mailflow_queue::QueueError),
}
