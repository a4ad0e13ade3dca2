//! Workflow error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record {0} does not belong to the requesting user")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store error: {0}")]
    Store(#[from] mailflow_store::StoreError),
}
