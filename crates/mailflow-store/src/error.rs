//! Store error types.

use thiserror::Error;

/// Errors surfaced by `EmailRecordStore` implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record id does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The backend lacks a capability (e.g. trigram similarity)
    #[error("Store capability unavailable: {0}")]
    Unsupported(String),

    /// Malformed caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend failure
    #[error("Store error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::NotFound("wf-123".to_string());
        assert!(err.to_string().contains("wf-123"));

        let err = StoreError::Unsupported("trigram similarity".to_string());
        assert!(err.to_string().contains("capability unavailable"));
    }
}
