//! Queue error types.

use thiserror::Error;

/// Errors that can occur during queue lifecycle operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Queue workers are already started
    #[error("Queue is already running")]
    AlreadyRunning,

    /// Queue has been shut down
    #[error("Queue is shutting down")]
    ShuttingDown,
}
