//! # mailflow-workflow
//!
//! User-driven workflow operations on email records (status transitions,
//! snoozing, priority, deadlines, listings) plus the background sweeper
//! that returns expired snoozes to the inbox.

mod error;
mod service;
mod sweeper;

pub use error::WorkflowError;
pub use service::WorkflowService;
pub use sweeper::{AutoReturnSweeper, SweepStats, AUTO_RETURN_INTERVAL};
