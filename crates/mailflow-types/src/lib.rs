//! # mailflow-types
//!
//! Shared domain types for the Mailflow system.
//!
//! This crate defines the core data structures used throughout the system:
//! - `EmailWorkflowRecord`: the central per-email workflow entity
//! - `WorkflowStatus` / `EnrichmentStatus`: state enums with fixed wire strings
//! - `Page` / `ListOptions`: pagination and listing parameters

mod page;
mod record;
mod status;

pub use page::{ListOptions, Page, SortOrder};
pub use record::{
    EmailWorkflowRecord, IncomingMessage, EMBEDDING_DIMENSION, SUMMARY_FAILED_SENTINEL,
    SUMMARY_PROCESSING_SENTINEL,
};
pub use status::{EnrichmentStatus, WorkflowStatus};
