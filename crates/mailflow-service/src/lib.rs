//! # mailflow-service
//!
//! The top-level facade. `Mailflow` owns the wiring: it takes a record
//! store and an optional enrichment provider, builds the job queues,
//! workers, search engine, workflow service, and sweeper, and exposes the
//! system's operations as plain async methods. Without a provider the
//! system still syncs, lists, searches (fuzzy only), and sweeps; only
//! enrichment is disabled.

mod config;
mod error;
mod facade;

pub use config::MailflowConfig;
pub use error::ServiceError;
pub use facade::{EnrichmentQueueStats, Mailflow};
