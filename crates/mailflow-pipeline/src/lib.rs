//! Enrichment pipeline: dispatch of pending work onto the job queues and
//! the workers that claim, call the provider, and write results back.

pub mod dispatcher;
pub mod embedding_worker;
pub mod error;
pub mod summary_worker;

pub use dispatcher::{DispatchOutcome, EnrichmentDispatcher, EMBEDDING_BATCH_SIZE};
pub use embedding_worker::EmbeddingWorker;
pub use error::PipelineError;
pub use summary_worker::SummaryWorker;
