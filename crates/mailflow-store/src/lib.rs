//! # mailflow-store
//!
//! The `EmailRecordStore` capability contract plus `MemoryStore`, an
//! in-process reference implementation.
//!
//! The store is consumed as a capability: callers depend on the trait, and
//! any backend that can answer the same primitives (key-value lookups,
//! status-scoped listings, a lexical-similarity query, and a
//! vector-distance query) can stand behind it. `MemoryStore` answers them
//! with an in-memory map, a trigram similarity function, and brute-force
//! cosine distance, which is enough for tests and single-process
//! deployments.

mod error;
mod memory;
mod store;
mod trigram;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{
    EmailRecordStore, EmbeddingUpdate, ScoredId, SummaryUpdate, SyncOutcome,
};
pub use trigram::similarity;
