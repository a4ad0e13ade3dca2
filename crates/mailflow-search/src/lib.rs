//! # mailflow-search
//!
//! Hybrid search over email workflow records: a lexical-similarity mode
//! with a basic substring fallback, and a semantic mode over completed
//! embeddings that degrades to the lexical mode whenever the vector path
//! cannot answer. Searches never hard-fail because one capability is
//! missing: every degradation falls through to the next mode.

mod engine;
mod error;

pub use engine::{SearchEngine, SearchHit};
pub use error::SearchError;
