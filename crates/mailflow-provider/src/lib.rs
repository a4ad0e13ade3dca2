//! # mailflow-provider
//!
//! The `EnrichmentProvider` capability: text to embedding, email to
//! summary plus urgency score. The provider is opaque, rate-limited, and
//! fallible per item; `ApiProvider` talks to an OpenAI-compatible endpoint
//! and `MockProvider` drives tests.

mod api;
mod embedding;
mod error;
mod mock;
mod provider;

pub use api::{ApiProvider, ApiProviderConfig};
pub use embedding::Embedding;
pub use error::ProviderError;
pub use mock::MockProvider;
pub use provider::{EnrichmentProvider, SummaryInput, SummaryOutput};
