//! Search error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("store error: {0}")]
    Store(#[from] mailflow_store::StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] mailflow_provider::ProviderError),
}
