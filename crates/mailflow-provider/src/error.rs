//! Provider error types.

use thiserror::Error;

/// Errors that can occur talking to the enrichment provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// API request failed
    #[error("API request failed: {0}")]
    Api(String),

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Timeout waiting for response
    #[error("Timeout waiting for response")]
    Timeout,

    /// Empty input
    #[error("No input to process")]
    EmptyInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProviderError::Api("503 upstream".to_string());
        assert!(err.to_string().contains("503 upstream"));

        assert!(ProviderError::RateLimitExceeded
            .to_string()
            .contains("Rate limit"));
    }
}
