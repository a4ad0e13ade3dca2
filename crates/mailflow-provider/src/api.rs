//! HTTP-backed provider using OpenAI-compatible endpoints.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use mailflow_types::EMBEDDING_DIMENSION;

use crate::embedding::Embedding;
use crate::error::ProviderError;
use crate::provider::{EnrichmentProvider, SummaryInput, SummaryOutput};

/// Configuration for the HTTP provider.
#[derive(Debug, Clone)]
pub struct ApiProviderConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// Embedding model (e.g., "text-embedding-3-small")
    pub embedding_model: String,

    /// Chat model used for summarization (e.g., "gpt-4o-mini")
    pub summary_model: String,

    /// API key
    pub api_key: SecretString,

    /// Request timeout
    pub timeout: Duration,

    /// Maximum retries per request
    pub max_retries: u32,

    /// Expected embedding dimension
    pub dimension: usize,
}

impl ApiProviderConfig {
    /// Create config for an OpenAI-compatible API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            summary_model: "gpt-4o-mini".to_string(),
            api_key: SecretString::from(api_key.into()),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            dimension: EMBEDDING_DIMENSION,
        }
    }
}

/// OpenAI-compatible `EnrichmentProvider`.
pub struct ApiProvider {
    client: Client,
    config: ApiProviderConfig,
}

impl ApiProvider {
    pub fn new(config: ApiProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn build_summary_prompt(subject: &str, body: &str) -> String {
        format!(
            r#"Summarize this email and rate its urgency.

SUBJECT: {subject}

BODY:
{body}

Provide your response in JSON format:
{{
  "summary": "One or two sentences covering what the email asks for",
  "urgency_score": 0.0
}}

Guidelines:
- Summary should state the ask and any deadline
- urgency_score is between 0.0 (informational) and 1.0 (act now)"#
        )
    }

    fn transport_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Api(e.to_string())
        }
    }

    /// Run a request with bounded retries and exponential backoff.
    async fn with_retries<F, Fut, T>(&self, operation: F) -> Result<T, ProviderError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            debug!(attempt = attempts, "Calling enrichment API");

            match operation().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        error!(error = %e, "Max retries exceeded");
                        return Err(e);
                    }
                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                error = %e,
                                retry_in_ms = duration.as_millis(),
                                "API call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    async fn request_embeddings(
        &self,
        texts: &[String],
    ) -> Result<Vec<Option<Embedding>>, ProviderError> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingItem>,
        }

        #[derive(Deserialize)]
        struct EmbeddingItem {
            index: usize,
            embedding: Option<Vec<f32>>,
        }

        let url = format!("{}/embeddings", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .json(&EmbeddingRequest {
                model: &self.config.embedding_model,
                input: texts,
            })
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Api(format!(
                "embedding request returned {}",
                response.status()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let mut result: Vec<Option<Embedding>> = vec![None; texts.len()];
        for item in parsed.data {
            let Some(slot) = result.get_mut(item.index) else {
                continue;
            };
            *slot = item.embedding.and_then(|values| {
                if values.len() == self.config.dimension {
                    Some(Embedding::new(values))
                } else {
                    warn!(
                        index = item.index,
                        expected = self.config.dimension,
                        actual = values.len(),
                        "Dropping embedding with wrong dimension"
                    );
                    None
                }
            });
        }
        Ok(result)
    }

    async fn request_summary(
        &self,
        subject: &str,
        body: &str,
    ) -> Result<SummaryOutput, ProviderError> {
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            response_format: ResponseFormat<'a>,
        }

        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: String,
        }

        #[derive(Serialize)]
        struct ResponseFormat<'a> {
            #[serde(rename = "type")]
            format_type: &'a str,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChatChoiceMessage {
            content: String,
        }

        #[derive(Deserialize)]
        struct SummaryJson {
            summary: String,
            urgency_score: f32,
        }

        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.summary_model,
            messages: vec![ChatMessage {
                role: "user",
                content: Self::build_summary_prompt(subject, body),
            }],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(Self::transport_error)?;

        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Api(format!(
                "summary request returned {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Parse("empty choices".to_string()))?;
        let summary: SummaryJson =
            serde_json::from_str(&content).map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(SummaryOutput {
            summary: summary.summary,
            urgency_score: summary.urgency_score.clamp(0.0, 1.0),
        })
    }
}

#[async_trait]
impl EnrichmentProvider for ApiProvider {
    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyInput);
        }
        let texts = vec![text.to_string()];
        let mut embeddings = self.with_retries(|| self.request_embeddings(&texts)).await?;
        embeddings
            .pop()
            .flatten()
            .ok_or_else(|| ProviderError::Api("provider returned no embedding".to_string()))
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<Option<Embedding>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.with_retries(|| self.request_embeddings(texts)).await
    }

    async fn summarize(&self, subject: &str, body: &str) -> Result<SummaryOutput, ProviderError> {
        self.with_retries(|| self.request_summary(subject, body))
            .await
    }

    async fn summarize_batch(
        &self,
        items: &[SummaryInput],
    ) -> Result<HashMap<String, SummaryOutput>, ProviderError> {
        if items.is_empty() {
            return Ok(HashMap::new());
        }

        // One chat call per email; a failed item is simply absent from the
        // map so the caller can isolate it, while the whole batch only
        // fails if every item fails.
        let mut results = HashMap::new();
        let mut last_error = None;
        for item in items {
            match self.summarize(&item.subject, &item.body).await {
                Ok(output) => {
                    results.insert(item.id.clone(), output);
                }
                Err(e) => {
                    warn!(id = %item.id, error = %e, "Summarization failed for item");
                    last_error = Some(e);
                }
            }
        }
        if results.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ApiProviderConfig::new("sk-test");
        assert_eq!(config.dimension, EMBEDDING_DIMENSION);
        assert_eq!(config.max_retries, 3);
        assert!(config.base_url.contains("openai.com"));
    }

    #[test]
    fn summary_prompt_includes_content() {
        let prompt = ApiProvider::build_summary_prompt("Invoice overdue", "Pay by Friday");
        assert!(prompt.contains("Invoice overdue"));
        assert!(prompt.contains("Pay by Friday"));
        assert!(prompt.contains("urgency_score"));
    }
}
