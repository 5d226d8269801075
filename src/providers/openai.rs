/*!
 * OpenAI-compatible chat and embedding client.
 *
 * Works against the OpenAI API or any compatible router by pointing the
 * endpoint elsewhere. Transport failures and throttling are retried with
 * exponential backoff inside the client, so callers see one bounded call.
 */

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;

use super::{ChatRequest, ModelBackend};

/// OpenAI-compatible client
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base endpoint URL, e.g. "https://api.openai.com/v1"
    endpoint: String,
    /// Chat model name
    model: String,
    /// Embedding model name
    embedding_model: String,
    /// Default sampling temperature
    temperature: f32,
    /// Default response token budget
    max_tokens: u32,
    /// Retry attempts for transport-level failures
    transport_retries: usize,
    /// Per-request timeout in seconds
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiBackend {
    /// Create a client from provider configuration
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        Url::parse(&config.endpoint)
            .map_err(|e| ProviderError::ConnectionError(format!("invalid endpoint URL: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            transport_retries: config.transport_retries,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Issue one POST, mapping HTTP failures onto provider errors
    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ProviderError> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout_secs)
                } else {
                    ProviderError::ConnectionError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthenticationError(message),
                429 => ProviderError::RateLimitExceeded(message),
                code => ProviderError::ApiError {
                    status_code: code,
                    message,
                },
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    /// Run an operation with exponential backoff on retryable failures
    async fn with_backoff<T, F, Fut>(&self, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let mut last_error = None;
        for attempt in 0..=self.transport_retries {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if is_retryable(&e) && attempt < self.transport_retries => {
                    let wait = Duration::from_secs(1 << attempt);
                    warn!(
                        "Backend request failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt + 1,
                        self.transport_retries + 1,
                        wait,
                        e
                    );
                    tokio::time::sleep(wait).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| ProviderError::RequestFailed("retry budget exhausted".to_string())))
    }
}

/// Whether a failure is worth another attempt
fn is_retryable(error: &ProviderError) -> bool {
    matches!(
        error,
        ProviderError::ConnectionError(_)
            | ProviderError::RateLimitExceeded(_)
            | ProviderError::Timeout(_)
            | ProviderError::ApiError { status_code: 500..=599, .. }
    )
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            temperature: request.temperature.unwrap_or(self.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
        };

        debug!(
            "Chat completion request: model={}, user chars={}",
            self.model,
            request.user.len()
        );

        let response: ChatCompletionResponse = self
            .with_backoff(|| self.post_json("/chat/completions", &body))
            .await?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| ProviderError::ParseError("response carried no choices".to_string()))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };

        let response: EmbeddingResponse = self
            .with_backoff(|| self.post_json("/embeddings", &body))
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::ParseError("response carried no embeddings".to_string()))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = ChatRequest::new("You are a connectivity check.", "Reply with OK.")
            .max_tokens(10);
        self.complete(request).await?;
        Ok(())
    }
}
