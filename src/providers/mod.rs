/*!
 * Model-backend collaborator interface.
 *
 * The pipeline consumes a generative model through this trait; the three
 * logical operations it needs (analyze dependencies, extract terms,
 * translate a section) are prompt builders and response parsers layered on
 * top of `complete`. Responses are untrusted: malformed text is a
 * first-class, recoverable error, never a panic.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// A single chat-completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// System prompt guiding the model
    pub system: String,
    /// User message content
    pub user: String,
    /// Sampling temperature override
    pub temperature: Option<f32>,
    /// Response token budget override
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a request with default sampling parameters
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the token budget
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Common trait for model backends
///
/// Implementations own transport, auth, and rate limiting; the pipeline only
/// sees text in and text out, with every call carrying a bounded wait.
#[async_trait]
pub trait ModelBackend: Send + Sync + Debug {
    /// Complete a chat request, returning the raw response text
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError>;

    /// Embed a piece of text for similarity lookups
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Test the connection to the backend
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

pub mod mock;
pub mod openai;
