/*!
 * Mock backend implementations for testing.
 *
 * The scripted backend plays back a queue of canned responses, including
 * malformed ones, so every recovery path in the pipeline can be exercised
 * deterministically without a network.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;

use super::{ChatRequest, ModelBackend};

/// One scripted reaction to a completion request
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Return this text
    Text(String),
    /// Fail with an API error
    Fail(String),
    /// Echo the payload of the user message back unchanged (identity
    /// translation). When the message carries a `TEXT TO TRANSLATE:` block
    /// only that block is echoed; otherwise the whole message is.
    Echo,
}

fn echo_payload(user: &str) -> String {
    let Some(start) = user.find("TEXT TO TRANSLATE:") else {
        return user.to_string();
    };
    let body = &user[start + "TEXT TO TRANSLATE:".len()..];
    let body = body
        .rfind("Provide ONLY")
        .map(|end| &body[..end])
        .unwrap_or(body);
    body.trim().to_string()
}

/// A backend that plays back scripted responses in order.
///
/// When the script runs dry the backend falls back to `Echo`, which keeps
/// happy-path tests short: echoing the section text back preserves every
/// formula by construction. `failing()` builds a backend that errors once
/// the script is exhausted instead.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    script: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    call_count: Arc<AtomicUsize>,
    fail_when_exhausted: bool,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ScriptedBackend {
    /// Create a backend with a response script
    pub fn new(script: Vec<ScriptedResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
            fail_when_exhausted: false,
        }
    }

    /// A backend that echoes every request (all formulas preserved)
    pub fn echoing() -> Self {
        Self::new(Vec::new())
    }

    /// A backend that always fails
    pub fn failing() -> Self {
        Self {
            fail_when_exhausted: true,
            ..Self::new(Vec::new())
        }
    }

    /// Append a response to the script
    pub fn push(&self, response: ScriptedResponse) {
        self.script.lock().push_back(response);
    }

    /// Number of completion calls made so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Copies of all requests received so far
    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(ScriptedResponse::Text(text)) => Ok(text),
            Some(ScriptedResponse::Fail(message)) => Err(ProviderError::ApiError {
                status_code: 500,
                message,
            }),
            Some(ScriptedResponse::Echo) => Ok(echo_payload(&request.user)),
            None if self.fail_when_exhausted => Err(ProviderError::ApiError {
                status_code: 500,
                message: "scripted backend exhausted".to_string(),
            }),
            None => Ok(echo_payload(&request.user)),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        // Deterministic pseudo-embedding derived from the text bytes
        let mut vector = vec![0.0f32; 8];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % 8] += byte as f32 / 255.0;
        }
        Ok(vector)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
