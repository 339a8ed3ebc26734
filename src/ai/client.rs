//! Chat-completions HTTP client

use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// A remote text-generation service.
///
/// Returns the decoded JSON document as-is; interpreting its shape is the
/// dispatcher's job. Anything that prevents getting a JSON document at all
/// (network, non-2xx, unparseable body) is a [`TransportError`].
pub trait CompletionBackend: Send + Sync + 'static {
    fn complete(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> + Send;
}

/// OpenAI-compatible chat completions client
#[derive(Clone)]
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ChatCompletionClient {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

impl CompletionBackend for ChatCompletionClient {
    async fn complete(&self, request: &ChatRequest) -> Result<serde_json::Value, TransportError> {
        tracing::debug!(
            "Completion request to {} (model {}, max_tokens {})",
            self.endpoint,
            request.model,
            request.max_tokens
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Json(e.to_string()))
    }
}
