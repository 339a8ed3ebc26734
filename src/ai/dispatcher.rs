//! Turns a selected email and an action into one completion call

use serde::Deserialize;
use std::sync::Arc;

use super::client::{ChatMessage, ChatRequest, CompletionBackend};
use super::prompts::{ActionKind, build_instruction};
use crate::constants::NO_RESPONSE;
use crate::error::DispatchError;
use crate::mail::Email;

/// Text produced by one AI action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
}

impl Response {
    fn no_response() -> Self {
        Self {
            text: NO_RESPONSE.to_string(),
        }
    }

    /// True when the backend answered without usable content
    pub fn is_empty_reply(&self) -> bool {
        self.text == NO_RESPONSE
    }
}

// Lenient view of a chat completion document. Any mismatch means "no content".
#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Content of the first choice, if the document has one.
fn first_choice_text(payload: serde_json::Value) -> Option<String> {
    let response: ChatResponse = serde_json::from_value(payload).ok()?;
    response
        .choices
        .into_iter()
        .next()?
        .message?
        .content
        .filter(|text| !text.is_empty())
}

pub struct Dispatcher<B> {
    backend: Arc<B>,
    model: String,
    max_tokens: u32,
}

impl<B: CompletionBackend> Dispatcher<B> {
    pub fn new(backend: Arc<B>, model: String, max_tokens: u32) -> Self {
        Self {
            backend,
            model,
            max_tokens,
        }
    }

    pub fn request_for(&self, email: &Email, action: &ActionKind) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(build_instruction(email, action))],
            max_tokens: self.max_tokens,
        }
    }

    /// Run `action` on `email`.
    ///
    /// `None` is a usage error and issues no request. A reply without content
    /// is a successful [`Response`] carrying the "No response available."
    /// sentinel; only transport problems are errors.
    pub async fn dispatch(
        &self,
        email: Option<&Email>,
        action: &ActionKind,
    ) -> Result<Response, DispatchError> {
        let Some(email) = email else {
            return Err(DispatchError::Usage);
        };

        let request = self.request_for(email, action);
        let payload = self.backend.complete(&request).await?;

        match first_choice_text(payload) {
            Some(text) => {
                tracing::info!("{} completed ({} chars)", action.label(), text.len());
                Ok(Response { text })
            }
            None => {
                tracing::info!("{} returned no content", action.label());
                Ok(Response::no_response())
            }
        }
    }
}
