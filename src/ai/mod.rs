//! AI actions on a selected email
//!
//! Builds one instruction per action, sends it to an OpenAI-compatible chat
//! completion endpoint and reduces the answer to a single [`Response`].

mod actor;
pub mod client;
mod dispatcher;
mod prompts;

pub use actor::{AiActorHandle, AiCommand, AiEvent, spawn_ai_actor};
pub use client::ChatCompletionClient;
pub use dispatcher::{Dispatcher, Response};
pub use prompts::{ActionKind, Tone};
