//! LLM completion layer
//!
//! The pipeline talks to the completion provider through the
//! [`CompletionProvider`] trait so tests can swap in scripted providers.

pub mod client;
pub mod prompts;
pub mod streaming;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

pub use client::CompletionClient;
pub use prompts::StagePrompt;
pub use streaming::StreamingAnswer;

use crate::models::ChatMessage;
use crate::Result;

/// Incrementally produced answer tokens
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A chat-completion backend, non-streaming and streaming variants.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// One-shot completion returning the full response text.
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String>;

    /// Streaming completion yielding tokens as they are produced.
    async fn complete_streaming(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<TokenStream>;
}
