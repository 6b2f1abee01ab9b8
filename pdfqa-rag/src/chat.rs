//! Chat completion: a fallible model seam plus a wrapper that never fails.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::document::{ChatMessage, Role};
use crate::error::Result;

/// Returned by [`ChatCompletion::complete`] when the model call fails.
pub const GENERATION_FALLBACK: &str = "Sorry, an error occurred while generating the response.";

/// Sampling options for one generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { temperature: 0.1, max_output_tokens: 1000 }
    }
}

/// A hosted generative model that turns one prompt string into text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String>;

    /// Short model name used in logs.
    fn name(&self) -> &str {
        "chat"
    }
}

/// Flatten role-tagged messages into a single prompt string.
///
/// System messages become `Instructions: ...` followed by a blank line,
/// user messages are copied as-is, and assistant messages are prefixed with
/// `Assistant: `.
pub fn render_messages(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for message in messages {
        match message.role {
            Role::System => {
                prompt.push_str("Instructions: ");
                prompt.push_str(&message.content);
                prompt.push_str("\n\n");
            }
            Role::User => {
                prompt.push_str(&message.content);
                prompt.push('\n');
            }
            Role::Assistant => {
                prompt.push_str("Assistant: ");
                prompt.push_str(&message.content);
                prompt.push('\n');
            }
        }
    }
    prompt
}

/// Wraps a [`ChatModel`] so that callers always receive text.
#[derive(Clone)]
pub struct ChatCompletion {
    model: Arc<dyn ChatModel>,
    max_output_tokens: u32,
}

impl ChatCompletion {
    /// Wrap `model` with the default token limit.
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model, max_output_tokens: GenerationOptions::default().max_output_tokens }
    }

    /// Set the maximum number of generated tokens.
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    /// Send `messages` at `temperature` and return the generated text, or
    /// [`GENERATION_FALLBACK`] if the model call fails.
    pub async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> String {
        let prompt = render_messages(messages);
        let options = GenerationOptions { temperature, max_output_tokens: self.max_output_tokens };
        debug!(model = self.model.name(), prompt_len = prompt.len(), temperature, "generating");

        match self.model.generate(&prompt, options).await {
            Ok(text) => text,
            Err(e) => {
                error!(model = self.model.name(), error = %e, "chat completion failed");
                GENERATION_FALLBACK.to_string()
            }
        }
    }
}
