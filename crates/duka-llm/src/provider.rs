use async_trait::async_trait;

use duka_core::{ChatMessage, Result};

/// A request to a chat-completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier, e.g. "gpt-4o-mini".
    pub model: String,
    /// Ordered conversation, system prompt first.
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait implemented by each completion backend (HTTP provider, mock).
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Human-readable name, e.g. "openai", "mock".
    fn name(&self) -> &str;

    /// Send a completion request and return the assistant text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
