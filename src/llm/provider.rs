//! Provider-agnostic request/response types and the `LlmProvider` trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Default token budget for a single paraphrase.
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Role of a message in a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A completion request, independent of the concrete provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// A completion response.
///
/// `content` is `None` when the provider answered successfully but the
/// expected text field was absent or empty.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub content: Option<String>,
}

/// A text-generation backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier sent with each request.
    fn model_name(&self) -> &str;

    /// Run one completion. Rate limiting must surface as `LlmError::RateLimited`.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
