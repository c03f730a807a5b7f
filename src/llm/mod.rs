pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Text deltas of a streamed completion, in arrival order.
pub type TokenStream = BoxStream<'static, Result<String, LlmError>>;

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run a completion and return the whole reply.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Start a streamed completion.
    ///
    /// Resolves once the provider has accepted the request, so a rejected
    /// request surfaces here rather than as the first stream item.
    async fn stream(&self, messages: &[ChatMessage]) -> Result<TokenStream, LlmError>;

    fn model(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl LlmError {
    /// Status code reported by the provider, if it answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            LlmError::Http(e) => e.status().map(|s| s.as_u16()),
            LlmError::Parse(_) => None,
        }
    }
}
