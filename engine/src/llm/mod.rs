//! Reasoning Engine Abstraction Layer
//!
//! This module provides a common interface for the language-model backends
//! (OpenAI-compatible APIs, Ollama) and the [`ReasoningEngine`] capability the
//! decision strategies are given. The [`router::LLMRouter`] adapts a list of
//! providers into a single engine with failover and per-call timeouts.

use async_trait::async_trait;
use scribe_sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ollama;
pub mod openai;
pub mod router;
pub mod scripted;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        EngineError::EngineUnavailable(err.to_string())
    }
}

/// Message in a prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Generate a completion for the given messages
    ///
    /// Returns the raw text of the model's reply. Interpreting that text is
    /// the caller's job.
    async fn generate(&self, messages: &[Message], temperature: f32) -> Result<String>;

    /// Check if the provider is reachable and configured
    async fn check_health(&self) -> bool {
        true
    }
}

/// The capability decision strategies use to ask for a judgment
///
/// Implementations own transport, authentication and timeouts. Callers
/// only ever observe text or `EngineError::EngineUnavailable`.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn invoke(
        &self,
        prompt: &[Message],
        temperature: f32,
    ) -> std::result::Result<String, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, MessageRole::System);
        assert_eq!(Message::user("u").role, MessageRole::User);
        assert_eq!(Message::assistant("a").content, "a");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
        assert_eq!(MessageRole::System.to_string(), "system");
    }

    #[test]
    fn test_llm_error_maps_to_engine_unavailable() {
        let err: EngineError = LLMError::RateLimitExceeded.into();
        assert!(matches!(err, EngineError::EngineUnavailable(ref m) if m == "Rate limit exceeded"));
    }
}
