//! Scripted provider
//!
//! Replays a fixed sequence of replies instead of calling a model. Used for
//! offline runs (`scribe run --script`), for replaying a recorded session and
//! in tests. Once the script runs out the last reply is repeated.
//!
//! Clones share their state, so a clone kept outside a router can still
//! report call counts and the prompts that were sent.

use async_trait::async_trait;
use scribe_sdk::errors::EngineError;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{LLMError, LLMProvider, Message, ReasoningEngine, Result};

/// One scripted reply
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScriptedReply {
    /// Raw text returned as the model's reply
    Text(String),
    /// Simulated transport failure
    Unavailable { unavailable: String },
}

impl ScriptedReply {
    pub fn text(s: impl Into<String>) -> Self {
        ScriptedReply::Text(s.into())
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ScriptedReply::Unavailable {
            unavailable: reason.into(),
        }
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: Vec<ScriptedReply>,
    cursor: AtomicUsize,
    prompts: Mutex<Vec<Vec<Message>>>,
}

#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    name: String,
    state: Arc<ScriptState>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            name: "scripted".to_string(),
            state: Arc::new(ScriptState {
                replies,
                ..ScriptState::default()
            }),
        }
    }

    /// A provider that gives the same reply forever
    pub fn repeating(reply: ScriptedReply) -> Self {
        Self::new(vec![reply])
    }

    /// Parse a script from a JSON array
    ///
    /// Entries are either strings (reply text) or `{"unavailable": "reason"}`.
    pub fn from_json(json: &str) -> std::result::Result<Self, EngineError> {
        let replies: Vec<ScriptedReply> = serde_json::from_str(json)?;
        if replies.is_empty() {
            return Err(EngineError::InvalidConfiguration(
                "script must contain at least one reply".to_string(),
            ));
        }
        Ok(Self::new(replies))
    }

    /// Number of generate calls made so far
    pub fn calls(&self) -> usize {
        self.state.cursor.load(Ordering::SeqCst)
    }

    /// Every prompt received, in order
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.state
            .prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        let index = self.state.cursor.fetch_add(1, Ordering::SeqCst);
        let replies = &self.state.replies;
        replies
            .get(index)
            .or_else(|| replies.last())
            .cloned()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(&self, messages: &[Message], _temperature: f32) -> Result<String> {
        if let Ok(mut prompts) = self.state.prompts.lock() {
            prompts.push(messages.to_vec());
        }

        match self.next_reply() {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Unavailable { unavailable }) => {
                Err(LLMError::ProviderUnavailable(unavailable))
            }
            None => Err(LLMError::ProviderUnavailable("script is empty".to_string())),
        }
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedProvider {
    async fn invoke(
        &self,
        prompt: &[Message],
        temperature: f32,
    ) -> std::result::Result<String, EngineError> {
        Ok(self.generate(prompt, temperature).await?)
    }
}
