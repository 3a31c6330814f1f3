//! Pipeline Context
//!
//! The accumulating record threaded through a pipeline run. It starts with
//! the transcript and gains one entry per finished step. Entries are never
//! removed or replaced, and the transcript never changes once set.
//!
//! `Context` is a plain value: `merge` consumes it and hands back the grown
//! version, so every intermediate state can be kept and compared.

use scribe_sdk::types::StepPayload;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Key under which the raw transcript is stored
pub const TRANSCRIPT_KEY: &str = "transcript";

/// A single context entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContextValue {
    Text(String),
    Payload(StepPayload),
}

impl ContextValue {
    pub fn to_value(&self) -> Value {
        match self {
            ContextValue::Text(s) => Value::String(s.clone()),
            ContextValue::Payload(p) => p.to_value(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ContextValue::Payload(p) if p.is_degraded())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Context {
    entries: BTreeMap<String, ContextValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context seeded with the transcript
    pub fn with_transcript(transcript: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            TRANSCRIPT_KEY.to_string(),
            ContextValue::Text(transcript.into()),
        );
        Self { entries }
    }

    pub fn transcript(&self) -> Option<&str> {
        match self.entries.get(TRANSCRIPT_KEY) {
            Some(ContextValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a step payload under `key`, returning the grown context
    ///
    /// An existing key is left untouched; the new payload is dropped with a
    /// warning.
    pub fn merge(mut self, key: &str, payload: StepPayload) -> Self {
        if self.entries.contains_key(key) {
            tracing::warn!("Context key '{}' already set, keeping the existing value", key);
            return self;
        }
        self.entries
            .insert(key.to_string(), ContextValue::Payload(payload));
        self
    }

    /// JSON view of the requested keys; absent keys are skipped
    pub fn project(&self, keys: &[&str]) -> BTreeMap<String, Value> {
        keys.iter()
            .filter_map(|k| self.entries.get(*k).map(|v| (k.to_string(), v.to_value())))
            .collect()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}
