//! Response Interpreter
//!
//! Extracts a structured record (a JSON object) from whatever text the
//! reasoning engine returned. Models often wrap their answer in prose or a
//! markdown fence, so recovery is attempted in order:
//!
//! 1. strict parse of the whole text
//! 2. the body of the first fenced code block
//! 3. bracket scan: first `{` to last `}`, inclusive
//!
//! If none of these yields an object the caller gets an
//! [`InterpretationError`] carrying a bounded excerpt of the input.
//! `interpret` never panics, whatever the input.

use regex::Regex;
use scribe_sdk::errors::EngineError;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// A structured record returned by the engine
pub type Record = Map<String, Value>;

/// Default number of characters of raw text kept in an error
pub const MAX_EXCERPT_CHARS: usize = 200;

static FENCE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn fence_pattern() -> Option<&'static Regex> {
    FENCE_PATTERN
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n(.*?)```").ok())
        .as_ref()
}

/// Raw text that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} (received {original_len} bytes): {excerpt}")]
pub struct InterpretationError {
    pub reason: String,
    /// The start of the raw text, at most the interpreter's excerpt limit
    pub excerpt: String,
    pub original_len: usize,
}

impl From<InterpretationError> for EngineError {
    fn from(err: InterpretationError) -> Self {
        EngineError::MalformedResponse(err.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResponseInterpreter {
    max_excerpt_chars: usize,
}

impl Default for ResponseInterpreter {
    fn default() -> Self {
        Self {
            max_excerpt_chars: MAX_EXCERPT_CHARS,
        }
    }
}

impl ResponseInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_excerpt_limit(max_excerpt_chars: usize) -> Self {
        Self { max_excerpt_chars }
    }

    /// Interpret raw engine output as a record
    pub fn interpret(&self, raw: &str) -> Result<Record, InterpretationError> {
        if let Some(record) = parse_record(raw) {
            return Ok(record);
        }

        if let Some(record) = fenced_body(raw).and_then(parse_record) {
            tracing::debug!("Recovered record from fenced block");
            return Ok(record);
        }

        let reason = match bracket_span(raw) {
            Some(span) => match serde_json::from_str::<Value>(span) {
                Ok(Value::Object(record)) => {
                    tracing::debug!("Recovered record by bracket scan");
                    return Ok(record);
                }
                Ok(_) => "bracketed text is not a JSON object".to_string(),
                Err(e) => format!("bracketed text is not valid JSON: {}", e),
            },
            None if raw.trim().is_empty() => "empty response".to_string(),
            None => "no JSON object found".to_string(),
        };

        Err(InterpretationError {
            reason,
            excerpt: truncate_chars(raw, self.max_excerpt_chars),
            original_len: raw.len(),
        })
    }
}

fn parse_record(text: &str) -> Option<Record> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(record)) => Some(record),
        _ => None,
    }
}

fn fenced_body(raw: &str) -> Option<&str> {
    fence_pattern()?
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Text from the first `{` to the last `}`, inclusive
fn bracket_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Truncate on a char boundary
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
