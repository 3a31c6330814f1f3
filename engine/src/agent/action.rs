//! Decision vocabulary shared by the reasoning loop and its strategies
//!
//! A [`DecisionStrategy`] looks at a [`Snapshot`] of the world and answers
//! with an [`Action`]: keep reasoning, or stop with a result.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// What a strategy decided for one iteration
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Another iteration is wanted
    Continue(Signal),
    /// The step is done
    Complete(Completion),
}

impl Action {
    pub fn is_complete(&self) -> bool {
        matches!(self, Action::Complete(_))
    }

    /// Short label for logs and history
    pub fn label(&self) -> &'static str {
        match self {
            Action::Continue(s) if s.error => "continue (error)",
            Action::Continue(_) => "continue",
            Action::Complete(Completion::Result(_)) => "complete",
            Action::Complete(Completion::Degraded(_)) => "complete (degraded)",
        }
    }
}

/// Intermediate signal carried by a CONTINUE action
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Model reasoning, or a description of what went wrong
    pub note: String,
    /// Set when the iteration produced nothing usable
    pub error: bool,
}

impl Signal {
    pub fn progress(note: impl Into<String>) -> Self {
        Self {
            note: note.into(),
            error: false,
        }
    }

    pub fn error(note: impl Into<String>) -> Self {
        Self {
            note: note.into(),
            error: true,
        }
    }
}

/// Final result carried by a COMPLETE action
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// A clean result, still to be validated against the step's schema
    Result(Value),
    /// Last-resort fallback when nothing usable was produced
    Degraded(Fallback),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fallback {
    /// Human-readable explanation
    pub message: String,
    /// Start of the offending engine output, if any
    pub excerpt: Option<String>,
}

/// One earlier iteration, as seen by the strategy
#[derive(Debug, Clone, PartialEq)]
pub struct PriorIteration {
    pub iteration: u32,
    pub note: String,
    pub error: bool,
}

/// Read-only view handed to a strategy on each iteration
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub step: String,
    pub goal: String,
    /// Only the context fields the strategy declared
    pub fields: BTreeMap<String, Value>,
    /// 1-based
    pub iteration: u32,
    pub max_iterations: u32,
    pub history: Vec<PriorIteration>,
}

impl Snapshot {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_final_iteration(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    /// True if some earlier iteration produced a usable record
    pub fn has_successful_record(&self) -> bool {
        self.history.iter().any(|h| !h.error)
    }
}

/// Per-step decision logic
///
/// Implementations must not fail: engine and parsing problems are turned
/// into error-marked actions before they reach the loop.
#[async_trait]
pub trait DecisionStrategy: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Context keys this strategy reads
    fn input_keys(&self) -> &[&'static str];

    async fn decide(&self, snapshot: &Snapshot) -> Action;
}
