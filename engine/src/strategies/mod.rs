//! Decision strategies
//!
//! Every pipeline step is driven by the same engine-backed strategy,
//! parameterised by a [`StrategySpec`]: which context fields it may read,
//! what it asks the model for, and the shape of the result it expects.
//!
//! A strategy turns one snapshot into one prompt, sends it to the injected
//! [`ReasoningEngine`], interprets the reply and maps the record to an
//! [`Action`]. It never fails: engine and parsing errors become
//! error-marked actions.

use async_trait::async_trait;
use scribe_sdk::types::PayloadKind;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::agent::action::{Action, Completion, DecisionStrategy, Fallback, Signal, Snapshot};
use crate::agent::interpreter::{truncate_chars, Record, ResponseInterpreter};
use crate::llm::{Message, ReasoningEngine};

pub mod article;
pub mod insights;
pub mod notes;
pub mod repo_plan;
pub mod todos;

/// Longest prior note echoed back into a prompt
pub const MAX_NOTE_CHARS: usize = 500;

/// Static description of one step's strategy
#[derive(Debug, Clone, Copy)]
pub struct StrategySpec {
    pub kind: PayloadKind,
    /// Goal handed to the reasoning loop
    pub goal: &'static str,
    /// Role line for the system prompt
    pub role: &'static str,
    pub instructions: &'static str,
    /// JSON shape of `result`, shown to the model
    pub schema: &'static str,
    /// Context keys the strategy reads
    pub inputs: &'static [&'static str],
}

/// Spec of the built-in strategy for `kind`
pub fn spec_for(kind: PayloadKind) -> &'static StrategySpec {
    match kind {
        PayloadKind::Insights => &insights::SPEC,
        PayloadKind::Notes => &notes::SPEC,
        PayloadKind::Todos => &todos::SPEC,
        PayloadKind::RepoPlan => &repo_plan::SPEC,
        PayloadKind::Article => &article::SPEC,
    }
}

/// Build the strategy for `kind` on top of a shared engine
pub fn build_strategy(
    kind: PayloadKind,
    engine: Arc<dyn ReasoningEngine>,
    temperature: f32,
) -> LlmStrategy {
    LlmStrategy::new(*spec_for(kind), engine, temperature)
}

/// Engine-backed decision strategy
pub struct LlmStrategy {
    spec: StrategySpec,
    engine: Arc<dyn ReasoningEngine>,
    temperature: f32,
    interpreter: ResponseInterpreter,
}

impl LlmStrategy {
    pub fn new(spec: StrategySpec, engine: Arc<dyn ReasoningEngine>, temperature: f32) -> Self {
        Self {
            spec,
            engine,
            temperature,
            interpreter: ResponseInterpreter::new(),
        }
    }

    /// Compose the prompt for one iteration from the snapshot alone
    pub fn compose(&self, snapshot: &Snapshot) -> Vec<Message> {
        let system = format!(
            "You are {}. {}\n\n\
             Respond with exactly one JSON object and nothing else:\n\
             {{\"action_type\": \"CONTINUE\" | \"COMPLETE\", \"reasoning\": \"<short explanation>\", \"result\": {}}}\n\
             Use COMPLETE together with the final result as soon as you have it. \
             Use CONTINUE only if you need another pass.",
            self.spec.role, self.spec.instructions, self.spec.schema
        );

        let mut user = format!("Goal: {}\n", snapshot.goal);

        for key in self.spec.inputs {
            if let Some(value) = snapshot.field(key) {
                user.push_str(&format!("\n## {}\n{}\n", key, render_field(value)));
            }
        }

        user.push_str(&format!(
            "\nIteration {} of {}.",
            snapshot.iteration, snapshot.max_iterations
        ));

        if !snapshot.history.is_empty() {
            user.push_str("\n\nPrevious iterations:");
            for prior in &snapshot.history {
                let marker = if prior.error { " (error)" } else { "" };
                user.push_str(&format!(
                    "\n- {}{}: {}",
                    prior.iteration,
                    marker,
                    truncate_chars(&prior.note, MAX_NOTE_CHARS)
                ));
            }
            user.push_str(
                "\nIf your previous answer was already complete, repeat it with action_type COMPLETE.",
            );
        }

        if snapshot.is_final_iteration() {
            user.push_str("\nThis is the last iteration: answer with action_type COMPLETE.");
        }

        vec![Message::system(system), Message::user(user)]
    }

    /// Engine or interpretation failure
    ///
    /// Falls back to a degraded completion only on the last iteration and
    /// only if no earlier iteration produced a usable record.
    fn degrade(&self, snapshot: &Snapshot, message: String, excerpt: Option<String>) -> Action {
        if snapshot.is_final_iteration() && !snapshot.has_successful_record() {
            warn!(
                "Step {} falling back to a degraded result: {}",
                snapshot.step, message
            );
            return Action::Complete(Completion::Degraded(Fallback {
                message: format!("{} could not produce a result: {}", snapshot.step, message),
                excerpt,
            }));
        }

        Action::Continue(Signal::error(message))
    }
}

#[async_trait]
impl DecisionStrategy for LlmStrategy {
    fn name(&self) -> &str {
        self.spec.kind.as_str()
    }

    fn input_keys(&self) -> &[&'static str] {
        self.spec.inputs
    }

    async fn decide(&self, snapshot: &Snapshot) -> Action {
        let prompt = self.compose(snapshot);

        let raw = match self.engine.invoke(&prompt, self.temperature).await {
            Ok(raw) => raw,
            Err(e) => return self.degrade(snapshot, e.to_string(), None),
        };

        debug!("Step {} received {} bytes", snapshot.step, raw.len());

        match self.interpreter.interpret(&raw) {
            Ok(record) => map_record(&record),
            Err(e) => {
                let excerpt = Some(e.excerpt.clone());
                self.degrade(snapshot, e.to_string(), excerpt)
            }
        }
    }
}

/// Map an interpreted record to an action
///
/// Only an explicit done marker with a result completes the step.
pub fn map_record(record: &Record) -> Action {
    let note = record
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let done = match record.get("action_type") {
        Some(Value::String(t)) if t.eq_ignore_ascii_case("COMPLETE") => true,
        Some(Value::String(t)) if t.eq_ignore_ascii_case("CONTINUE") => false,
        Some(other) => {
            return Action::Continue(Signal::error(format!(
                "unrecognised action_type {}",
                other
            )));
        }
        None => {
            record
                .get("status")
                .and_then(Value::as_str)
                .is_some_and(|s| s.eq_ignore_ascii_case("complete"))
                || record.get("done") == Some(&Value::Bool(true))
        }
    };

    if !done {
        let note = if note.is_empty() {
            "response carried no completion marker".to_string()
        } else {
            note
        };
        return Action::Continue(Signal::progress(note));
    }

    match record
        .get("result")
        .or_else(|| record.get("answer"))
        .filter(|v| !v.is_null())
    {
        Some(result) => Action::Complete(Completion::Result(result.clone())),
        None => Action::Continue(Signal::error("completion marked without a result")),
    }
}

fn render_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
