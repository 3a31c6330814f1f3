//! Reasoning Step
//!
//! This module implements the bounded reasoning loop every pipeline step runs.
//! Each iteration walks through five phases:
//!
//! 1. **Sense**: build a read-only snapshot of the goal and the declared context fields
//! 2. **Plan**: ask the decision strategy for an action (the only engine call)
//! 3. **Act**: a COMPLETE action ends the loop; CONTINUE has no side effect here
//! 4. **Observe**: record the action and whether it succeeded
//! 5. **Reflect**: decide whether another iteration is allowed
//!
//! The loop ends in `Completed` when the strategy completes with a result, or
//! in `Exhausted` when the cap is reached or the strategy had to fall back to
//! a degraded result. Both are ordinary return values.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use scribe_sdk::errors::EngineError;
use scribe_sdk::types::DegradedPayload;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::action::{Action, Completion, DecisionStrategy, PriorIteration, Signal, Snapshot};
use super::reflector::{Reflector, Verdict};
use crate::conductor::context::Context;

/// Phases of the reasoning state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Sense,
    Plan,
    Act,
    Observe,
    Reflect,
    Completed,
    Exhausted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Sense => "SENSE",
            Phase::Plan => "PLAN",
            Phase::Act => "ACT",
            Phase::Observe => "OBSERVE",
            Phase::Reflect => "REFLECT",
            Phase::Completed => "COMPLETED",
            Phase::Exhausted => "EXHAUSTED",
        };
        f.write_str(name)
    }
}

/// Terminal state of one step run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Completed,
    Exhausted,
}

impl StepState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepState::Completed => "completed",
            StepState::Exhausted => "exhausted",
        }
    }
}

/// Audit trail of one iteration
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRecord {
    pub iteration: u32,
    /// Context fields that were visible to the strategy
    pub sensed_fields: Vec<String>,
    pub action: Action,
    pub act_result: String,
    pub succeeded: bool,
    /// `None` when the iteration ended the loop
    pub verdict: Option<Verdict>,
}

/// What a step produced
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    /// Raw result, not yet checked against the step's schema
    Value(Value),
    Degraded(DegradedPayload),
}

/// Outcome of one step run
#[derive(Debug, Clone)]
pub struct StepResult {
    pub step: String,
    pub success: bool,
    pub state: StepState,
    pub output: StepOutput,
    pub plan_calls: u32,
    pub records: Vec<ReasoningRecord>,
    pub elapsed: Duration,
}

impl StepResult {
    /// Actions taken, in order
    pub fn actions(&self) -> Vec<&Action> {
        self.records.iter().map(|r| &r.action).collect()
    }
}

/// A bounded reasoning loop driven by one decision strategy
pub struct ReasoningStep {
    name: String,
    strategy: Arc<dyn DecisionStrategy>,
}

impl ReasoningStep {
    pub fn new(name: impl Into<String>, strategy: Arc<dyn DecisionStrategy>) -> Self {
        Self {
            name: name.into(),
            strategy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> &Arc<dyn DecisionStrategy> {
        &self.strategy
    }

    /// Run the loop for at most `max_iterations` iterations
    ///
    /// # Errors
    ///
    /// Only `InvalidConfiguration`, when `max_iterations` is 0. Engine and
    /// parsing failures show up as an unsuccessful `StepResult`.
    pub async fn run(
        &self,
        goal: &str,
        context: &Context,
        max_iterations: u32,
    ) -> Result<StepResult, EngineError> {
        if max_iterations == 0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "step '{}': max_iterations must be at least 1",
                self.name
            )));
        }

        let start = Instant::now();
        let mut reflector = Reflector::new();
        let mut records: Vec<ReasoningRecord> = Vec::new();
        let mut plan_calls = 0;

        info!(
            "Step {} started with strategy {} (max {} iterations)",
            self.name,
            self.strategy.name(),
            max_iterations
        );

        for iteration in 1..=max_iterations {
            self.enter(Phase::Sense, iteration);
            let snapshot = self.sense(goal, context, iteration, max_iterations, &records);
            let sensed_fields: Vec<String> = snapshot.fields.keys().cloned().collect();

            self.enter(Phase::Plan, iteration);
            let action = self.strategy.decide(&snapshot).await;
            plan_calls += 1;

            self.enter(Phase::Act, iteration);
            let signal = match action {
                Action::Complete(completion) => {
                    let (state, output) = self.complete(&completion);
                    records.push(ReasoningRecord {
                        iteration,
                        sensed_fields,
                        act_result: "loop terminated".to_string(),
                        succeeded: state == StepState::Completed,
                        action: Action::Complete(completion),
                        verdict: None,
                    });
                    return Ok(self.finish(state, output, plan_calls, records, start));
                }
                Action::Continue(signal) => signal,
            };
            let act_result = Self::act(&signal);

            self.enter(Phase::Observe, iteration);
            let succeeded = !signal.error;
            if !succeeded {
                warn!(
                    "Step {} iteration {}: {}",
                    self.name, iteration, signal.note
                );
            }

            self.enter(Phase::Reflect, iteration);
            let verdict =
                reflector.reflect(&self.name, &signal.note, succeeded, iteration, max_iterations);

            records.push(ReasoningRecord {
                iteration,
                sensed_fields,
                action: Action::Continue(signal),
                act_result,
                succeeded,
                verdict: Some(verdict),
            });

            if verdict == Verdict::Stop {
                break;
            }
        }

        let last_note = records
            .iter()
            .rev()
            .find_map(|r| match &r.action {
                Action::Continue(s) => Some(s.note.clone()),
                Action::Complete(_) => None,
            })
            .unwrap_or_default();

        let exhausted = EngineError::StepExhausted {
            step: self.name.clone(),
            iterations: plan_calls,
        };
        let message = if last_note.is_empty() {
            exhausted.to_string()
        } else {
            format!("{}; last note: {}", exhausted, last_note)
        };

        Ok(self.finish(
            StepState::Exhausted,
            StepOutput::Degraded(DegradedPayload::new(&self.name, message)),
            plan_calls,
            records,
            start,
        ))
    }

    fn enter(&self, phase: Phase, iteration: u32) {
        debug!("Step {} iteration {}: {}", self.name, iteration, phase);
    }

    /// SENSE: pure projection of the context, never mutates it
    fn sense(
        &self,
        goal: &str,
        context: &Context,
        iteration: u32,
        max_iterations: u32,
        records: &[ReasoningRecord],
    ) -> Snapshot {
        let keys = self.strategy.input_keys();
        let fields = context.project(keys);

        for key in keys {
            if !fields.contains_key(*key) {
                warn!("Step {} expects '{}' but it is not in context", self.name, key);
            }
        }

        let history = records
            .iter()
            .filter_map(|r| match &r.action {
                Action::Continue(signal) => Some(PriorIteration {
                    iteration: r.iteration,
                    note: signal.note.clone(),
                    error: signal.error,
                }),
                Action::Complete(_) => None,
            })
            .collect();

        Snapshot {
            step: self.name.clone(),
            goal: goal.to_string(),
            fields,
            iteration,
            max_iterations,
            history,
        }
    }

    /// ACT for a CONTINUE action; these steps call no tools, so nothing runs
    fn act(signal: &Signal) -> String {
        if signal.error {
            "no-op (error signal)".to_string()
        } else {
            "no-op".to_string()
        }
    }

    fn complete(&self, completion: &Completion) -> (StepState, StepOutput) {
        match completion {
            Completion::Result(value) => (StepState::Completed, StepOutput::Value(value.clone())),
            Completion::Degraded(fallback) => (
                StepState::Exhausted,
                StepOutput::Degraded(
                    DegradedPayload::new(&self.name, &fallback.message)
                        .with_excerpt(fallback.excerpt.clone()),
                ),
            ),
        }
    }

    fn finish(
        &self,
        state: StepState,
        output: StepOutput,
        plan_calls: u32,
        records: Vec<ReasoningRecord>,
        start: Instant,
    ) -> StepResult {
        let elapsed = start.elapsed();
        let phase = match state {
            StepState::Completed => Phase::Completed,
            StepState::Exhausted => Phase::Exhausted,
        };

        info!(
            "Step {} {} after {} plan calls in {}ms",
            self.name,
            phase,
            plan_calls,
            elapsed.as_millis()
        );

        StepResult {
            step: self.name.clone(),
            success: state == StepState::Completed,
            state,
            output,
            plan_calls,
            records,
            elapsed,
        }
    }
}
