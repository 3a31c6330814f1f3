//! Pipeline orchestrator
//!
//! Folds the step list over a [`Context`] seeded with the transcript. Each
//! step sees the context as left by the step before it, whatever that
//! step's outcome; its payload is validated against the step's schema and
//! merged under its output key. Engine and parsing failures never abort a
//! run: they surface as degraded payloads and the `partial_failure` flag.

use std::time::Instant;

use scribe_sdk::types::{DegradedPayload, StepPayload};
use tracing::{info, warn};

use super::context::Context;
use super::pipeline::{validate, PipelineStep};
use super::types::{ResultSet, RunState, StepReport};
use crate::agent::core::{StepOutput, StepState};
use crate::agent::interpreter::{truncate_chars, MAX_EXCERPT_CHARS};
use scribe_sdk::errors::EngineError;

pub struct Orchestrator {
    steps: Vec<PipelineStep>,
}

impl Orchestrator {
    /// Build an orchestrator over a validated pipeline
    pub fn new(steps: Vec<PipelineStep>) -> Result<Self, EngineError> {
        validate(&steps)?;
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Run one step against `context` and merge its payload
    pub async fn run_step(&self, step: &PipelineStep, context: Context) -> (Context, StepReport) {
        let start = Instant::now();
        let name = step.name().to_string();

        let outcome = step
            .reasoning()
            .run(&step.goal, &context, step.max_iterations)
            .await;

        let (state, plan_calls, actions, payload) = match outcome {
            Ok(result) => {
                let actions: Vec<String> =
                    result.actions().iter().map(|a| a.label().to_string()).collect();
                let payload = match result.output {
                    StepOutput::Value(value) => step.kind.parse(&value).unwrap_or_else(|e| {
                        warn!("Step {} result rejected: {}", name, e);
                        StepPayload::Degraded(
                            DegradedPayload::new(&name, e.to_string())
                                .with_excerpt(Some(truncate_chars(&value.to_string(), MAX_EXCERPT_CHARS))),
                        )
                    }),
                    StepOutput::Degraded(degraded) => StepPayload::Degraded(degraded),
                };
                (result.state, result.plan_calls, actions, payload)
            }
            // Only reachable with a cap of 0, which validation rules out
            Err(e) => (
                StepState::Exhausted,
                0,
                Vec::new(),
                StepPayload::Degraded(DegradedPayload::new(&name, e.to_string())),
            ),
        };

        let degraded = payload.is_degraded();
        let report = StepReport {
            step: name,
            output_key: step.output_key.to_string(),
            success: state == StepState::Completed && !degraded,
            state,
            plan_calls,
            degraded,
            actions,
            elapsed_ms: start.elapsed().as_millis() as u64,
            payload: payload.clone(),
        };

        (context.merge(step.output_key, payload), report)
    }

    /// Run the whole pipeline over a transcript
    ///
    /// Never fails; check `partial_failure` on the result.
    pub async fn run(&self, transcript: &str) -> ResultSet {
        let start = Instant::now();
        let mut state = RunState::NotStarted;
        info!("Run {} with {} steps", state, self.steps.len());

        state = RunState::Running;
        info!("Run {}", state);

        let mut context = Context::with_transcript(transcript);
        let mut reports = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let (next, report) = self.run_step(step, context).await;
            if report.degraded {
                warn!("Step {} degraded, continuing with the next step", report.step);
            }
            context = next;
            reports.push(report);
        }

        let partial_failure = reports.iter().any(|r| r.degraded || !r.success);
        state = if partial_failure {
            RunState::CompletedWithDegradation
        } else {
            RunState::Completed
        };

        info!(
            "Run {} in {}ms: {}/{} steps succeeded",
            state,
            start.elapsed().as_millis(),
            reports.iter().filter(|r| r.success).count(),
            reports.len()
        );

        ResultSet {
            state,
            partial_failure,
            steps: reports,
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::action::{Action, Completion, DecisionStrategy, Signal, Snapshot};
    use crate::config::StepSettings;
    use crate::llm::scripted::{ScriptedProvider, ScriptedReply};
    use crate::llm::ReasoningEngine;
    use async_trait::async_trait;
    use scribe_sdk::types::PayloadKind;
    use serde_json::json;
    use std::sync::Arc;

    /// Completes immediately with a fixed result
    struct Fixed {
        inputs: &'static [&'static str],
        result: serde_json::Value,
    }

    #[async_trait]
    impl DecisionStrategy for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn input_keys(&self) -> &[&'static str] {
            self.inputs
        }

        async fn decide(&self, _snapshot: &Snapshot) -> Action {
            Action::Complete(Completion::Result(self.result.clone()))
        }
    }

    /// Never completes
    struct Stalled;

    #[async_trait]
    impl DecisionStrategy for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        fn input_keys(&self) -> &[&'static str] {
            &["transcript", "insights"]
        }

        async fn decide(&self, _snapshot: &Snapshot) -> Action {
            Action::Continue(Signal::progress("still thinking"))
        }
    }

    fn fixed(kind: PayloadKind, inputs: &'static [&'static str], result: serde_json::Value) -> PipelineStep {
        PipelineStep::new(kind, Arc::new(Fixed { inputs, result }), 2)
    }

    #[tokio::test]
    async fn test_clean_run() {
        let orchestrator = Orchestrator::new(vec![
            fixed(PayloadKind::Insights, &["transcript"], json!(["ship Friday"])),
            fixed(
                PayloadKind::Notes,
                &["transcript", "insights"],
                json!({"summary": "release sync"}),
            ),
        ])
        .unwrap();

        let result = orchestrator.run("Ann: ship Friday").await;

        assert_eq!(result.state, RunState::Completed);
        assert!(!result.partial_failure);
        assert_eq!(result.steps.len(), 2);
        assert!(result.steps.iter().all(|s| s.success && s.plan_calls == 1));
        assert_eq!(
            result.payload("insights"),
            Some(&StepPayload::Insights(vec!["ship Friday".into()]))
        );
        assert_eq!(result.context.transcript(), Some("Ann: ship Friday"));
    }

    #[tokio::test]
    async fn test_exhausted_step_does_not_abort() {
        let orchestrator = Orchestrator::new(vec![
            fixed(PayloadKind::Insights, &["transcript"], json!(["a"])),
            PipelineStep::new(PayloadKind::Notes, Arc::new(Stalled), 3),
            fixed(PayloadKind::Article, &["insights", "notes"], json!({"sections": [{"heading": "Intro"}]})),
        ])
        .unwrap();

        let result = orchestrator.run("t").await;

        assert_eq!(result.state, RunState::CompletedWithDegradation);
        assert!(result.partial_failure);

        let notes = result.step("notes").unwrap();
        assert!(!notes.success);
        assert_eq!(notes.state, StepState::Exhausted);
        assert_eq!(notes.plan_calls, 3);
        assert!(notes.payload.is_degraded());

        let article = result.step("article").unwrap();
        assert!(article.success);
        assert!(result.context.get("notes").is_some_and(|v| v.is_degraded()));
    }

    #[tokio::test]
    async fn test_invalid_result_is_degraded_at_merge() {
        let orchestrator = Orchestrator::new(vec![fixed(
            PayloadKind::Insights,
            &["transcript"],
            json!({"nothing": "useful"}),
        )])
        .unwrap();

        let result = orchestrator.run("t").await;
        let report = result.step("insights").unwrap();

        assert_eq!(report.state, StepState::Completed);
        assert!(!report.success);
        assert!(report.degraded);
        assert!(result.partial_failure);
        let StepPayload::Degraded(payload) = &report.payload else {
            panic!("expected degraded payload");
        };
        assert_eq!(payload.step, "insights");
        assert_eq!(payload.excerpt.as_deref(), Some(r#"{"nothing":"useful"}"#));
    }

    #[tokio::test]
    async fn test_empty_insights_count_as_partial_failure() {
        let orchestrator =
            Orchestrator::new(vec![fixed(PayloadKind::Insights, &["transcript"], json!([]))])
                .unwrap();

        let result = orchestrator.run("t").await;

        assert!(result.partial_failure);
        assert_eq!(result.state, RunState::CompletedWithDegradation);
        assert!(result.payload("insights").is_some_and(|p| p.is_degraded()));
    }

    #[tokio::test]
    async fn test_context_only_grows() {
        let orchestrator = Orchestrator::new(vec![
            fixed(PayloadKind::Insights, &["transcript"], json!(["a"])),
            fixed(PayloadKind::Notes, &["transcript", "insights"], json!({"decisions": ["b"]})),
            fixed(PayloadKind::Todos, &["transcript", "notes"], json!([{"task": "c"}])),
        ])
        .unwrap();

        let mut context = Context::with_transcript("t");
        for step in orchestrator.steps() {
            let before = context.clone();
            let (next, _) = orchestrator.run_step(step, context).await;
            assert_eq!(next.len(), before.len() + 1);
            for key in before.keys() {
                assert_eq!(next.get(key), before.get(key));
            }
            context = next;
        }
        assert_eq!(context.len(), 4);
    }

    #[tokio::test]
    async fn test_engine_down_for_one_step() {
        let good: Arc<dyn ReasoningEngine> = Arc::new(ScriptedProvider::repeating(
            ScriptedReply::text(r#"{"action_type": "COMPLETE", "result": ["x"]}"#),
        ));
        let down: Arc<dyn ReasoningEngine> =
            Arc::new(ScriptedProvider::repeating(ScriptedReply::unavailable("503")));
        let settings = StepSettings {
            max_iterations: 2,
            temperature: 0.2,
        };

        let orchestrator = Orchestrator::new(vec![
            PipelineStep::builtin(PayloadKind::Insights, Arc::clone(&good), settings),
            PipelineStep::builtin(PayloadKind::Notes, down, settings),
            fixed(PayloadKind::Todos, &["transcript", "notes"], json!([{"task": "follow up"}])),
        ])
        .unwrap();

        let result = orchestrator.run("t").await;

        assert!(result.partial_failure);
        let notes = result.step("notes").unwrap();
        assert_eq!(notes.plan_calls, 2);
        assert_eq!(notes.actions, vec!["continue (error)", "complete (degraded)"]);
        assert!(result.step("todos").unwrap().success);
    }

    #[test]
    fn test_invalid_pipeline_rejected() {
        let result = Orchestrator::new(vec![fixed(PayloadKind::Notes, &["insights"], json!({}))]);
        assert!(matches!(result, Err(EngineError::InvalidConfiguration(_))));
    }
}
