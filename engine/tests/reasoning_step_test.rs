//! Reasoning loop scenarios driven by scripted engine replies

use std::sync::Arc;

use scribe_engine::agent::{Action, ReasoningStep, StepOutput, StepState};
use scribe_engine::conductor::Context;
use scribe_engine::llm::scripted::{ScriptedProvider, ScriptedReply};
use scribe_engine::strategies::{build_strategy, spec_for};
use scribe_sdk::errors::EngineError;
use scribe_sdk::types::PayloadKind;
use serde_json::json;

const COMPLETE: &str = r#"{"action_type": "COMPLETE", "reasoning": "done", "result": ["ship in May"]}"#;
const CONTINUE: &str = r#"{"action_type": "CONTINUE", "reasoning": "need another pass"}"#;

fn insights_step(script: &ScriptedProvider) -> ReasoningStep {
    let strategy = build_strategy(PayloadKind::Insights, Arc::new(script.clone()), 0.3);
    ReasoningStep::new("insights", Arc::new(strategy))
}

fn context() -> Context {
    Context::with_transcript("Ann: we ship in May")
}

#[tokio::test]
async fn test_completes_on_first_iteration() {
    let script = ScriptedProvider::repeating(ScriptedReply::text(COMPLETE));
    let step = insights_step(&script);

    let result = step
        .run(spec_for(PayloadKind::Insights).goal, &context(), 3)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.plan_calls, 1);
    assert_eq!(script.calls(), 1);
    assert_eq!(result.output, StepOutput::Value(json!(["ship in May"])));
}

#[tokio::test]
async fn test_completes_on_last_iteration() {
    for cap in 1..=5u32 {
        let mut replies = vec![ScriptedReply::text(CONTINUE); (cap - 1) as usize];
        replies.push(ScriptedReply::text(COMPLETE));
        let script = ScriptedProvider::new(replies);

        let result = insights_step(&script)
            .run("goal", &context(), cap)
            .await
            .unwrap();

        assert!(result.success, "cap {}", cap);
        assert_eq!(result.plan_calls, cap);
        assert_eq!(result.state, StepState::Completed);
    }
}

#[tokio::test]
async fn test_unparsable_every_iteration_exhausts() {
    let script = ScriptedProvider::repeating(ScriptedReply::text("I am not JSON at all"));

    let result = insights_step(&script)
        .run("goal", &context(), 3)
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.state, StepState::Exhausted);
    assert_eq!(result.plan_calls, 3);
    assert_eq!(script.calls(), 3);

    let StepOutput::Degraded(payload) = &result.output else {
        panic!("expected degraded output");
    };
    assert!(payload.error);
    assert_eq!(payload.step, "insights");
    assert_eq!(payload.excerpt.as_deref(), Some("I am not JSON at all"));
}

#[tokio::test]
async fn test_engine_unavailable_exhausts_without_raising() {
    let script = ScriptedProvider::repeating(ScriptedReply::unavailable("connection refused"));

    let result = insights_step(&script)
        .run("goal", &context(), 2)
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.plan_calls, 2);
    let StepOutput::Degraded(payload) = &result.output else {
        panic!("expected degraded output");
    };
    assert!(payload.message.contains("connection refused"));
}

#[tokio::test]
async fn test_missing_marker_exhausts_with_last_note() {
    let script = ScriptedProvider::repeating(ScriptedReply::text(
        r#"{"reasoning": "here are the insights", "result": ["a"]}"#,
    ));

    let result = insights_step(&script)
        .run("goal", &context(), 2)
        .await
        .unwrap();

    assert!(!result.success);
    let StepOutput::Degraded(payload) = &result.output else {
        panic!("expected degraded output");
    };
    assert!(payload.message.contains("here are the insights"));

    let prompts = script.prompts();
    assert!(prompts[1][1].content.contains("here are the insights"));
}

#[tokio::test]
async fn test_replay_is_deterministic() {
    let replies = vec![
        ScriptedReply::text("garbage"),
        ScriptedReply::unavailable("timeout"),
        ScriptedReply::text(CONTINUE),
        ScriptedReply::text(COMPLETE),
    ];

    let first = insights_step(&ScriptedProvider::new(replies.clone()))
        .run("goal", &context(), 4)
        .await
        .unwrap();
    let second = insights_step(&ScriptedProvider::new(replies))
        .run("goal", &context(), 4)
        .await
        .unwrap();

    let first_actions: Vec<Action> = first.actions().into_iter().cloned().collect();
    let second_actions: Vec<Action> = second.actions().into_iter().cloned().collect();
    assert_eq!(first_actions, second_actions);
    assert_eq!(first.output, second.output);
    assert_eq!(first.plan_calls, 4);
    assert!(first.success);
}

#[tokio::test]
async fn test_zero_cap_is_rejected() {
    let script = ScriptedProvider::repeating(ScriptedReply::text(COMPLETE));
    let err = insights_step(&script)
        .run("goal", &context(), 0)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    assert_eq!(script.calls(), 0);
}
