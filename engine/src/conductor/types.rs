use crate::agent::core::StepState;
use crate::conductor::context::Context;
use scribe_sdk::types::StepPayload;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Orchestration-level state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    CompletedWithDegradation,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::NotStarted => "not_started",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::CompletedWithDegradation => "completed_with_degradation",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::CompletedWithDegradation
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened in one pipeline step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: String,
    pub output_key: String,
    /// True only for a clean completion whose result passed validation
    pub success: bool,
    pub state: StepState,
    pub plan_calls: u32,
    pub degraded: bool,
    /// Label of every action taken, in order
    pub actions: Vec<String>,
    pub elapsed_ms: u64,
    /// The payload merged into the context
    pub payload: StepPayload,
}

/// Outcome of a full pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub state: RunState,
    /// Set if any step exhausted or degraded
    pub partial_failure: bool,
    pub steps: Vec<StepReport>,
    pub context: Context,
}

impl ResultSet {
    pub fn step(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == name)
    }

    /// Final payload of a step, by step name
    pub fn payload(&self, name: &str) -> Option<&StepPayload> {
        self.step(name).map(|s| &s.payload)
    }

    pub fn degraded_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.degraded)
            .map(|s| s.step.as_str())
            .collect()
    }

    /// Plain nested mapping: step name to payload, plus the failure flag
    pub fn to_value(&self) -> Value {
        let results: Map<String, Value> = self
            .steps
            .iter()
            .map(|s| (s.step.clone(), s.payload.to_value()))
            .collect();

        let mut root = Map::new();
        root.insert("state".to_string(), Value::from(self.state.as_str()));
        root.insert(
            "partial_failure".to_string(),
            Value::Bool(self.partial_failure),
        );
        root.insert("results".to_string(), Value::Object(results));
        Value::Object(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_sdk::types::DegradedPayload;
    use serde_json::json;

    fn report(step: &str, payload: StepPayload) -> StepReport {
        let degraded = payload.is_degraded();
        StepReport {
            step: step.to_string(),
            output_key: step.to_string(),
            success: !degraded,
            state: if degraded {
                StepState::Exhausted
            } else {
                StepState::Completed
            },
            plan_calls: 1,
            degraded,
            actions: vec!["complete".to_string()],
            elapsed_ms: 3,
            payload,
        }
    }

    #[test]
    fn test_to_value_is_plain_mapping() {
        let set = ResultSet {
            state: RunState::CompletedWithDegradation,
            partial_failure: true,
            steps: vec![
                report("insights", StepPayload::Insights(vec!["a".into()])),
                report(
                    "notes",
                    StepPayload::Degraded(DegradedPayload::new("notes", "offline")),
                ),
            ],
            context: Context::with_transcript("t"),
        };

        assert_eq!(
            set.to_value(),
            json!({
                "state": "completed_with_degradation",
                "partial_failure": true,
                "results": {
                    "insights": ["a"],
                    "notes": {"error": true, "step": "notes", "message": "offline"}
                }
            })
        );
        assert_eq!(set.degraded_steps(), vec!["notes"]);
        assert!(set.payload("todos").is_none());
    }

    #[test]
    fn test_run_state() {
        assert!(!RunState::Running.is_terminal());
        assert!(RunState::Completed.is_terminal());
        assert_eq!(
            serde_json::to_value(RunState::NotStarted).unwrap(),
            json!("not_started")
        );
    }
}
