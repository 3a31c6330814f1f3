//! Pipeline definition
//!
//! A pipeline is a fixed, ordered list of steps. Each step reads the keys
//! its strategy declares and writes exactly one key. The order is checked
//! once, up front: every input must be produced by an earlier step (or be
//! the transcript), and no two steps may write the same key.

use std::collections::HashSet;
use std::sync::Arc;

use scribe_sdk::errors::EngineError;
use scribe_sdk::types::PayloadKind;

use super::context::TRANSCRIPT_KEY;
use crate::agent::action::DecisionStrategy;
use crate::agent::core::ReasoningStep;
use crate::config::{Config, StepSettings};
use crate::llm::ReasoningEngine;
use crate::strategies::{build_strategy, spec_for};

pub struct PipelineStep {
    pub kind: PayloadKind,
    pub goal: String,
    pub output_key: &'static str,
    pub max_iterations: u32,
    reasoning: ReasoningStep,
}

impl PipelineStep {
    pub fn new(kind: PayloadKind, strategy: Arc<dyn DecisionStrategy>, max_iterations: u32) -> Self {
        Self {
            kind,
            goal: spec_for(kind).goal.to_string(),
            output_key: kind.output_key(),
            max_iterations,
            reasoning: ReasoningStep::new(kind.as_str(), strategy),
        }
    }

    /// The built-in engine-backed step for `kind`
    pub fn builtin(
        kind: PayloadKind,
        engine: Arc<dyn ReasoningEngine>,
        settings: StepSettings,
    ) -> Self {
        let strategy = build_strategy(kind, engine, settings.temperature);
        Self::new(kind, Arc::new(strategy), settings.max_iterations)
    }

    pub fn name(&self) -> &str {
        self.kind.as_str()
    }

    pub fn input_keys(&self) -> &[&'static str] {
        self.reasoning.strategy().input_keys()
    }

    pub fn reasoning(&self) -> &ReasoningStep {
        &self.reasoning
    }
}

/// Build the configured pipeline on top of one engine
pub fn default_pipeline(
    config: &Config,
    engine: Arc<dyn ReasoningEngine>,
) -> Result<Vec<PipelineStep>, EngineError> {
    Ok(config
        .pipeline_kinds()?
        .into_iter()
        .map(|kind| PipelineStep::builtin(kind, Arc::clone(&engine), config.step_settings(kind)))
        .collect())
}

/// Check the static shape of a pipeline
pub fn validate(steps: &[PipelineStep]) -> Result<(), EngineError> {
    if steps.is_empty() {
        return Err(EngineError::InvalidConfiguration(
            "pipeline must contain at least one step".to_string(),
        ));
    }

    let mut available: HashSet<&str> = HashSet::from([TRANSCRIPT_KEY]);

    for step in steps {
        if step.max_iterations == 0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "step '{}': max_iterations must be at least 1",
                step.name()
            )));
        }

        for input in step.input_keys() {
            if !available.contains(input) {
                return Err(EngineError::InvalidConfiguration(format!(
                    "step '{}' reads '{}' before any earlier step produces it",
                    step.name(),
                    input
                )));
            }
        }

        if step.output_key == TRANSCRIPT_KEY {
            return Err(EngineError::InvalidConfiguration(format!(
                "step '{}' may not write the transcript",
                step.name()
            )));
        }

        if !available.insert(step.output_key) {
            return Err(EngineError::InvalidConfiguration(format!(
                "context key '{}' is written by more than one step",
                step.output_key
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::{ScriptedProvider, ScriptedReply};

    fn engine() -> Arc<dyn ReasoningEngine> {
        Arc::new(ScriptedProvider::repeating(ScriptedReply::text("{}")))
    }

    fn settings() -> StepSettings {
        StepSettings {
            max_iterations: 2,
            temperature: 0.1,
        }
    }

    fn builtin(kind: PayloadKind) -> PipelineStep {
        PipelineStep::builtin(kind, engine(), settings())
    }

    #[test]
    fn test_default_order_is_valid() {
        let steps: Vec<_> = PayloadKind::ALL.into_iter().map(builtin).collect();
        assert!(validate(&steps).is_ok());
        assert_eq!(steps[4].output_key, "article_outline");
        assert_eq!(steps[1].input_keys(), &["transcript", "insights"]);
    }

    #[test]
    fn test_default_pipeline_from_config() {
        let mut config = Config::default();
        config.pipeline.steps = vec!["insights".into(), "notes".into()];
        let steps = default_pipeline(&config, engine()).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].max_iterations, 3);
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        assert!(matches!(
            validate(&[]),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_input_before_producer_rejected() {
        let steps = vec![builtin(PayloadKind::Insights), builtin(PayloadKind::Todos)];
        let err = validate(&steps).unwrap_err();
        assert!(err.to_string().contains("'todos' reads 'notes'"));
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let steps = vec![builtin(PayloadKind::Insights), builtin(PayloadKind::Insights)];
        let err = validate(&steps).unwrap_err();
        assert!(err.to_string().contains("more than one step"));
    }

    #[test]
    fn test_zero_cap_rejected() {
        let step = PipelineStep::builtin(
            PayloadKind::Insights,
            engine(),
            StepSettings {
                max_iterations: 0,
                temperature: 0.3,
            },
        );
        assert!(validate(&[step]).is_err());
    }
}
