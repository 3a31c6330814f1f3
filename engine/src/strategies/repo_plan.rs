//! Repository plan derived from the insights and action items

use super::StrategySpec;
use scribe_sdk::types::PayloadKind;

pub const SPEC: StrategySpec = StrategySpec {
    kind: PayloadKind::RepoPlan,
    goal: "Propose a code repository layout for the work discussed",
    role: "a senior software engineer",
    instructions: "Propose a repository for the work discussed: a short name, a one-line \
                   description, the main modules and the milestones implied by the action items.",
    schema: r#"{"name": "<kebab-case>", "description": "<text>", "modules": ["..."], "milestones": ["..."]}"#,
    inputs: &["insights", "todos"],
};
