//! Action items
//!
//! Priorities are restricted to high, medium and low. Anything else fails
//! validation when the result is merged.

use super::StrategySpec;
use scribe_sdk::types::PayloadKind;

pub const SPEC: StrategySpec = StrategySpec {
    kind: PayloadKind::Todos,
    goal: "List the action items agreed in the meeting",
    role: "a project coordinator",
    instructions: "Extract every concrete action item. Give each a priority of high, medium \
                   or low, and name the assignee only when the transcript names one.",
    schema: r#"[{"task": "<text>", "priority": "high" | "medium" | "low", "assignee": "<name or null>"}, ...]"#,
    inputs: &["transcript", "notes"],
};
