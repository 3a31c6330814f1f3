//! Article outline

use super::StrategySpec;
use scribe_sdk::types::PayloadKind;

pub const SPEC: StrategySpec = StrategySpec {
    kind: PayloadKind::Article,
    goal: "Outline an article that tells the story of the meeting",
    role: "a technical writer",
    instructions: "Outline a short article for readers who were not in the meeting. \
                   Give it a title and a handful of sections, each with a heading and \
                   the points it should cover.",
    schema: r#"{"title": "<text>", "sections": [{"heading": "<text>", "points": ["..."]}]}"#,
    inputs: &["insights", "notes"],
};
