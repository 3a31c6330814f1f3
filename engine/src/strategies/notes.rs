//! Structured meeting notes

use super::StrategySpec;
use scribe_sdk::types::PayloadKind;

pub const SPEC: StrategySpec = StrategySpec {
    kind: PayloadKind::Notes,
    goal: "Write structured notes for the meeting",
    role: "a meticulous note taker",
    instructions: "Summarise the meeting in a few sentences, then list its key points, \
                   the decisions that were made and the questions left open. \
                   Use the extracted insights as a guide but stay faithful to the transcript.",
    schema: r#"{"summary": "<text>", "key_points": ["..."], "decisions": ["..."], "open_questions": ["..."]}"#,
    inputs: &["transcript", "insights"],
};
