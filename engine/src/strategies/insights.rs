//! Insight extraction: the first pass over the raw transcript

use super::StrategySpec;
use scribe_sdk::types::PayloadKind;

pub const SPEC: StrategySpec = StrategySpec {
    kind: PayloadKind::Insights,
    goal: "Extract the key insights from the meeting transcript",
    role: "an analyst reviewing a meeting transcript",
    instructions: "List the most important insights: facts learned, problems raised, \
                   and conclusions reached. Each insight is one short sentence.",
    schema: r#"["<insight>", ...]"#,
    inputs: &["transcript"],
};
