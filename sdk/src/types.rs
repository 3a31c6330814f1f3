//! Step payload types
//!
//! Each pipeline step produces one of these payloads. Engine output is
//! untrusted, so raw results are parsed through [`PayloadKind::parse`]
//! before they are merged into the shared context. Anything that does not
//! fit its schema becomes a [`DegradedPayload`] instead.

use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The kinds of artifact a pipeline step can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Insights,
    Notes,
    Todos,
    RepoPlan,
    Article,
}

impl PayloadKind {
    /// All kinds in canonical pipeline order
    pub const ALL: [PayloadKind; 5] = [
        PayloadKind::Insights,
        PayloadKind::Notes,
        PayloadKind::Todos,
        PayloadKind::RepoPlan,
        PayloadKind::Article,
    ];

    /// Step identifier used in configuration and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Insights => "insights",
            PayloadKind::Notes => "notes",
            PayloadKind::Todos => "todos",
            PayloadKind::RepoPlan => "repo_plan",
            PayloadKind::Article => "article",
        }
    }

    /// Context key the step writes to
    pub fn output_key(&self) -> &'static str {
        match self {
            PayloadKind::Insights => "insights",
            PayloadKind::Notes => "notes",
            PayloadKind::Todos => "todos",
            PayloadKind::RepoPlan => "repo_plan",
            PayloadKind::Article => "article_outline",
        }
    }

    /// Validate a raw result against this kind's schema
    pub fn parse(&self, value: &Value) -> Result<StepPayload, EngineError> {
        let field = self.output_key();
        let invalid = |reason: &str| EngineError::InvalidPayload {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        match self {
            PayloadKind::Insights => parse_insights(field, value).map(StepPayload::Insights),
            PayloadKind::Notes => {
                let notes: MeetingNotes = decode(field, value)?;
                if notes.is_empty() {
                    return Err(invalid("notes contain no sections"));
                }
                Ok(StepPayload::Notes(notes))
            }
            PayloadKind::Todos => {
                let items = unwrap_list(value, &["todos", "items", "action_items"]);
                let items: Vec<TodoItem> = decode(field, items)?;
                if let Some(pos) = items.iter().position(|t| t.task.trim().is_empty()) {
                    return Err(invalid(&format!("todo #{} has an empty task", pos + 1)));
                }
                Ok(StepPayload::Todos(TodoList { items }))
            }
            PayloadKind::RepoPlan => {
                let plan: RepoPlan = decode(field, value)?;
                if plan.is_empty() {
                    return Err(invalid("repository plan is empty"));
                }
                Ok(StepPayload::RepoPlan(plan))
            }
            PayloadKind::Article => {
                let outline: ArticleOutline = decode(field, value)?;
                if outline.sections.is_empty() {
                    return Err(invalid("outline has no sections"));
                }
                Ok(StepPayload::Article(outline))
            }
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PayloadKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                EngineError::InvalidConfiguration(format!(
                    "Unknown step '{}'. Must be one of: {}",
                    s,
                    PayloadKind::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }
}

fn decode<T: serde::de::DeserializeOwned>(field: &str, value: &Value) -> Result<T, EngineError> {
    serde_json::from_value(value.clone()).map_err(|e| EngineError::InvalidPayload {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Lists are sometimes wrapped in an object under a descriptive key
fn unwrap_list<'a>(value: &'a Value, keys: &[&str]) -> &'a Value {
    if let Value::Object(map) = value {
        for key in keys {
            if let Some(inner @ Value::Array(_)) = map.get(*key) {
                return inner;
            }
        }
    }
    value
}

fn parse_insights(field: &str, value: &Value) -> Result<Vec<String>, EngineError> {
    let list = unwrap_list(value, &["insights", "items"]);
    let Value::Array(items) = list else {
        return Err(EngineError::InvalidPayload {
            field: field.to_string(),
            reason: "expected a list of strings".to_string(),
        });
    };

    if items.is_empty() {
        return Err(EngineError::InvalidPayload {
            field: field.to_string(),
            reason: "no insights".to_string(),
        });
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            Value::String(_) => Err(EngineError::InvalidPayload {
                field: field.to_string(),
                reason: format!("item #{} is blank", i + 1),
            }),
            _ => Err(EngineError::InvalidPayload {
                field: field.to_string(),
                reason: format!("item #{} is not a string", i + 1),
            }),
        })
        .collect()
}

/// A validated step payload
///
/// Serializes to the bare artifact, so a result set reads as a plain
/// nested mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepPayload {
    Insights(Vec<String>),
    Notes(MeetingNotes),
    Todos(TodoList),
    RepoPlan(RepoPlan),
    Article(ArticleOutline),
    Degraded(DegradedPayload),
}

impl StepPayload {
    /// True if this payload carries an error marker
    pub fn is_degraded(&self) -> bool {
        matches!(self, StepPayload::Degraded(_))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Structured meeting notes with a fixed set of sections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingNotes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub key_points: Vec<String>,
    pub decisions: Vec<String>,
    pub open_questions: Vec<String>,
}

impl MeetingNotes {
    pub fn is_empty(&self) -> bool {
        self.summary.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.key_points.is_empty()
            && self.decisions.is_empty()
            && self.open_questions.is_empty()
    }
}

/// Priority of an action item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "High", alias = "HIGH")]
    High,
    #[default]
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// A single action item derived from the meeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub task: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodoList {
    pub items: Vec<TodoItem>,
}

/// Plan for a code repository implied by the meeting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub modules: Vec<String>,
    pub milestones: Vec<String>,
}

impl RepoPlan {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.modules.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub heading: String,
    #[serde(default)]
    pub points: Vec<String>,
}

/// Outline for a narrative write-up of the meeting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleOutline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub sections: Vec<OutlineSection>,
}

/// Best-effort payload produced when a step could not finish cleanly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedPayload {
    /// Always true; lets downstream consumers detect the marker without
    /// knowing the payload type
    pub error: bool,
    pub step: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl DegradedPayload {
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: true,
            step: step.into(),
            message: message.into(),
            excerpt: None,
        }
    }

    pub fn with_excerpt(mut self, excerpt: Option<String>) -> Self {
        self.excerpt = excerpt;
        self
    }
}
