//! Report writer
//!
//! Persists a finished run to an output directory as `results.json` (the
//! full result set) and `summary.md` (one section per step). Stored runs are
//! rendered through the same path when replayed.

use anyhow::{Context, Result};
use scribe_sdk::types::{PayloadKind, StepPayload};
use serde_json::Value;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::conductor::types::ResultSet;
use crate::db::RunStep;

pub const RESULTS_FILE: &str = "results.json";
pub const SUMMARY_FILE: &str = "summary.md";

/// One step as it appears in a report
#[derive(Debug, Clone)]
pub struct ReportSection {
    pub step: String,
    pub success: bool,
    pub payload: Value,
}

impl ReportSection {
    pub fn from_result_set(results: &ResultSet) -> Vec<Self> {
        results
            .steps
            .iter()
            .map(|s| Self {
                step: s.step.clone(),
                success: s.success,
                payload: s.payload.to_value(),
            })
            .collect()
    }

    pub fn from_stored(steps: &[RunStep]) -> Vec<Self> {
        steps
            .iter()
            .map(|s| Self {
                step: s.step.clone(),
                success: s.success,
                payload: s.payload.clone(),
            })
            .collect()
    }
}

/// Files written for one run
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub results: PathBuf,
    pub summary: PathBuf,
}

/// Write `results.json` and `summary.md` into `out_dir`
pub fn write_report(results: &ResultSet, out_dir: &Path, title: &str) -> Result<ReportPaths> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let paths = ReportPaths {
        results: out_dir.join(RESULTS_FILE),
        summary: out_dir.join(SUMMARY_FILE),
    };

    let json = serde_json::to_string_pretty(results).context("Failed to serialize results")?;
    std::fs::write(&paths.results, json)
        .with_context(|| format!("Failed to write {}", paths.results.display()))?;

    let markdown = render_summary(
        title,
        results.partial_failure,
        &ReportSection::from_result_set(results),
    )
    .context("Failed to render summary")?;
    std::fs::write(&paths.summary, markdown)
        .with_context(|| format!("Failed to write {}", paths.summary.display()))?;

    info!("Report written to {}", out_dir.display());
    Ok(paths)
}

/// Render a markdown summary of a run
pub fn render_summary(
    title: &str,
    partial_failure: bool,
    sections: &[ReportSection],
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "# {}\n", title)?;

    if partial_failure {
        let degraded: Vec<&str> = sections
            .iter()
            .filter(|s| !s.success)
            .map(|s| s.step.as_str())
            .collect();
        writeln!(
            out,
            "> Some steps did not complete cleanly: {}\n",
            degraded.join(", ")
        )?;
    }

    for section in sections {
        writeln!(out, "## {}\n", heading(&section.step))?;
        render_section(&mut out, section)?;
        out.push('\n');
    }

    Ok(out)
}

fn heading(step: &str) -> &str {
    match step {
        "insights" => "Insights",
        "notes" => "Meeting Notes",
        "todos" => "Action Items",
        "repo_plan" => "Repository Plan",
        "article" => "Article Outline",
        other => other,
    }
}

fn render_section(out: &mut String, section: &ReportSection) -> fmt::Result {
    if section.payload.get("error") == Some(&Value::Bool(true)) {
        let message = section
            .payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no details");
        return writeln!(out, "> **Degraded:** {}", message);
    }

    let typed = section
        .step
        .parse::<PayloadKind>()
        .and_then(|kind| kind.parse(&section.payload));

    match typed {
        Ok(payload) => render_payload(out, &payload),
        Err(_) => {
            let json = serde_json::to_string_pretty(&section.payload)
                .unwrap_or_else(|_| section.payload.to_string());
            writeln!(out, "```json\n{}\n```", json)
        }
    }
}

fn bullets(out: &mut String, items: &[String]) -> fmt::Result {
    for item in items {
        writeln!(out, "- {}", item)?;
    }
    Ok(())
}

fn render_payload(out: &mut String, payload: &StepPayload) -> fmt::Result {
    match payload {
        StepPayload::Insights(items) => bullets(out, items)?,
        StepPayload::Notes(notes) => {
            if let Some(summary) = &notes.summary {
                writeln!(out, "{}\n", summary)?;
            }
            for (label, items) in [
                ("Key points", &notes.key_points),
                ("Decisions", &notes.decisions),
                ("Open questions", &notes.open_questions),
            ] {
                if !items.is_empty() {
                    writeln!(out, "### {}\n", label)?;
                    bullets(out, items)?;
                    out.push('\n');
                }
            }
        }
        StepPayload::Todos(list) => {
            for item in &list.items {
                write!(out, "- [ ] {} ({})", item.task, item.priority)?;
                if let Some(assignee) = &item.assignee {
                    write!(out, " @{}", assignee)?;
                }
                out.push('\n');
            }
        }
        StepPayload::RepoPlan(plan) => {
            if let Some(name) = &plan.name {
                writeln!(out, "**{}**\n", name)?;
            }
            if let Some(description) = &plan.description {
                writeln!(out, "{}\n", description)?;
            }
            if !plan.modules.is_empty() {
                writeln!(out, "### Modules\n")?;
                bullets(out, &plan.modules)?;
                out.push('\n');
            }
            if !plan.milestones.is_empty() {
                writeln!(out, "### Milestones\n")?;
                for (i, milestone) in plan.milestones.iter().enumerate() {
                    writeln!(out, "{}. {}", i + 1, milestone)?;
                }
            }
        }
        StepPayload::Article(outline) => {
            if let Some(title) = &outline.title {
                writeln!(out, "**{}**\n", title)?;
            }
            for section in &outline.sections {
                writeln!(out, "### {}\n", section.heading)?;
                bullets(out, &section.points)?;
                out.push('\n');
            }
        }
        StepPayload::Degraded(degraded) => {
            writeln!(out, "> **Degraded:** {}", degraded.message)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::core::StepState;
    use crate::conductor::context::Context;
    use crate::conductor::types::{RunState, StepReport};
    use scribe_sdk::types::{DegradedPayload, Priority, TodoItem, TodoList};
    use serde_json::json;
    use tempfile::TempDir;

    fn section(step: &str, success: bool, payload: Value) -> ReportSection {
        ReportSection {
            step: step.into(),
            success,
            payload,
        }
    }

    #[test]
    fn test_renders_each_artifact() {
        let md = render_summary(
            "Weekly sync",
            false,
            &[
                section("insights", true, json!(["Launch slips a week"])),
                section(
                    "notes",
                    true,
                    json!({"summary": "Release review", "decisions": ["Delay launch"]}),
                ),
                section(
                    "todos",
                    true,
                    json!([{"task": "Tell sales", "priority": "high", "assignee": "Kim"}]),
                ),
            ],
        )
        .unwrap();

        assert!(md.starts_with("# Weekly sync\n"));
        assert!(md.contains("## Insights\n\n- Launch slips a week"));
        assert!(md.contains("### Decisions\n\n- Delay launch"));
        assert!(md.contains("- [ ] Tell sales (high) @Kim"));
        assert!(!md.contains("did not complete cleanly"));
    }

    #[test]
    fn test_degraded_section() {
        let md = render_summary(
            "Run",
            true,
            &[section(
                "repo_plan",
                false,
                serde_json::to_value(DegradedPayload::new("repo_plan", "engine offline")).unwrap(),
            )],
        )
        .unwrap();
        assert!(md.contains("did not complete cleanly: repo_plan"));
        assert!(md.contains("> **Degraded:** engine offline"));
    }

    #[test]
    fn test_unknown_shape_falls_back_to_json() {
        let md = render_summary("Run", false, &[section("custom", true, json!({"k": 1}))])
            .unwrap();
        assert!(md.contains("## custom"));
        assert!(md.contains("```json"));
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        let payload = StepPayload::Todos(TodoList {
            items: vec![TodoItem {
                task: "Ship".into(),
                priority: Priority::Low,
                assignee: None,
            }],
        });
        let results = ResultSet {
            state: RunState::Completed,
            partial_failure: false,
            steps: vec![StepReport {
                step: "todos".into(),
                output_key: "todos".into(),
                success: true,
                state: StepState::Completed,
                plan_calls: 1,
                degraded: false,
                actions: vec!["complete".into()],
                elapsed_ms: 1,
                payload: payload.clone(),
            }],
            context: Context::with_transcript("t").merge("todos", payload),
        };

        let paths = write_report(&results, &out, "Standup").unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.results).unwrap()).unwrap();
        assert_eq!(written["state"], json!("completed"));
        assert_eq!(written["context"]["transcript"], json!("t"));
        assert_eq!(written["steps"][0]["payload"]["items"][0]["task"], json!("Ship"));

        let summary = std::fs::read_to_string(&paths.summary).unwrap();
        assert!(summary.contains("- [ ] Ship (low)"));
    }
}
